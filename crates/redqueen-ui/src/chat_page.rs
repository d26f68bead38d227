//! Chat page embedding.
//!
//! All CSS and JavaScript are inlined so the binary serves the page with no
//! runtime file dependencies. Message bodies arrive pre-rendered as HTML from
//! the server; conversation titles are inserted as text.

/// The complete self-contained chat page.
///
/// Layout:
///
/// - **Sidebar**: conversations newest first, "New chat" button, per-row delete
/// - **Message pane**: rendered messages plus the typing indicator
/// - **Composer**: textarea (Enter sends, Shift+Enter inserts a newline),
///   send and regenerate buttons
pub const CHAT_PAGE_HTML: &str = include_str!("../assets/chat.html");
