//! Markdown to HTML rendering for chat messages.
//!
//! Messages are rendered server-side so the browser page only has to insert
//! trusted HTML. Fenced code is highlighted with CSS classes; the matching
//! stylesheet comes from [`highlight_css`].

pub mod highlight;
pub mod markdown;

pub use highlight::{highlight_css, CLASS_PREFIX};
pub use markdown::render;
