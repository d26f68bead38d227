//! Red Queen UI crate - the embedded browser chat page.
//!
//! The page is a single self-contained HTML file embedded at compile time via
//! `include_str!`. It talks to the JSON API served by `redqueen-api` and
//! refreshes itself from `/state` whenever the `/stream` SSE feed reports a
//! change.
//!
//! # Usage
//!
//! ```rust,ignore
//! use redqueen_ui::chat_page::CHAT_PAGE_HTML;
//!
//! async fn ui_handler() -> axum::response::Html<&'static str> {
//!     axum::response::Html(CHAT_PAGE_HTML)
//! }
//! ```

pub mod chat_page;

pub use chat_page::CHAT_PAGE_HTML;
