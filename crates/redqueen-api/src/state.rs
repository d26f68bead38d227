//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use redqueen_chat::ChatService;
use redqueen_core::config::RedQueenConfig;

/// Shared application state.
///
/// Cheap to clone: the chat service is a handle and the config is behind
/// an `Arc`. The config is read-only once the server starts.
#[derive(Clone)]
pub struct AppState {
    /// Conversation store and reply scheduler.
    pub chat: ChatService,
    /// Effective configuration (file + CLI/env overrides).
    pub config: Arc<RedQueenConfig>,
    /// Stylesheet for highlighted code, built once at startup.
    pub highlight_css: Arc<str>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Build state from a validated configuration.
    pub fn new(config: RedQueenConfig) -> Self {
        let chat = ChatService::new(&config.chat);
        Self::with_chat(config, chat)
    }

    /// Build state around an existing chat service.
    pub fn with_chat(config: RedQueenConfig, chat: ChatService) -> Self {
        let highlight_css = redqueen_render::highlight_css(&config.render.highlight_theme)
            .unwrap_or_default();
        Self {
            chat,
            config: Arc::new(config),
            highlight_css: Arc::from(highlight_css),
            start_time: Instant::now(),
        }
    }
}
