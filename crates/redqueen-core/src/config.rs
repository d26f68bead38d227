use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{RedQueenError, Result};

/// Top-level configuration for the Red Queen demo.
///
/// Loaded from `~/.redqueen/config.toml` by default. Every section is
/// optional; missing sections and fields fall back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedQueenConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

impl RedQueenConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RedQueenConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.chat.validate()
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings for the browser demo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Extra `Host` header values accepted besides localhost and IP literals.
    /// An empty list accepts any host.
    pub allowed_hosts: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
            allowed_hosts: Vec::new(),
        }
    }
}

/// Conversation and canned-response settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Lower bound (inclusive) of the simulated reply latency.
    pub min_reply_delay_ms: u64,
    /// Upper bound (exclusive) of the simulated reply latency.
    pub max_reply_delay_ms: u64,
    /// Chance that a reply is decorated with a flavor line.
    pub prefix_probability: f64,
    /// Characters of the first message kept in a conversation title.
    pub title_max_chars: usize,
    /// Longest message accepted from the browser.
    pub max_message_chars: usize,
    /// Fixed seed for the response RNG. Random per process when unset.
    pub seed: Option<u64>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            min_reply_delay_ms: 1500,
            max_reply_delay_ms: 2500,
            prefix_probability: 0.4,
            title_max_chars: 40,
            max_message_chars: 2000,
            seed: None,
        }
    }
}

impl ChatConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_reply_delay_ms >= self.max_reply_delay_ms {
            return Err(RedQueenError::Config(format!(
                "chat.min_reply_delay_ms ({}) must be below chat.max_reply_delay_ms ({})",
                self.min_reply_delay_ms, self.max_reply_delay_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.prefix_probability) {
            return Err(RedQueenError::Config(format!(
                "chat.prefix_probability must be within [0, 1], got {}",
                self.prefix_probability
            )));
        }
        if self.title_max_chars == 0 {
            return Err(RedQueenError::Config(
                "chat.title_max_chars must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Markdown rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Name of a bundled syntect theme used for `/highlight.css`.
    pub highlight_theme: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            highlight_theme: "base16-ocean.dark".to_string(),
        }
    }
}
