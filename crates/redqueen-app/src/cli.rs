//! CLI argument definitions for the Red Queen server.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use redqueen_core::config::RedQueenConfig;

/// Red Queen - a browser chat demo with a sardonic facility AI.
#[derive(Parser, Debug)]
#[command(name = "redqueen", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// HTTP server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Address to bind (e.g. 0.0.0.0 to expose on the network).
    #[arg(long = "host")]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Seed for reply selection and delays.
    #[arg(long = "seed")]
    pub seed: Option<u64>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > REDQUEEN_CONFIG env var > ~/.redqueen/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("REDQUEEN_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Whether the config path was named by the user rather than defaulted.
    pub fn config_is_explicit(&self) -> bool {
        self.config.is_some() || std::env::var_os("REDQUEEN_CONFIG").is_some()
    }

    /// Priority: --port flag > REDQUEEN_PORT env var > config file value > 3030.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Some(p) = env_parse::<u16>("REDQUEEN_PORT") {
            return p;
        }
        if config_port != 0 {
            return config_port;
        }
        3030
    }

    /// Priority: --host flag > REDQUEEN_HOST env var > config file value.
    pub fn resolve_host(&self, config_host: &str) -> String {
        self.host
            .clone()
            .or_else(|| std::env::var("REDQUEEN_HOST").ok())
            .unwrap_or_else(|| config_host.to_string())
    }

    /// Priority: --log-level flag > REDQUEEN_LOG_LEVEL env var > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .or_else(|| std::env::var("REDQUEEN_LOG_LEVEL").ok())
            .unwrap_or_else(|| config_level.to_string())
    }

    /// Level used before the config file has been read.
    pub fn bootstrap_log_level(&self) -> String {
        self.resolve_log_level("info")
    }

    /// Priority: --seed flag > REDQUEEN_SEED env var > config file value.
    pub fn resolve_seed(&self, config_seed: Option<u64>) -> Option<u64> {
        self.seed
            .or_else(|| env_parse::<u64>("REDQUEEN_SEED"))
            .or(config_seed)
    }

    /// Apply every override to a loaded configuration.
    pub fn apply(&self, config: &mut RedQueenConfig) {
        config.server.port = self.resolve_port(config.server.port);
        config.server.host = self.resolve_host(&config.server.host);
        config.general.log_level = self.resolve_log_level(&config.general.log_level);
        config.chat.seed = self.resolve_seed(config.chat.seed);
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".redqueen").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".redqueen").join("config.toml");
    }
    PathBuf::from("config.toml")
}
