//! Red Queen application binary - composition root.
//!
//! 1. Initialize tracing from RUST_LOG or the CLI/env log level
//! 2. Load configuration from TOML and apply CLI/env overrides
//! 3. Validate the configuration
//! 4. Build the chat service and start the axum server

mod cli;

use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter};

use redqueen_api::routes;
use redqueen_api::state::AppState;
use redqueen_core::config::RedQueenConfig;

use cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Tracing comes first so config load failures are visible. The filter is
    // reloadable because the config file may carry its own log level.
    let env_filter = EnvFilter::try_from_default_env().ok();
    let rust_log_set = env_filter.is_some();
    let (filter, filter_handle) = reload::Layer::new(
        env_filter.unwrap_or_else(|| EnvFilter::new(args.bootstrap_log_level())),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    tracing::info!("Starting Red Queen v{}", env!("CARGO_PKG_VERSION"));

    // An explicitly named config file must parse; the default location may
    // be absent or stale.
    let config_file = args.resolve_config_path();
    let mut config = if args.config_is_explicit() {
        RedQueenConfig::load(&config_file).map_err(|e| {
            tracing::error!(path = %config_file.display(), error = %e, "Failed to load configuration");
            e
        })?
    } else {
        RedQueenConfig::load_or_default(&config_file)
    };
    args.apply(&mut config);

    // RUST_LOG wins over the resolved level.
    if !rust_log_set {
        if let Err(e) = filter_handle.reload(EnvFilter::new(&config.general.log_level)) {
            tracing::warn!(error = %e, "Failed to apply configured log level");
        }
    }

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    if let Some(seed) = config.chat.seed {
        tracing::info!(seed, "Deterministic replies enabled");
    }
    if !config.server.allowed_hosts.is_empty() {
        tracing::info!(hosts = ?config.server.allowed_hosts, "Host allow list active");
    }

    let state = AppState::new(config);
    routes::start_server(state).await?;

    tracing::info!("Red Queen stopped");
    Ok(())
}
