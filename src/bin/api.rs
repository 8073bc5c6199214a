//! Tempora API Server
//!
//! Run with: cargo run --bin tempora-api
//!
//! # Configuration
//!
//! Settings come from `TEMPORA_CONFIG` (a TOML file path) or the default
//! config locations, then environment overrides:
//! - `TEMPORA_HOST`: Host to bind to (default: 0.0.0.0)
//! - `TEMPORA_PORT`: Port to listen on (default: 3000)
//! - `TEMPORA_TOLERANCE`: Synchronization tolerance in minutes (default: 0)
//! - `TEMPORA_STATE_FILE`: Registry state file (optional)
//! - `TEMPORA_ADMIN_PASS`: Admin password for state import and drift
//! - `TEMPORA_LOG_FORMAT`: `pretty` or `json`
//! - `RUST_LOG`: Log filter (default: the configured level)

use anyhow::Context;
use std::path::PathBuf;
use tempora::api::{serve, AppState};
use tempora::clock::{current_time, ClockRegistry};
use tempora::config::{Config, LoggingConfig};
use tempora::store;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::var("TEMPORA_CONFIG") {
        Ok(path) => Config::load_with_env(&PathBuf::from(path))?,
        Err(_) => Config::load_default(),
    };

    init_tracing(&config.logging);

    tracing::info!("Starting Tempora API server v{}", env!("CARGO_PKG_VERSION"));

    let registry = build_registry(&config)?;
    tracing::info!(
        clocks = registry.len(),
        reference = %registry.reference_time(),
        tolerance = registry.tolerance(),
        "Clock registry ready"
    );

    let state = AppState::new(registry, config.clone());
    serve(state, &config).await?;

    tracing::info!("Tempora API server stopped");
    Ok(())
}

/// Initialize tracing with the pretty or JSON formatter
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("tempora={},tower_http=debug", logging.level).into()
    });

    if logging.is_json() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Default town, configured reference time, then any saved state on top
fn build_registry(config: &Config) -> anyhow::Result<ClockRegistry> {
    let mut registry = ClockRegistry::with_default_clocks()
        .with_history_limit(config.sync.history_limit)
        .with_tolerance(config.sync.tolerance_minutes);

    let reference = match &config.sync.reference_time {
        Some(time) => time.clone(),
        None => current_time(config.sync.utc_offset_minutes).to_string(),
    };
    registry
        .set_reference_time(&reference)
        .with_context(|| format!("invalid reference time {:?}", reference))?;

    if let Some(path) = &config.sync.state_file {
        let path = PathBuf::from(path);
        let loaded = store::load_into(&path, &mut registry)
            .with_context(|| format!("failed to load state file {}", path.display()))?;
        if loaded {
            tracing::info!("Loaded registry state from {}", path.display());
        }
    }

    Ok(registry)
}
