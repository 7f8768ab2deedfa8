//! `tracing-subscriber` initialization.

use crate::config::TelemetryConfig;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to install global tracing subscriber: {0}")]
    SetGlobalDefault(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Install a process-wide `tracing` subscriber driven by `config`.
///
/// Plain text in development, JSON in containers. No distributed-tracing
/// export: this workspace has no collector for it (see DESIGN.md).
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if config.json_logs {
        let subscriber = fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    tracing::info!(service = %config.service_name, "telemetry initialized");
    Ok(())
}
