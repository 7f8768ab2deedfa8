//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for process-wide logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line (e.g. "kibotos-api").
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error).
    pub log_level: String,

    /// Whether to emit JSON-formatted logs (preferred in containers).
    pub json_logs: bool,

    /// Port the `/v1/metrics`-equivalent exposition listens on, for
    /// binaries that run a standalone metrics listener instead of mounting
    /// it on the main HTTP server.
    pub metrics_port: u16,
}

impl TelemetryConfig {
    /// Build configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `KIBOTOS_LOG_LEVEL` or `RUST_LOG`: log level (default: info)
    /// - `KIBOTOS_JSON_LOGS`: emit JSON logs (default: false, true in containers)
    /// - `KIBOTOS_METRICS_PORT`: metrics listener port (default: 9100)
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: service_name.into(),
            log_level: env::var("KIBOTOS_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),
            json_logs: env::var("KIBOTOS_JSON_LOGS")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(is_container),
            metrics_port: env::var("KIBOTOS_METRICS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(9100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_info() {
        // SAFETY: test runs single-threaded w.r.t. this var via serial env access.
        let config = TelemetryConfig {
            service_name: "test".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            metrics_port: 9100,
        };
        assert_eq!(config.log_level, "info");
        assert_eq!(config.metrics_port, 9100);
    }
}
