//! # Telemetry
//!
//! Structured logging and Prometheus metrics shared by every Kibotos binary
//! (`kibotos-api`, `kibotos-scheduler`, `kibotos-worker`).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kibotos_telemetry::{TelemetryConfig, init_logging};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env("kibotos-scheduler");
//!     init_logging(&config).expect("failed to init logging");
//!     // metrics are exported via metrics::encode() from a /v1/metrics handler
//! }
//! ```

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{init_logging, TelemetryError};
