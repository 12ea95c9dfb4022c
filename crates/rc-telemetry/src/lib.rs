//! # RoboCloud Telemetry
//!
//! Structured logging and Prometheus metrics for the control plane.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rc_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).expect("telemetry");
//!     // Logs and metrics are now being collected
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RUST_LOG` | - | Full filter directive, wins over `RC_LOG_LEVEL` |
//! | `RC_LOG_LEVEL` | `info` | Log level filter |
//! | `RC_JSON_LOGS` | `false` | Emit JSON log lines |
//! | `RC_CONSOLE_OUTPUT` | `true` | Write logs to stdout at all |
//! | `RC_SERVICE_NAME` | `robocloud-master` | Service name attached to startup logs |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle, BUS_MESSAGES,
    CONNECTIONS_LIVE, CONTAINERS_CREATED, CONTAINERS_DESTROYED, DELIVERIES, INBOUND_DROPPED,
    RPC_DURATION, RPC_REQUESTS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    init_logging(&config)?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard { _metrics: metrics })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::MetricsInit("duplicate".into());
        assert_eq!(
            err.to_string(),
            "Failed to initialize Prometheus metrics: duplicate"
        );
    }
}
