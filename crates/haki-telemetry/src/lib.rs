//! # Haki Telemetry
//!
//! Logging, optional OpenTelemetry trace export and Prometheus counters for
//! the session manager, the state synchronizer and the pin gateway.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use haki_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).await.expect("telemetry");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `haki-bounty` | Service name in traces and logs |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | unset | OTLP endpoint; export disabled when unset |
//! | `HAKI_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `HAKI_JSON_LOGS` | `false` | JSON formatted logs |
//! | `HAKI_NETWORK` | `sepolia` | Deployment environment label |

mod config;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{encode_metrics, register_metrics, MetricsHandle};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize metrics and the tracing subscriber.
///
/// The returned guard must be held for the lifetime of the process; dropping
/// it flushes pending spans.
pub async fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics_handle = register_metrics()?;
    let tracing_guard = tracing_setup::init_tracing(&config).await?;

    Ok(TelemetryGuard {
        _tracing: tracing_guard,
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active. Drop to flush and shutdown.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
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
    fn test_default_service_name() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "haki-bounty");
    }
}
