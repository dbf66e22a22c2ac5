//! Prometheus metrics for the Haki client core.
//!
//! All metrics follow the naming convention: `haki_<component>_<metric>_<unit>`
//!
//! Counters are process-global statics, so components increment them
//! whether or not [`register_metrics`] has been called; registration only
//! makes them visible to [`encode_metrics`].

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // SESSION METRICS
    // =========================================================================

    /// Wallet RPCs issued during connect and network remediation
    pub static ref WALLET_RPC_CALLS: CounterVec = CounterVec::new(
        Opts::new("haki_session_wallet_rpc_total", "Wallet RPC calls"),
        &["method", "outcome"]  // outcome: ok/rejected/error
    ).expect("metric creation failed");

    /// Connect attempts by outcome
    pub static ref SESSION_CONNECTS: CounterVec = CounterVec::new(
        Opts::new("haki_session_connects_total", "Wallet connect attempts"),
        &["outcome"]
    ).expect("metric creation failed");

    // =========================================================================
    // SYNCHRONIZER METRICS
    // =========================================================================

    /// Snapshot refreshes by outcome
    pub static ref REFRESHES: CounterVec = CounterVec::new(
        Opts::new("haki_sync_refreshes_total", "Snapshot refreshes"),
        &["outcome"]  // outcome: ok/failed
    ).expect("metric creation failed");

    /// Refresh duration
    pub static ref REFRESH_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "haki_sync_refresh_duration_seconds",
            "Time spent pulling a full snapshot"
        ).buckets(exponential_buckets(0.005, 2.0, 12).unwrap_or_default())
    ).expect("metric creation failed");

    /// Sub-collections replaced by an empty result after a read failure
    pub static ref SUBCOLLECTION_FALLBACKS: CounterVec = CounterVec::new(
        Opts::new("haki_sync_subcollection_fallbacks_total", "Sub-entity reads absorbed as empty"),
        &["collection"]  // milestones/donors/contributions/applications/balance
    ).expect("metric creation failed");

    /// Contract change notifications received
    pub static ref CHAIN_NOTIFICATIONS: CounterVec = CounterVec::new(
        Opts::new("haki_sync_notifications_total", "Contract change notifications"),
        &["topic"]
    ).expect("metric creation failed");

    /// Listeners currently installed on contract event sources
    pub static ref ACTIVE_LISTENERS: Gauge = Gauge::new(
        "haki_sync_active_listeners",
        "Contract event listeners currently installed"
    ).expect("metric creation failed");

    /// Write transactions by operation and outcome
    pub static ref CONTRACT_WRITES: CounterVec = CounterVec::new(
        Opts::new("haki_sync_contract_writes_total", "Submitted write operations"),
        &["operation", "outcome"]
    ).expect("metric creation failed");

    // =========================================================================
    // PIN GATEWAY METRICS
    // =========================================================================

    /// Pin requests by identity kind and response status
    pub static ref PIN_REQUESTS: CounterVec = CounterVec::new(
        Opts::new("haki_gateway_pin_requests_total", "Pin requests handled"),
        &["kind", "status"]
    ).expect("metric creation failed");
}

/// Handle for the metrics registry
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Session
        Box::new(WALLET_RPC_CALLS.clone()),
        Box::new(SESSION_CONNECTS.clone()),
        // Synchronizer
        Box::new(REFRESHES.clone()),
        Box::new(REFRESH_DURATION.clone()),
        Box::new(SUBCOLLECTION_FALLBACKS.clone()),
        Box::new(CHAIN_NOTIFICATIONS.clone()),
        Box::new(ACTIVE_LISTENERS.clone()),
        Box::new(CONTRACT_WRITES.clone()),
        // Gateway
        Box::new(PIN_REQUESTS.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        // May fail if another test registered first, which is fine
        let _ = register_metrics();
    }

    #[test]
    fn test_counter_increment() {
        REFRESHES.with_label_values(&["ok"]).inc();
        assert!(REFRESHES.with_label_values(&["ok"]).get() >= 1.0);
    }

    #[test]
    fn test_gauge_set() {
        ACTIVE_LISTENERS.set(4.0);
        assert_eq!(ACTIVE_LISTENERS.get(), 4.0);
    }

    #[test]
    fn test_encode_after_registration() {
        let _ = register_metrics();
        PIN_REQUESTS.with_label_values(&["lawyer", "200"]).inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("haki_gateway_pin_requests_total"));
    }
}
