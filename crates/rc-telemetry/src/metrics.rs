//! Prometheus metrics for the RoboCloud control plane.
//!
//! All metrics follow the naming convention: `rc_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g. containers_created_total)
//! - **Gauge**: Value that can go up or down (e.g. connections_live)
//! - **Histogram**: Distribution of values (e.g. rpc_request_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Metrics registry of the process
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // RPC METRICS
    // =========================================================================

    /// RPC requests by operation and outcome
    pub static ref RPC_REQUESTS: CounterVec = CounterVec::new(
        Opts::new("rc_rpc_requests_total", "RPC requests handled"),
        &["operation", "outcome"]  // outcome: ok/invalid_request/internal/conflict
    ).expect("metric creation failed");

    /// RPC handling duration
    pub static ref RPC_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "rc_rpc_request_duration_seconds",
            "Time spent handling RPC requests"
        ).buckets(exponential_buckets(0.0001, 2.0, 16).expect("valid buckets")),
        &["operation"]
    ).expect("metric creation failed");

    // =========================================================================
    // ENDPOINT METRICS
    // =========================================================================

    /// Containers created
    pub static ref CONTAINERS_CREATED: Counter = Counter::new(
        "rc_containers_created_total",
        "Total number of containers created"
    ).expect("metric creation failed");

    /// Containers destroyed
    pub static ref CONTAINERS_DESTROYED: Counter = Counter::new(
        "rc_containers_destroyed_total",
        "Total number of containers destroyed"
    ).expect("metric creation failed");

    /// Live connections
    pub static ref CONNECTIONS_LIVE: Gauge = Gauge::new(
        "rc_connections_live",
        "Number of currently live connections"
    ).expect("metric creation failed");

    // =========================================================================
    // MESSAGE FLOW METRICS
    // =========================================================================

    /// Messages handed to the bus
    pub static ref BUS_MESSAGES: CounterVec = CounterVec::new(
        Opts::new("rc_bus_messages_total", "Messages routed over the bus"),
        &["msg_type"]
    ).expect("metric creation failed");

    /// Interface deliveries by outcome
    pub static ref DELIVERIES: CounterVec = CounterVec::new(
        Opts::new("rc_deliveries_total", "Interface deliveries"),
        &["outcome"]  // outcome: delivered/rejected/discarded
    ).expect("metric creation failed");

    /// Inbound bus messages that could not be routed
    pub static ref INBOUND_DROPPED: Counter = Counter::new(
        "rc_inbound_dropped_total",
        "Inbound bus messages dropped by the master router"
    ).expect("metric creation failed");
}

/// Handle for the registered metrics
#[derive(Clone)]
pub struct MetricsHandle {
    registry: Arc<Registry>,
}

impl MetricsHandle {
    /// Render the registry in text exposition format.
    pub fn gather(&self) -> Result<String, TelemetryError> {
        encode(&self.registry)
    }
}

/// Register all metrics with the process registry.
///
/// Safe to call more than once.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // RPC
        Box::new(RPC_REQUESTS.clone()),
        Box::new(RPC_DURATION.clone()),
        // Endpoints
        Box::new(CONTAINERS_CREATED.clone()),
        Box::new(CONTAINERS_DESTROYED.clone()),
        Box::new(CONNECTIONS_LIVE.clone()),
        // Message flow
        Box::new(BUS_MESSAGES.clone()),
        Box::new(DELIVERIES.clone()),
        Box::new(INBOUND_DROPPED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    encode(&REGISTRY)
}

fn encode(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: prometheus::Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start timing `operation` on the RPC duration histogram.
    pub fn rpc(operation: &str) -> Self {
        Self {
            histogram: RPC_DURATION.with_label_values(&[operation]),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}
