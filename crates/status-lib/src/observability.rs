//! Observability infrastructure for the status exporter
//!
//! Provides:
//! - Prometheus metrics (aggregation latency, pass/failure counters, skipped inspects)
//! - Structured JSON logging with tracing

use crate::models::{CanonicalStatus, StatusReport};
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge_vec, Encoder, Histogram,
    IntCounter, IntGaugeVec, TextEncoder,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Histogram buckets for aggregation latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<StatusMetricsInner> = OnceLock::new();

struct StatusMetricsInner {
    aggregation_latency_seconds: Histogram,
    aggregation_passes: IntCounter,
    list_failures: IntCounter,
    inspect_skipped: IntCounter,
    containers_by_status: IntGaugeVec,
    engine_backend_info: IntGaugeVec,
}

impl StatusMetricsInner {
    fn new() -> Self {
        Self {
            aggregation_latency_seconds: register_histogram!(
                "container_status_aggregation_latency_seconds",
                "Time spent on one list/inspect/normalize pass",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register aggregation_latency_seconds"),

            aggregation_passes: register_int_counter!(
                "container_status_aggregation_passes_total",
                "Total number of aggregation passes started"
            )
            .expect("Failed to register aggregation_passes"),

            list_failures: register_int_counter!(
                "container_status_list_failures_total",
                "Total number of passes aborted because listing containers failed"
            )
            .expect("Failed to register list_failures"),

            inspect_skipped: register_int_counter!(
                "container_status_inspect_skipped_total",
                "Total number of containers omitted because inspect failed"
            )
            .expect("Failed to register inspect_skipped"),

            containers_by_status: register_int_gauge_vec!(
                "container_status_containers",
                "Containers per canonical status in the last report",
                &["status"]
            )
            .expect("Failed to register containers_by_status"),

            engine_backend_info: register_int_gauge_vec!(
                "container_status_engine_backend_info",
                "Engine binding in use",
                &["backend"]
            )
            .expect("Failed to register engine_backend_info"),
        }
    }
}

/// Exporter metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct StatusMetrics {
    _private: (),
}

impl Default for StatusMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(StatusMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &StatusMetricsInner {
        GLOBAL_METRICS.get_or_init(StatusMetricsInner::new)
    }

    pub fn observe_aggregation_latency(&self, duration_secs: f64) {
        self.inner().aggregation_latency_seconds.observe(duration_secs);
    }

    pub fn inc_aggregation_passes(&self) {
        self.inner().aggregation_passes.inc();
    }

    pub fn inc_list_failures(&self) {
        self.inner().list_failures.inc();
    }

    pub fn inc_inspect_skipped(&self) {
        self.inner().inspect_skipped.inc();
    }

    /// Publish per-status container counts of a finished report
    pub fn record_report(&self, report: &StatusReport) {
        for status in CanonicalStatus::ALL {
            self.inner()
                .containers_by_status
                .with_label_values(&[status.as_str()])
                .set(report.count(status) as i64);
        }
    }

    pub fn set_engine_backend(&self, backend: &str) {
        self.inner().engine_backend_info.reset();
        self.inner()
            .engine_backend_info
            .with_label_values(&[backend])
            .set(1);
    }

    /// Encode every registered metric in the Prometheus text format
    pub fn encode_text(&self) -> Result<Vec<u8>, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

/// Structured logger for exporter events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log exporter startup
    pub fn log_startup(&self, version: &str, backend: &str, addr: &str) {
        info!(
            event = "agent_started",
            service = %self.service,
            agent_version = %version,
            engine_backend = %backend,
            addr = %addr,
            "Container status exporter started"
        );
    }

    /// Log exporter shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            service = %self.service,
            reason = %reason,
            "Container status exporter shutting down"
        );
    }

    /// Log a container omitted from the report
    pub fn log_inspect_skipped(&self, container_id: &str, name: &str, error: &str) {
        debug!(
            event = "inspect_skipped",
            service = %self.service,
            container_id = %container_id,
            container_name = %name,
            error = %error,
            "Skipping container, inspect failed"
        );
    }

    /// Log an aborted aggregation pass
    pub fn log_list_failed(&self, error: &str) {
        warn!(
            event = "list_failed",
            service = %self.service,
            error = %error,
            "Failed to list containers"
        );
    }

    /// Log a finished aggregation pass
    pub fn log_aggregation(
        &self,
        listed: usize,
        reported: usize,
        skipped: usize,
        elapsed: Duration,
    ) {
        debug!(
            event = "aggregation_completed",
            service = %self.service,
            listed = listed,
            reported = reported,
            skipped = skipped,
            elapsed_ms = elapsed.as_millis() as u64,
            "Aggregation pass complete"
        );
    }
}
