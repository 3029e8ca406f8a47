//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Pagemark metrics
pub const METRICS_PREFIX: &str = "pagemark";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 250ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms - P50 target
    0.100, // 100ms
    0.250, // 250ms - P99 target
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Upload metrics
    describe_counter!(
        format!("{}_uploads_total", METRICS_PREFIX),
        Unit::Count,
        "Total PDFs uploaded"
    );

    describe_counter!(
        format!("{}_upload_bytes_total", METRICS_PREFIX),
        Unit::Bytes,
        "Total bytes of PDF uploaded"
    );

    // Annotation metrics
    describe_counter!(
        format!("{}_annotations_total", METRICS_PREFIX),
        Unit::Count,
        "Annotation writes by kind and operation"
    );

    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total in-document search queries"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "In-document search latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record a stored upload
pub fn record_upload(bytes: u64) {
    counter!(format!("{}_uploads_total", METRICS_PREFIX)).increment(1);
    counter!(format!("{}_upload_bytes_total", METRICS_PREFIX)).increment(bytes);
}

/// Record an annotation write, e.g. `("highlight", "create")`
pub fn record_annotation(kind: &'static str, operation: &'static str) {
    counter!(
        format!("{}_annotations_total", METRICS_PREFIX),
        "kind" => kind,
        "operation" => operation
    )
    .increment(1);
}

/// Record an in-document search
pub fn record_search(duration_secs: f64, pages_matched: usize) {
    let outcome = if pages_matched > 0 { "hit" } else { "miss" };

    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);

    histogram!(format!("{}_search_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}
