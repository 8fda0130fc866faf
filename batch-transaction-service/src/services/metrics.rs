//! Prometheus metrics for batch-transaction-service.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, CounterVec, HistogramVec,
    IntCounter, TextEncoder,
};
use std::sync::OnceLock;

/// Handle for the `metrics` facade recorder fed by the HTTP middleware.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Upload attempts by outcome (`created`, `parse_error`, `store_error`, ...).
pub static UPLOADS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "batch_uploads_total",
        "Total number of batch uploads by outcome",
        &["outcome"]
    )
    .expect("Failed to register batch_uploads_total")
});

/// Detail rows committed as part of a successful upload.
pub static DETAIL_ROWS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "batch_detail_rows_total",
        "Total number of detail rows persisted"
    )
    .expect("Failed to register batch_detail_rows_total")
});

/// Approve/reject attempts by requested status and outcome.
pub static STATUS_UPDATES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "batch_status_updates_total",
        "Total number of status update attempts",
        &["status", "outcome"]
    )
    .expect("Failed to register batch_status_updates_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "batch_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register batch_db_query_duration_seconds")
});

/// Initialize all metrics (forces lazy initialization) and install the
/// facade recorder. Safe to call more than once.
pub fn init_metrics() {
    Lazy::force(&UPLOADS_TOTAL);
    Lazy::force(&DETAIL_ROWS_TOTAL);
    Lazy::force(&STATUS_UPDATES_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);

    if METRICS_HANDLE.get().is_none() {
        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                let _ = METRICS_HANDLE.set(handle);
            }
            Err(e) => tracing::warn!(error = %e, "Prometheus recorder already installed"),
        }
    }
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_default();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    if let Ok(custom) = encoder.encode_to_string(&metric_families) {
        output.push_str(&custom);
    }

    output
}
