//! # HTTP Metrics
//!
//! Request counts and latencies of the API server.

use crate::observability::metrics::registry::register;
use anyhow::Result;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};
use std::sync::LazyLock;

static HTTP_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "partpicker_http_requests_total",
            "Total number of HTTP requests handled",
        ),
        &["method", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric - this should never happen")
});

static HTTP_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "partpicker_http_request_duration_seconds",
            "Duration of HTTP requests in seconds",
        )
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["method"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION metric - this should never happen")
});

/// Register HTTP metrics with the registry
pub(crate) fn register_http_metrics() -> Result<()> {
    register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    register(Box::new(HTTP_REQUEST_DURATION.clone()))?;
    Ok(())
}

pub fn observe_http_request(method: &str, status: u16, duration_secs: f64) {
    let status = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, status.as_str()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method])
        .observe(duration_secs);
}

pub fn http_requests_total(method: &str, status: u16) -> u64 {
    let status = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, status.as_str()])
        .get()
}
