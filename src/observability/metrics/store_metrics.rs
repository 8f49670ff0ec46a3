//! # Store Metrics
//!
//! Liveness probe activity against the document store.

use crate::observability::metrics::registry::register;
use anyhow::Result;
use prometheus::IntCounter;
use std::sync::LazyLock;

static STORE_PING_ATTEMPTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "partpicker_store_ping_attempts_total",
        "Total number of document store pings",
    )
    .expect("Failed to create STORE_PING_ATTEMPTS_TOTAL metric - this should never happen")
});

static STORE_PING_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "partpicker_store_ping_failures_total",
        "Total number of failed document store pings",
    )
    .expect("Failed to create STORE_PING_FAILURES_TOTAL metric - this should never happen")
});

/// Register store metrics with the registry
pub(crate) fn register_store_metrics() -> Result<()> {
    register(Box::new(STORE_PING_ATTEMPTS_TOTAL.clone()))?;
    register(Box::new(STORE_PING_FAILURES_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_store_ping_attempts() {
    STORE_PING_ATTEMPTS_TOTAL.inc();
}

pub fn increment_store_ping_failures() {
    STORE_PING_FAILURES_TOTAL.inc();
}

pub fn store_ping_attempts() -> u64 {
    STORE_PING_ATTEMPTS_TOTAL.get()
}

pub fn store_ping_failures() -> u64 {
    STORE_PING_FAILURES_TOTAL.get()
}
