//! # Metrics Module
//!
//! Prometheus metrics for monitoring the API, organized by responsibility.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup, registration and text exposition
//! - `http_metrics` - Request counts and latencies
//! - `store_metrics` - Document store probe activity

pub mod http_metrics;
pub mod registry;
pub mod store_metrics;

pub use http_metrics::*;
pub use registry::*;
pub use store_metrics::*;
