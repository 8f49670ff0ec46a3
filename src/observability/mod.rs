//! # Observability
//!
//! Structured logging, per-request log context and Prometheus metrics.

pub mod context;
pub mod logging;
pub mod metrics;

pub use context::RequestContext;
pub use logging::{init_logging, GcpJsonFormat, LogFormat, LogLevel, LoggingError};
