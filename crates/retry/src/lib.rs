//! # Retry
//!
//! Bounded retry with jittered exponential backoff, a total time budget and
//! cooperative cancellation.
//!
//! ```ignore
//! use retry::{CancelSignal, Retrier};
//!
//! let retrier = Retrier::builder()
//!     .max_attempts(4)
//!     .initial_delay("10ms")
//!     .backoff_timeout("1s")
//!     .error_observer(|err: &std::io::Error| tracing::warn!(error = %err, "attempt failed"))
//!     .build()?;
//!
//! let signal = CancelSignal::new();
//! let value = retrier.run(&signal, |_signal| async { connect().await }).await?;
//! ```
//!
//! The loop ends in exactly one of three ways besides success:
//!
//! - [`RetryError::MaxAttempts`]: every allowed attempt failed
//! - [`RetryError::BackoffTimeout`]: the time budget ran out between attempts
//! - [`RetryError::Cancelled`]: the caller's [`CancelSignal`] fired between attempts
//!
//! Each wraps the last failure of the operation.

mod backoff;
mod duration;
mod error;
mod option;
mod retrier;
mod signal;

pub use backoff::Backoff;
pub use duration::{parse_duration, ParseDurationError, SignedDuration};
pub use error::{ConfigError, RetryError, RetryErrorKind};
pub use option::{
    ErrorObserver, RetryOption, DEFAULT_BACKOFF_TIMEOUT, DEFAULT_FACTOR, DEFAULT_INITIAL_DELAY,
    DEFAULT_JITTER, DEFAULT_MAX_ATTEMPTS,
};
pub use retrier::{Retrier, RetrierBuilder};
pub use signal::{CancelCause, CancelSignal};
