//! # Retry Error Types
//!
//! Configuration errors raised while building a [`crate::Retrier`], and the
//! terminal errors a retry loop concludes with.

use crate::duration::ParseDurationError;
use crate::signal::CancelCause;
use std::fmt;
use std::num::ParseIntError;
use thiserror::Error;

/// An option could not be applied; no retrier is produced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A numeric option is zero, negative or not finite
    #[error("failed to set retry.{field}: {value}")]
    InvalidNumber { field: &'static str, value: String },

    /// An integer option could not be parsed
    #[error("failed to set retry.{field}: {value}: {source}")]
    InvalidInteger {
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    /// A duration option could not be parsed
    #[error("failed to set retry.{field}: {value}: {source}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        #[source]
        source: ParseDurationError,
    },

    /// The error observer option was given without an observer
    #[error("failed to set retry.error_observer: observer is absent")]
    MissingObserver,
}

/// Field-less classification of a [`RetryError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorKind {
    BackoffTimeout,
    Cancelled,
    MaxAttempts,
}

impl RetryErrorKind {
    /// Short label, used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryErrorKind::BackoffTimeout => "backoff_timeout",
            RetryErrorKind::Cancelled => "cancelled",
            RetryErrorKind::MaxAttempts => "max_attempts",
        }
    }
}

/// Why a retry loop gave up, wrapping the last failure of the operation
#[derive(Debug)]
pub enum RetryError<E> {
    /// The total time budget expired while waiting between attempts
    BackoffTimeout { source: E, attempts: u32 },
    /// The cancellation signal fired while waiting between attempts
    Cancelled {
        source: E,
        cause: CancelCause,
        attempts: u32,
    },
    /// Every allowed attempt failed
    MaxAttempts { source: E, attempts: u32 },
}

impl<E> RetryError<E> {
    pub fn kind(&self) -> RetryErrorKind {
        match self {
            RetryError::BackoffTimeout { .. } => RetryErrorKind::BackoffTimeout,
            RetryError::Cancelled { .. } => RetryErrorKind::Cancelled,
            RetryError::MaxAttempts { .. } => RetryErrorKind::MaxAttempts,
        }
    }

    /// The failure of the last attempt
    pub fn last_error(&self) -> &E {
        match self {
            RetryError::BackoffTimeout { source, .. }
            | RetryError::Cancelled { source, .. }
            | RetryError::MaxAttempts { source, .. } => source,
        }
    }

    pub fn into_last_error(self) -> E {
        match self {
            RetryError::BackoffTimeout { source, .. }
            | RetryError::Cancelled { source, .. }
            | RetryError::MaxAttempts { source, .. } => source,
        }
    }

    /// Number of operation invocations that ran before the loop gave up
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::BackoffTimeout { attempts, .. }
            | RetryError::Cancelled { attempts, .. }
            | RetryError::MaxAttempts { attempts, .. } => *attempts,
        }
    }

    /// Cancellation cause, for [`RetryError::Cancelled`] only
    pub fn cancel_cause(&self) -> Option<CancelCause> {
        match self {
            RetryError::Cancelled { cause, .. } => Some(*cause),
            _ => None,
        }
    }

    pub fn is_backoff_timeout(&self) -> bool {
        self.kind() == RetryErrorKind::BackoffTimeout
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == RetryErrorKind::Cancelled
    }

    pub fn is_max_attempts(&self) -> bool {
        self.kind() == RetryErrorKind::MaxAttempts
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::BackoffTimeout { source, .. } => write!(f, "{source}: backoff timeout"),
            RetryError::Cancelled { source, cause, .. } => write!(f, "{source}: {cause}"),
            RetryError::MaxAttempts { source, .. } => write!(f, "{source}: reached max retry"),
        }
    }
}

impl<E> std::error::Error for RetryError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.last_error())
    }
}
