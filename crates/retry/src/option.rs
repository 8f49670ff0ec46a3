//! # Retry Options
//!
//! Options configure a [`crate::Retrier`]. They are applied in order on top of
//! the default profile, so a later option overrides an earlier one. Each option
//! validates its value; an invalid value aborts construction.

use crate::duration::parse_duration;
use crate::error::ConfigError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default delay before the second attempt
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(10);
/// Default backoff multiplier
pub const DEFAULT_FACTOR: f64 = 1.6;
/// Default jitter fraction
pub const DEFAULT_JITTER: f64 = 0.2;
/// Default total time budget of one run
pub const DEFAULT_BACKOFF_TIMEOUT: Duration = Duration::from_secs(180);
/// Default number of operation invocations
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Callback receiving every intermediate failure
pub type ErrorObserver<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// A single retrier setting
pub enum RetryOption<E> {
    /// Maximum number of operation invocations (>= 1)
    MaxAttempts(u32),
    /// First backoff interval as a duration literal, e.g. `"10ms"`
    InitialDelay(String),
    /// First backoff interval as a positive decimal number of milliseconds
    InitialDelayMillis(String),
    /// First backoff interval
    InitialDelayDuration(Duration),
    /// Total time budget as a duration literal, e.g. `"3m"`
    BackoffTimeout(String),
    /// Total time budget as a positive decimal number of seconds
    BackoffTimeoutSecs(String),
    /// Total time budget
    BackoffTimeoutDuration(Duration),
    /// Multiplier applied to the delay after each completed wait (> 0)
    Factor(f64),
    /// Symmetric randomization fraction, `0.0..=1.0`
    Jitter(f64),
    /// Failure observer; `None` is rejected
    ErrorObserver(Option<ErrorObserver<E>>),
    /// Seed for the retrier's random source
    Seed(u64),
}

impl<E> RetryOption<E> {
    /// Observer option from a closure
    pub fn error_observer<F>(observer: F) -> Self
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        RetryOption::ErrorObserver(Some(Arc::new(observer)))
    }

    pub(crate) fn apply(self, config: &mut RetryConfig<E>) -> Result<(), ConfigError> {
        match self {
            RetryOption::MaxAttempts(n) => {
                if n == 0 {
                    return Err(ConfigError::InvalidNumber {
                        field: "max_attempts",
                        value: n.to_string(),
                    });
                }
                config.max_attempts = n;
            }
            RetryOption::InitialDelay(literal) => {
                config.initial_delay = positive_duration("initial_delay", &literal)?;
            }
            RetryOption::InitialDelayMillis(value) => {
                let n = positive_int("initial_delay", &value)?;
                config.initial_delay = Duration::from_millis(n);
            }
            RetryOption::InitialDelayDuration(d) => {
                config.initial_delay = non_zero("initial_delay", d)?;
            }
            RetryOption::BackoffTimeout(literal) => {
                config.backoff_timeout = positive_duration("backoff_timeout", &literal)?;
            }
            RetryOption::BackoffTimeoutSecs(value) => {
                let n = positive_int("backoff_timeout", &value)?;
                config.backoff_timeout = Duration::from_secs(n);
            }
            RetryOption::BackoffTimeoutDuration(d) => {
                config.backoff_timeout = non_zero("backoff_timeout", d)?;
            }
            RetryOption::Factor(f) => {
                if !(f.is_finite() && f > 0.0) {
                    return Err(ConfigError::InvalidNumber {
                        field: "factor",
                        value: f.to_string(),
                    });
                }
                config.factor = f;
            }
            RetryOption::Jitter(f) => {
                // Zero disables randomization; above one the scale could turn negative.
                if !(0.0..=1.0).contains(&f) {
                    return Err(ConfigError::InvalidNumber {
                        field: "jitter",
                        value: f.to_string(),
                    });
                }
                config.jitter = f;
            }
            RetryOption::ErrorObserver(observer) => {
                config.error_observer = observer.ok_or(ConfigError::MissingObserver)?;
            }
            RetryOption::Seed(seed) => {
                config.seed = Some(seed);
            }
        }
        Ok(())
    }
}

impl<E> fmt::Debug for RetryOption<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryOption::MaxAttempts(n) => f.debug_tuple("MaxAttempts").field(n).finish(),
            RetryOption::InitialDelay(s) => f.debug_tuple("InitialDelay").field(s).finish(),
            RetryOption::InitialDelayMillis(s) => {
                f.debug_tuple("InitialDelayMillis").field(s).finish()
            }
            RetryOption::InitialDelayDuration(d) => {
                f.debug_tuple("InitialDelayDuration").field(d).finish()
            }
            RetryOption::BackoffTimeout(s) => f.debug_tuple("BackoffTimeout").field(s).finish(),
            RetryOption::BackoffTimeoutSecs(s) => {
                f.debug_tuple("BackoffTimeoutSecs").field(s).finish()
            }
            RetryOption::BackoffTimeoutDuration(d) => {
                f.debug_tuple("BackoffTimeoutDuration").field(d).finish()
            }
            RetryOption::Factor(v) => f.debug_tuple("Factor").field(v).finish(),
            RetryOption::Jitter(v) => f.debug_tuple("Jitter").field(v).finish(),
            RetryOption::ErrorObserver(observer) => f
                .debug_tuple("ErrorObserver")
                .field(&observer.as_ref().map(|_| "<fn>"))
                .finish(),
            RetryOption::Seed(seed) => f.debug_tuple("Seed").field(seed).finish(),
        }
    }
}

/// Settings a retrier is built from
pub(crate) struct RetryConfig<E> {
    pub(crate) max_attempts: u32,
    pub(crate) initial_delay: Duration,
    pub(crate) factor: f64,
    pub(crate) jitter: f64,
    pub(crate) backoff_timeout: Duration,
    pub(crate) error_observer: ErrorObserver<E>,
    pub(crate) seed: Option<u64>,
}

impl<E: 'static> Default for RetryConfig<E> {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            factor: DEFAULT_FACTOR,
            jitter: DEFAULT_JITTER,
            backoff_timeout: DEFAULT_BACKOFF_TIMEOUT,
            error_observer: Arc::new(|_: &E| {}),
            seed: None,
        }
    }
}

fn positive_duration(field: &'static str, literal: &str) -> Result<Duration, ConfigError> {
    let parsed = parse_duration(literal).map_err(|source| ConfigError::InvalidDuration {
        field,
        value: literal.to_string(),
        source,
    })?;
    if !parsed.is_positive() {
        return Err(ConfigError::InvalidNumber {
            field,
            value: literal.to_string(),
        });
    }
    Ok(parsed.magnitude)
}

fn positive_int(field: &'static str, value: &str) -> Result<u64, ConfigError> {
    let n: i64 = value
        .trim()
        .parse()
        .map_err(|source| ConfigError::InvalidInteger {
            field,
            value: value.to_string(),
            source,
        })?;
    u64::try_from(n)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

fn non_zero(field: &'static str, d: Duration) -> Result<Duration, ConfigError> {
    if d.is_zero() {
        return Err(ConfigError::InvalidNumber {
            field,
            value: format!("{d:?}"),
        });
    }
    Ok(d)
}
