//! # Retrier
//!
//! Runs a fallible async operation under a bounded, jittered exponential
//! backoff loop with a total time budget and cooperative cancellation.
//!
//! ## Loop
//!
//! 1. Invoke the operation.
//! 2. Success: return it.
//! 3. Failure: report it to the error observer and count the attempt.
//! 4. Last attempt used: give up with [`RetryError::MaxAttempts`], without waiting.
//! 5. Otherwise wait for the first of
//!    - the run's deadline ([`RetryError::BackoffTimeout`]),
//!    - the cancellation signal ([`RetryError::Cancelled`]),
//!    - the backoff delay, after which the delay grows and the loop restarts.
//!
//! The deadline is armed once per run and never reset. It is only observed
//! while waiting: a running operation is never interrupted, it is expected to
//! watch the [`CancelSignal`] it receives.

use crate::backoff::Backoff;
use crate::error::{ConfigError, RetryError};
use crate::option::{ErrorObserver, RetryConfig, RetryOption};
use crate::signal::{CancelCause, CancelSignal};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Outcome of the wait between two attempts
enum Wait {
    Deadline,
    Cancelled(CancelCause),
    Elapsed,
}

/// Retry engine
///
/// Configuration is fixed at construction. The random source used for jitter
/// is owned by the instance and seeded once. An instance can be shared between
/// tasks: the random source is locked for a single draw at a time, and the
/// error observer is required to be `Send + Sync`. Observer panics are not
/// caught.
pub struct Retrier<E> {
    max_attempts: u32,
    initial_delay: Duration,
    factor: f64,
    jitter: f64,
    backoff_timeout: Duration,
    error_observer: ErrorObserver<E>,
    rng: Mutex<StdRng>,
}

impl<E: 'static> Retrier<E> {
    /// Build a retrier from the default profile plus `options`, applied in order
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] raised by an option.
    pub fn new<I>(options: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = RetryOption<E>>,
    {
        let mut config = RetryConfig::default();
        for option in options {
            option.apply(&mut config)?;
        }
        Ok(Self::from_config(config))
    }

    pub fn builder() -> RetrierBuilder<E> {
        RetrierBuilder::default()
    }

    fn from_config(config: RetryConfig<E>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            max_attempts: config.max_attempts,
            initial_delay: config.initial_delay,
            factor: config.factor,
            jitter: config.jitter,
            backoff_timeout: config.backoff_timeout,
            error_observer: config.error_observer,
            rng: Mutex::new(rng),
        }
    }
}

impl<E: 'static> Default for Retrier<E> {
    fn default() -> Self {
        Self::from_config(RetryConfig::default())
    }
}

impl<E> Retrier<E> {
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    pub fn backoff_timeout(&self) -> Duration {
        self.backoff_timeout
    }

    /// Run `operation` until it succeeds or the loop gives up
    ///
    /// The operation receives a clone of `signal` on every attempt.
    ///
    /// # Errors
    ///
    /// Returns exactly one of [`RetryError::MaxAttempts`],
    /// [`RetryError::BackoffTimeout`] or [`RetryError::Cancelled`], each
    /// wrapping the failure of the last attempt.
    pub async fn run<T, F, Fut>(
        &self,
        signal: &CancelSignal,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(CancelSignal) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let deadline = tokio::time::sleep(self.backoff_timeout);
        tokio::pin!(deadline);

        let mut backoff = Backoff::new(self.initial_delay, self.factor, self.jitter);
        let mut attempts: u32 = 0;

        loop {
            let error = match operation(signal.clone()).await {
                Ok(value) => {
                    if attempts > 0 {
                        trace!(attempts = attempts + 1, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            (self.error_observer)(&error);
            attempts += 1;

            if attempts >= self.max_attempts {
                return Err(gave_up(RetryError::MaxAttempts {
                    source: error,
                    attempts,
                }));
            }

            let delay = backoff.current();
            debug!(
                attempt = attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "operation failed, backing off"
            );

            let wait = tokio::select! {
                biased;
                () = &mut deadline => Wait::Deadline,
                cause = signal.cancelled() => Wait::Cancelled(cause),
                () = tokio::time::sleep(delay) => Wait::Elapsed,
            };

            match wait {
                Wait::Deadline => {
                    return Err(gave_up(RetryError::BackoffTimeout {
                        source: error,
                        attempts,
                    }));
                }
                Wait::Cancelled(cause) => {
                    return Err(gave_up(RetryError::Cancelled {
                        source: error,
                        cause,
                        attempts,
                    }));
                }
                Wait::Elapsed => backoff.advance(self.draw()),
            }
        }
    }

    /// Uniform sample from `[-1, 1)`
    fn draw(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random_range(-1.0..1.0)
    }
}

/// Log a terminal outcome
fn gave_up<E: fmt::Display>(err: RetryError<E>) -> RetryError<E> {
    warn!(
        kind = err.kind().as_str(),
        attempts = err.attempts(),
        error = %err.last_error(),
        "retry gave up"
    );
    err
}

impl<E> fmt::Debug for Retrier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrier")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay)
            .field("factor", &self.factor)
            .field("jitter", &self.jitter)
            .field("backoff_timeout", &self.backoff_timeout)
            .finish_non_exhaustive()
    }
}

/// Fluent front-end over [`RetryOption`]
///
/// Options are recorded in call order and validated by [`RetrierBuilder::build`].
pub struct RetrierBuilder<E> {
    options: Vec<RetryOption<E>>,
}

impl<E> Default for RetrierBuilder<E> {
    fn default() -> Self {
        Self {
            options: Vec::new(),
        }
    }
}

impl<E: 'static> RetrierBuilder<E> {
    #[must_use]
    pub fn option(mut self, option: RetryOption<E>) -> Self {
        self.options.push(option);
        self
    }

    #[must_use]
    pub fn max_attempts(self, n: u32) -> Self {
        self.option(RetryOption::MaxAttempts(n))
    }

    /// Duration literal, e.g. `"10ms"`
    #[must_use]
    pub fn initial_delay(self, literal: impl Into<String>) -> Self {
        self.option(RetryOption::InitialDelay(literal.into()))
    }

    #[must_use]
    pub fn initial_delay_millis(self, millis: impl Into<String>) -> Self {
        self.option(RetryOption::InitialDelayMillis(millis.into()))
    }

    #[must_use]
    pub fn initial_delay_duration(self, delay: Duration) -> Self {
        self.option(RetryOption::InitialDelayDuration(delay))
    }

    /// Duration literal, e.g. `"3m"`
    #[must_use]
    pub fn backoff_timeout(self, literal: impl Into<String>) -> Self {
        self.option(RetryOption::BackoffTimeout(literal.into()))
    }

    #[must_use]
    pub fn backoff_timeout_secs(self, secs: impl Into<String>) -> Self {
        self.option(RetryOption::BackoffTimeoutSecs(secs.into()))
    }

    #[must_use]
    pub fn backoff_timeout_duration(self, timeout: Duration) -> Self {
        self.option(RetryOption::BackoffTimeoutDuration(timeout))
    }

    #[must_use]
    pub fn factor(self, factor: f64) -> Self {
        self.option(RetryOption::Factor(factor))
    }

    #[must_use]
    pub fn jitter(self, jitter: f64) -> Self {
        self.option(RetryOption::Jitter(jitter))
    }

    #[must_use]
    pub fn error_observer<F>(self, observer: F) -> Self
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.option(RetryOption::error_observer(observer))
    }

    #[must_use]
    pub fn shared_error_observer(self, observer: Arc<dyn Fn(&E) + Send + Sync>) -> Self {
        self.option(RetryOption::ErrorObserver(Some(observer)))
    }

    #[must_use]
    pub fn seed(self, seed: u64) -> Self {
        self.option(RetryOption::Seed(seed))
    }

    /// # Errors
    ///
    /// Returns the first [`ConfigError`] raised by a recorded option.
    pub fn build(self) -> Result<Retrier<E>, ConfigError> {
        Retrier::new(self.options)
    }
}

impl<E> fmt::Debug for RetrierBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrierBuilder")
            .field("options", &self.options)
            .finish()
    }
}
