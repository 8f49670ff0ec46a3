//! # Cancellation Signal
//!
//! A cloneable one-shot signal telling a retry loop (and the operation it runs)
//! that the caller no longer wants the work to continue.
//!
//! The signal fires either when [`CancelSignal::cancel`] is called or, when the
//! signal carries a deadline, once that deadline passes. The reason is reported
//! as a [`CancelCause`].

use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a [`CancelSignal`] fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CancelCause {
    /// `cancel()` was called on the signal or one of its parents
    #[error("context canceled")]
    Cancelled,
    /// The deadline attached to the signal passed
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// External cancellation signal, optionally bound to a deadline
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancelSignal {
    /// A signal that only fires when cancelled explicitly
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that also fires at `deadline`
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// A signal that also fires once `timeout` has elapsed from now
    ///
    /// A timeout too large to represent yields a signal without deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Derived signal: cancelled together with `self`, sharing its deadline
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derived signal with an additional timeout; the earlier deadline wins
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let own = Instant::now().checked_add(timeout);
        let deadline = match (self.deadline, own) {
            (Some(parent), Some(own)) => Some(parent.min(own)),
            (parent, own) => parent.or(own),
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    /// Fire the signal with cause [`CancelCause::Cancelled`]
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Deadline attached to this signal, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Underlying token, for integrating with code that speaks `CancellationToken`
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Non-blocking check: the cause if the signal has already fired
    pub fn cause(&self) -> Option<CancelCause> {
        if self.token.is_cancelled() {
            return Some(CancelCause::Cancelled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(CancelCause::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the signal fires
    pub async fn cancelled(&self) -> CancelCause {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    () = self.token.cancelled() => CancelCause::Cancelled,
                    () = tokio::time::sleep_until(deadline) => CancelCause::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                CancelCause::Cancelled
            }
        }
    }
}

impl From<CancellationToken> for CancelSignal {
    fn from(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }
}
