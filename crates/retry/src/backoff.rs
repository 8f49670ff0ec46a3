//! # Backoff Accumulator
//!
//! Per-run delay state. The delay starts at the initial delay and, after each
//! completed wait, grows as `delay * factor * (1 + jitter * u)` for a uniform
//! draw `u` in `[-1, 1)`. Growth is not clamped; only the run's time budget
//! bounds the total waiting time.

use std::time::Duration;

/// Exponential backoff with symmetric jitter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Current delay in nanoseconds
    nanos: f64,
    factor: f64,
    jitter: f64,
}

impl Backoff {
    #[allow(
        clippy::cast_precision_loss,
        reason = "delays are far below 2^52 ns where f64 is exact"
    )]
    pub fn new(initial: Duration, factor: f64, jitter: f64) -> Self {
        Self {
            nanos: initial.as_nanos() as f64,
            factor,
            jitter,
        }
    }

    /// Delay to wait before the next attempt
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "float to int casts saturate, so unbounded growth caps at u64::MAX ns"
    )]
    pub fn current(&self) -> Duration {
        Duration::from_nanos(self.nanos as u64)
    }

    /// Grow the delay after a completed wait
    ///
    /// `draw` is a uniform sample from `[-1, 1)`.
    pub fn advance(&mut self, draw: f64) {
        self.nanos *= self.factor;
        self.nanos *= 1.0 + self.jitter * draw;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_first_delay_is_initial_delay() {
        let backoff = Backoff::new(Duration::from_millis(10), 1.6, 0.2);
        assert_eq!(backoff.current(), Duration::from_millis(10));
    }

    #[test]
    fn test_growth_without_jitter_is_exact() {
        // initial * factor^(n-1) for the nth interval
        for factor in [2.0, 3.0] {
            let mut backoff = Backoff::new(Duration::from_millis(10), factor, 0.0);
            let mut expected: u64 = 10_000_000;
            for _ in 0..8 {
                assert_eq!(backoff.current(), Duration::from_nanos(expected));
                backoff.advance(0.73);
                expected *= factor as u64;
            }
        }
    }

    #[test]
    fn test_growth_with_fractional_factor() {
        let mut backoff = Backoff::new(Duration::from_millis(10), 1.6, 0.0);
        for n in 0..10 {
            let expected = 10_000_000f64 * 1.6f64.powi(n);
            let actual = backoff.current().as_nanos() as f64;
            assert!(
                (actual - expected).abs() <= 1.0,
                "interval {n}: expected {expected}, got {actual}"
            );
            backoff.advance(-0.5);
        }
    }

    #[test]
    fn test_jitter_extremes() {
        let mut low = Backoff::new(Duration::from_millis(100), 1.0, 0.2);
        low.advance(-1.0);
        assert_eq!(low.current(), Duration::from_millis(80));

        let mut high = Backoff::new(Duration::from_millis(100), 1.0, 0.2);
        high.advance(0.999_999);
        assert!(high.current() < Duration::from_millis(120));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let jitter = 0.25;
        let factor = 1.6;
        let mut backoff = Backoff::new(Duration::from_millis(10), factor, jitter);

        for _ in 0..20 {
            let before = backoff.current().as_nanos() as f64;
            backoff.advance(rng.random_range(-1.0..1.0));
            let base = before * factor;
            let after = backoff.current().as_nanos() as f64;
            assert!(after >= base * (1.0 - jitter) - 4.0, "{after} below {base}");
            assert!(after < base * (1.0 + jitter) + 4.0, "{after} above {base}");
        }
    }

    #[test]
    fn test_unbounded_growth_saturates() {
        let mut backoff = Backoff::new(Duration::from_secs(3600), 1000.0, 0.0);
        for _ in 0..20 {
            backoff.advance(0.0);
        }
        assert_eq!(backoff.current(), Duration::from_nanos(u64::MAX));
    }
}
