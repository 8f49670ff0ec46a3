//! End-to-end behaviour of the retry loop under paused tokio time.

use retry::{CancelCause, CancelSignal, Retrier, RetryError, RetryErrorKind};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("failure #{0}")]
struct Failure(u32);

type Observed = Arc<Mutex<Vec<Failure>>>;

/// 10ms initial delay, factor 2, no jitter, 1s budget, 4 attempts
fn scenario_retrier(observed: &Observed) -> Retrier<Failure> {
    scenario_builder(observed).build().unwrap()
}

fn scenario_builder(observed: &Observed) -> retry::RetrierBuilder<Failure> {
    let sink = Arc::clone(observed);
    Retrier::builder()
        .initial_delay("10ms")
        .factor(2.0)
        .jitter(0.0)
        .backoff_timeout("1s")
        .max_attempts(4)
        .error_observer(move |err: &Failure| sink.lock().unwrap().push(*err))
}

fn observed() -> Observed {
    Arc::new(Mutex::new(Vec::new()))
}

fn assert_elapsed(start: Instant, expected_ms: u64) {
    let elapsed = start.elapsed();
    let expected = Duration::from_millis(expected_ms);
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(5),
        "expected about {expected:?}, got {elapsed:?}"
    );
}

/// Operation failing with `Failure(1)`, `Failure(2)`, ... on every call
fn always_failing() -> impl FnMut(CancelSignal) -> std::future::Ready<Result<(), Failure>> {
    let mut calls = 0;
    move |_| {
        calls += 1;
        std::future::ready(Err(Failure(calls)))
    }
}

#[tokio::test(start_paused = true)]
async fn test_success_on_first_attempt() {
    let observed = observed();
    let retrier = scenario_retrier(&observed);
    let start = Instant::now();

    let value = retrier
        .run(&CancelSignal::new(), |_| async { Ok::<_, Failure>(42) })
        .await
        .unwrap();

    assert_eq!(value, 42);
    assert!(observed.lock().unwrap().is_empty());
    assert!(start.elapsed() < Duration::from_millis(10));
}

#[tokio::test(start_paused = true)]
async fn test_success_after_two_failures() {
    let observed = observed();
    let retrier = scenario_retrier(&observed);
    let start = Instant::now();
    let mut calls = 0;

    let value = retrier
        .run(&CancelSignal::new(), |_| {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt < 3 {
                    Err(Failure(attempt))
                } else {
                    Ok("ready")
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(value, "ready");
    assert_eq!(*observed.lock().unwrap(), vec![Failure(1), Failure(2)]);
    assert_elapsed(start, 30);
}

#[tokio::test(start_paused = true)]
async fn test_max_attempts_without_final_wait() {
    let observed = observed();
    let retrier = scenario_retrier(&observed);
    let start = Instant::now();

    let err = retrier
        .run(&CancelSignal::new(), always_failing())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RetryError::MaxAttempts {
            source: Failure(4),
            attempts: 4
        }
    ));
    assert_eq!(err.to_string(), "failure #4: reached max retry");
    assert_eq!(
        *observed.lock().unwrap(),
        vec![Failure(1), Failure(2), Failure(3), Failure(4)]
    );
    assert_elapsed(start, 70);
}

#[tokio::test(start_paused = true)]
async fn test_budget_expires_during_wait() {
    let observed = observed();
    let retrier = scenario_builder(&observed)
        .backoff_timeout("50ms")
        .build()
        .unwrap();
    let start = Instant::now();

    let err = retrier
        .run(&CancelSignal::new(), always_failing())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), RetryErrorKind::BackoffTimeout);
    assert_eq!(*err.last_error(), Failure(3));
    assert_eq!(err.attempts(), 3);
    assert_eq!(err.to_string(), "failure #3: backoff timeout");
    assert_eq!(observed.lock().unwrap().len(), 3);
    assert_elapsed(start, 50);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_first_wait() {
    let observed = observed();
    let retrier = scenario_retrier(&observed);
    let signal = CancelSignal::new();

    let canceller = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        canceller.cancel();
    });

    let err = retrier.run(&signal, always_failing()).await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(err.cancel_cause(), Some(CancelCause::Cancelled));
    assert_eq!(*err.last_error(), Failure(1));
    assert_eq!(err.to_string(), "failure #1: context canceled");
    assert_eq!(*observed.lock().unwrap(), vec![Failure(1)]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_second_wait() {
    // The first wait ends at 10ms, so a cancel at 15ms lands in the 10ms..30ms wait.
    let observed = observed();
    let retrier = scenario_retrier(&observed);
    let signal = CancelSignal::new();
    let start = Instant::now();

    let canceller = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(15)).await;
        canceller.cancel();
    });

    let err = retrier.run(&signal, always_failing()).await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(*err.last_error(), Failure(2));
    assert_eq!(observed.lock().unwrap().len(), 2);
    assert_elapsed(start, 15);
}

#[tokio::test(start_paused = true)]
async fn test_single_attempt_never_waits() {
    let observed = observed();
    let retrier = scenario_builder(&observed).max_attempts(1).build().unwrap();
    let start = Instant::now();

    let err = retrier
        .run(&CancelSignal::new(), always_failing())
        .await
        .unwrap_err();

    assert!(err.is_max_attempts());
    assert_eq!(err.into_last_error(), Failure(1));
    assert_eq!(*observed.lock().unwrap(), vec![Failure(1)]);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_signal_reports_deadline_cause() {
    let retrier = scenario_retrier(&observed());
    let signal = CancelSignal::with_timeout(Duration::from_millis(25));

    let err = retrier.run(&signal, always_failing()).await.unwrap_err();

    assert_eq!(err.cancel_cause(), Some(CancelCause::DeadlineExceeded));
    assert_eq!(err.to_string(), "failure #2: context deadline exceeded");
}

#[tokio::test(start_paused = true)]
async fn test_already_cancelled_signal_still_runs_first_attempt() {
    let observed = observed();
    let retrier = scenario_retrier(&observed);
    let signal = CancelSignal::new();
    signal.cancel();

    let value = retrier
        .run(&signal, |_| async { Ok::<_, Failure>("done") })
        .await
        .unwrap();
    assert_eq!(value, "done");

    let err = retrier.run(&signal, always_failing()).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_budget_does_not_interrupt_running_operation() {
    let retrier = scenario_retrier(&observed());
    let start = Instant::now();

    let err = retrier
        .run(&CancelSignal::new(), |_| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Err::<(), _>(Failure(1))
        })
        .await
        .unwrap_err();

    // The budget ran out mid-attempt; the loop notices at the next wait.
    assert!(err.is_backoff_timeout());
    assert_eq!(err.attempts(), 1);
    assert_elapsed(start, 2000);
}

#[tokio::test(start_paused = true)]
async fn test_operation_receives_callers_signal() {
    let retrier = scenario_retrier(&observed());
    let signal = CancelSignal::new();
    let child = signal.child();

    let err = retrier
        .run(&child, |received| async move {
            // Cancelling the received signal is visible to the loop.
            received.cancel();
            Err::<(), _>(Failure(1))
        })
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(signal.cause().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_intervals_grow_geometrically() {
    let retrier = Retrier::<Failure>::builder()
        .initial_delay("10ms")
        .factor(3.0)
        .jitter(0.0)
        .max_attempts(5)
        .build()
        .unwrap();
    let calls: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));

    let recorder = Arc::clone(&calls);
    let _ = retrier
        .run(&CancelSignal::new(), move |_| {
            recorder.lock().unwrap().push(Instant::now());
            std::future::ready(Err::<(), _>(Failure(0)))
        })
        .await;

    let calls = calls.lock().unwrap();
    let gaps: Vec<u128> = calls
        .windows(2)
        .map(|w| (w[1] - w[0]).as_millis())
        .collect();
    assert_eq!(gaps.len(), 4);
    for (gap, expected) in gaps.iter().zip([10u128, 30, 90, 270]) {
        assert!(
            *gap >= expected && *gap < expected + 3,
            "gap {gap}ms, expected {expected}ms"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_jittered_intervals_stay_in_bounds() {
    let jitter = 0.5;
    let retrier = Retrier::<Failure>::builder()
        .initial_delay("100ms")
        .factor(1.0)
        .jitter(jitter)
        .max_attempts(8)
        .backoff_timeout("1m")
        .seed(1234)
        .build()
        .unwrap();
    let calls: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));

    let recorder = Arc::clone(&calls);
    let _ = retrier
        .run(&CancelSignal::new(), move |_| {
            recorder.lock().unwrap().push(Instant::now());
            std::future::ready(Err::<(), _>(Failure(0)))
        })
        .await;

    let calls = calls.lock().unwrap();
    let gaps: Vec<f64> = calls
        .windows(2)
        .map(|w| (w[1] - w[0]).as_secs_f64() * 1000.0)
        .collect();
    assert_eq!(gaps.len(), 7);
    assert!((gaps[0] - 100.0).abs() < 2.0, "first gap {}", gaps[0]);
    for pair in gaps.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        assert!(next >= prev * (1.0 - jitter) - 4.0, "{next} after {prev}");
        assert!(next <= prev * (1.0 + jitter) + 4.0, "{next} after {prev}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_shared_retrier_serves_concurrent_runs() {
    let observed = observed();
    let retrier = Arc::new(scenario_retrier(&observed));

    let first = {
        let retrier = Arc::clone(&retrier);
        tokio::spawn(async move {
            retrier
                .run(&CancelSignal::new(), always_failing())
                .await
                .unwrap_err()
        })
    };
    let second = {
        let retrier = Arc::clone(&retrier);
        tokio::spawn(async move {
            let mut calls = 0;
            retrier
                .run(&CancelSignal::new(), move |_| {
                    calls += 1;
                    let attempt = calls;
                    async move {
                        if attempt == 1 {
                            Err(Failure(100))
                        } else {
                            Ok(attempt)
                        }
                    }
                })
                .await
                .unwrap()
        })
    };

    let first = first.await.unwrap();
    let second = second.await.unwrap();

    assert!(first.is_max_attempts());
    assert_eq!(second, 2);
    // Four failures from the first run, one from the second.
    assert_eq!(observed.lock().unwrap().len(), 5);
}
