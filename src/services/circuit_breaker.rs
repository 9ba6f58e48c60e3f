use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{PaymentError, Result};

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    failures: u32,
    last_failure: Option<Instant>,
}

/// Guards a single capability, failing fast once the downstream has
/// misbehaved `max_failures` times in a row. One breaker per processor;
/// calls to distinct breakers run in parallel.
pub struct CircuitBreaker {
    max_failures: u32,
    reset_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(max_failures: u32, reset_timeout: Duration) -> Self {
        Self {
            max_failures,
            reset_timeout,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                failures: 0,
                last_failure: None,
            }),
        }
    }

    /// Runs `f` under the breaker. The state check and the guarded call are
    /// one critical section: the lock is held across the call, so state
    /// transitions are atomic with respect to every other call on this
    /// breaker.
    ///
    /// While open and inside the reset window the guarded call is never
    /// invoked and `BreakerOpen` is returned. The first call after the
    /// window moves the breaker to half-open and probes the downstream.
    pub async fn call<F, Fut>(&self, f: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut inner = self.inner.lock().await;

        if inner.state == BreakerState::Open {
            let reset_due = inner
                .last_failure
                .is_some_and(|at| at.elapsed() > self.reset_timeout);
            if !reset_due {
                return Err(PaymentError::BreakerOpen);
            }
            inner.state = BreakerState::HalfOpen;
            inner.failures = 0;
        }

        match f().await {
            Ok(()) => {
                inner.state = BreakerState::Closed;
                inner.failures = 0;
                inner.last_failure = None;
                Ok(())
            }
            Err(err) => {
                inner.failures += 1;
                inner.last_failure = Some(Instant::now());
                // A half-open probe reopens on any failure; a closed breaker
                // opens once the failure budget is spent.
                if inner.state == BreakerState::HalfOpen || inner.failures >= self.max_failures {
                    inner.state = BreakerState::Open;
                }
                Err(err)
            }
        }
    }

    pub async fn state(&self) -> BreakerState {
        self.inner.lock().await.state
    }

    pub async fn failure_count(&self) -> u32 {
        self.inner.lock().await.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn failing() -> Result<()> {
        Err(PaymentError::ProcessingFailed)
    }

    #[tokio::test]
    async fn stays_closed_while_under_the_failure_budget() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(10));

        for _ in 0..2 {
            let _ = breaker.call(|| async { failing() }).await;
        }

        assert_eq!(breaker.state().await, BreakerState::Closed);
        assert_eq!(breaker.failure_count().await, 2);
    }

    #[tokio::test]
    async fn success_resets_the_failure_count() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(10));

        let _ = breaker.call(|| async { failing() }).await;
        breaker.call(|| async { Ok(()) }).await.unwrap();

        assert_eq!(breaker.failure_count().await, 0);
        assert_eq!(breaker.state().await, BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn opens_after_max_failures_and_fails_fast() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(10));
        let invocations = AtomicU32::new(0);

        for _ in 0..3 {
            let _ = breaker
                .call(|| async {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    failing()
                })
                .await;
        }
        assert_eq!(breaker.state().await, BreakerState::Open);

        // Inside the reset window the downstream is never touched.
        let result = breaker
            .call(|| async {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(PaymentError::BreakerOpen)));
        assert_eq!(invocations.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_probe_closes_on_success() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(10));
        let _ = breaker.call(|| async { failing() }).await;
        assert_eq!(breaker.state().await, BreakerState::Open);

        tokio::time::advance(Duration::from_secs(11)).await;

        breaker.call(|| async { Ok(()) }).await.unwrap();
        assert_eq!(breaker.state().await, BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_probe_reopens_on_failure() {
        let breaker = CircuitBreaker::new(5, Duration::from_secs(10));
        for _ in 0..5 {
            let _ = breaker.call(|| async { failing() }).await;
        }
        assert_eq!(breaker.state().await, BreakerState::Open);

        tokio::time::advance(Duration::from_secs(11)).await;

        // One failed probe is enough to reopen, budget notwithstanding.
        let _ = breaker.call(|| async { failing() }).await;
        assert_eq!(breaker.state().await, BreakerState::Open);
    }
}
