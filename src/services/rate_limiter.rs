use std::future::Future;

use tokio::sync::Semaphore;

use crate::error::{PaymentError, Result};

/// Counted semaphore bounding the number of dispatches in flight across the
/// whole worker pool. The permit is released on every exit path, including
/// cancellation of the guarded future.
pub struct RateLimiter {
    semaphore: Semaphore,
}

impl RateLimiter {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            semaphore: Semaphore::new(max_concurrency),
        }
    }

    /// Waits for a free slot, then runs `f` while holding it. Callers impose
    /// their deadline around this future; dropping it during the wait leaves
    /// `f` uninvoked.
    pub async fn with_permit<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| PaymentError::Cancelled)?;
        f().await
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}
