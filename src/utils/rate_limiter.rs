use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};

/// Caps the number of concurrent RPC requests. Tracing endpoints are slow
/// and archive nodes throttle aggressively, so the batched trace fetchers
/// take a permit per request instead of firing a whole block range at once.
pub struct RequestLimiter {
    semaphore: Semaphore,
}

impl RequestLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Semaphore::new(max_concurrent),
        }
    }

    /// Wait for a free slot. The permit releases on drop.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, AcquireError> {
        self.semaphore.acquire().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn limits_concurrent_tasks() {
        let limiter = RequestLimiter::new(2);
        let in_flight = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);

        let tasks = (0..8).map(|_| async {
            let _permit = limiter.acquire().await.unwrap();
            let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_seen.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });
        futures::future::join_all(tasks).await;

        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }
}
