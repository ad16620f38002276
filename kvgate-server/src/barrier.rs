//! Shutdown barrier
//!
//! Counts live workers so the orchestrator can wait for all of them to exit
//! before the store is torn down. Workers are detached tasks; the barrier is
//! the only thing that knows how many are still running.

use tokio::sync::watch;
use tracing::{trace, warn};

/// Count of registered workers with a wait-for-zero operation
#[derive(Debug)]
pub struct ShutdownBarrier {
    active: watch::Sender<usize>,
}

impl Default for ShutdownBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownBarrier {
    pub fn new() -> Self {
        let (active, _) = watch::channel(0);
        Self { active }
    }

    /// Record one more live worker
    pub fn enter(&self) {
        self.active.send_modify(|count| *count += 1);
        trace!(active = self.active(), "Barrier entered");
    }

    /// Record that a worker has fully exited
    ///
    /// Every change is published, so waiters observe the transition to zero.
    pub fn leave(&self) {
        let mut underflow = false;
        self.active.send_modify(|count| match count.checked_sub(1) {
            Some(next) => *count = next,
            None => underflow = true,
        });

        if underflow {
            warn!("Barrier left more times than entered");
        } else {
            trace!(active = self.active(), "Barrier left");
        }
    }

    /// Number of live workers
    pub fn active(&self) -> usize {
        *self.active.borrow()
    }

    /// Wait until no worker is live
    ///
    /// Returns immediately if the count is already zero.
    pub async fn wait_for_zero(&self) {
        let mut rx = self.active.subscribe();
        // The sender is owned by `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_for_zero_when_idle() {
        let barrier = ShutdownBarrier::new();
        tokio::time::timeout(Duration::from_secs(1), barrier.wait_for_zero())
            .await
            .expect("idle barrier should not block");
    }

    #[test]
    fn test_enter_leave_counts() {
        let barrier = ShutdownBarrier::new();
        barrier.enter();
        barrier.enter();
        assert_eq!(barrier.active(), 2);

        barrier.leave();
        assert_eq!(barrier.active(), 1);
        barrier.leave();
        assert_eq!(barrier.active(), 0);
    }

    #[test]
    fn test_leave_never_underflows() {
        let barrier = ShutdownBarrier::new();
        barrier.leave();
        assert_eq!(barrier.active(), 0);
    }

    #[tokio::test]
    async fn test_wait_blocks_until_last_leave() {
        let barrier = Arc::new(ShutdownBarrier::new());
        barrier.enter();
        barrier.enter();

        let waiter = {
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move { barrier.wait_for_zero().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        barrier.leave();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        barrier.leave();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be released at zero")
            .unwrap();
    }

    #[tokio::test]
    async fn test_many_waiters_released_together() {
        let barrier = Arc::new(ShutdownBarrier::new());
        barrier.enter();

        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move { barrier.wait_for_zero().await })
            })
            .collect();

        barrier.leave();
        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .unwrap()
                .unwrap();
        }
    }
}
