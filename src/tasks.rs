//! Tracked background tasks.
//!
//! Reminders and DM broadcasts used to be fire-and-forget; here every
//! long-running task is spawned through one process-wide set that owns a
//! cancellation token, so shutdown can cancel and drain them.

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Process-wide registry of background tasks.
#[derive(Clone)]
pub struct TaskSet {
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl TaskSet {
    pub fn new() -> Self {
        Self {
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn a tracked task. The future receives a child cancellation token
    /// and is expected to select on it at its suspend points.
    pub fn spawn<F, Fut>(&self, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(task(self.cancel.child_token()));
    }

    /// Sleep that ends early on cancellation. Returns false when cancelled.
    pub async fn sleep(token: &CancellationToken, duration: std::time::Duration) -> bool {
        tokio::select! {
            _ = token.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    /// Cancel everything and wait for the set to drain.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Number of tasks still running.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }
}

impl Default for TaskSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn tasks_run_to_completion() {
        let tasks = TaskSet::new();
        let done = Arc::new(AtomicBool::new(false));

        let flag = done.clone();
        tasks.spawn(move |_token| async move {
            flag.store(true, Ordering::SeqCst);
        });

        tasks.shutdown().await;
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn shutdown_cancels_pending_sleeps() {
        let tasks = TaskSet::new();
        let fired = Arc::new(AtomicBool::new(false));

        let flag = fired.clone();
        tasks.spawn(move |token| async move {
            if TaskSet::sleep(&token, Duration::from_secs(3600)).await {
                flag.store(true, Ordering::SeqCst);
            }
        });

        // Give the task a chance to reach its sleep.
        tokio::time::sleep(Duration::from_millis(10)).await;
        tasks.shutdown().await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
