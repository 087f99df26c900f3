//! Counting of detached background tasks.
//!
//! Chain firings and timed output loops run detached from their caller. The
//! [`TaskGroup`] counts them so shutdown can wait, bounded, for the tail end
//! of the work instead of tearing the runtime down underneath it.

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

/// Shared counter over a set of spawned tasks.
///
/// Cloning is cheap; every clone counts into the same group.
#[derive(Clone, Default)]
pub struct TaskGroup {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    active: AtomicUsize,
    idle: Notify,
}

impl TaskGroup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks currently counted.
    #[must_use]
    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Spawn a future onto the runtime, counted until it completes.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = self.guard();
        tokio::spawn(async move {
            future.await;
            drop(guard);
        });
    }

    /// Count a unit of work for the lifetime of the returned guard.
    ///
    /// Used for inline work that should still hold off a [`drain`] without
    /// being spawned, like awaited chain runs.
    ///
    /// [`drain`]: TaskGroup::drain
    #[must_use]
    pub fn guard(&self) -> TaskGuard {
        self.inner.active.fetch_add(1, Ordering::SeqCst);
        TaskGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Wait until every counted task has completed, up to `timeout`.
    ///
    /// Returns `true` when the group drained in time, `false` when tasks
    /// were still running at the deadline.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let mut idle = pin!(self.inner.idle.notified());
            // Register before checking, so a completion between the check
            // and the await still wakes us.
            idle.as_mut().enable();
            if self.active() == 0 {
                return true;
            }
            if tokio::time::timeout_at(deadline, idle).await.is_err() {
                return self.active() == 0;
            }
        }
    }
}

/// Keeps one unit of work counted until dropped.
pub struct TaskGuard {
    inner: Arc<Inner>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if self.inner.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}
