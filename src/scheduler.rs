//! Owner of spawned event handlers and delayed follow-up sends.
//!
//! Shutdown semantics: in-flight tasks are drained, delayed follow-ups that
//! have not reached their deadline are dropped.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

#[derive(Clone)]
pub struct Scheduler {
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Runs a task immediately, tracked until completion.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(task);
    }

    /// Runs a task after `delay`, unless shutdown cancels it first.
    pub fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        self.tracker.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => task.await,
            }
        });
    }

    /// Cancels pending delayed tasks and waits for in-flight ones.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Waits for everything, including delayed tasks, to run to completion.
    pub async fn settle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}
