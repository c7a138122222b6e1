//! Shutdown coordination for background tasks.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

/// Coordinator for graceful shutdown.
///
/// Long-running tasks subscribe to a broadcast channel and are registered
/// with [`track`](Self::track) so [`complete`](Self::complete) can wait for
/// them to exit.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    tasks: Mutex<Vec<(String, JoinHandle<()>)>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Register a spawned task to be awaited on shutdown.
    pub fn track(&self, name: impl Into<String>, handle: JoinHandle<()>) {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.into(), handle));
    }

    /// Number of registered tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Broadcast the shutdown signal without waiting.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Trigger shutdown and wait up to `grace` for each tracked task.
    ///
    /// Tasks still running after the deadline are aborted. Returns the number
    /// of tasks that exited cleanly.
    pub async fn complete(self, grace: Duration) -> usize {
        self.trigger();
        let tasks = self.tasks.into_inner().unwrap_or_else(PoisonError::into_inner);
        let deadline = time::Instant::now() + grace;
        let mut clean = 0;

        for (name, mut handle) in tasks {
            match time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {
                    tracing::debug!(task = %name, "Background task stopped");
                    clean += 1;
                }
                Ok(Err(e)) => tracing::error!(task = %name, error = %e, "Background task failed"),
                Err(_) => {
                    tracing::warn!(task = %name, "Background task did not stop in time, aborting");
                    handle.abort();
                }
            }
        }
        clean
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
