//! Tracks spawned tasks and coordinates graceful shutdown.
use futures::future::join_all;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A centralized manager for spawned tasks.
///
/// Dispatches are spawned here one per inbound event, so handles of tasks
/// that have already finished are pruned on every spawn to keep the list
/// bounded by the number of in-flight tasks.
#[derive(Clone, Debug)]
pub struct TaskManager {
    handles: Arc<Mutex<Vec<(&'static str, JoinHandle<()>)>>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TaskManager {
    /// Creates a new `TaskManager` with its own shutdown channel.
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            handles: Arc::new(Mutex::new(Vec::new())),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    /// Spawns a new task and adds its handle to the manager.
    ///
    /// Once shutdown has been signalled the future is dropped without being
    /// spawned and `false` is returned, so nothing can start after the
    /// handle list has been drained.
    pub fn spawn<F>(&self, name: &'static str, future: F) -> bool
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        // Checked under the lock so `shutdown` either drains this handle or
        // the flag is already visible here.
        let mut handles = self.lock_handles();
        if *self.shutdown_rx.borrow() {
            warn!(task_name = name, "Shutdown in progress, task not started");
            return false;
        }
        debug!(task_name = name, "Spawning task");
        handles.retain(|(_, h)| !h.is_finished());
        handles.push((name, tokio::spawn(future)));
        true
    }

    /// Returns a clone of the shutdown receiver.
    pub fn get_shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Number of tasks that have not finished yet.
    pub fn active(&self) -> usize {
        self.lock_handles()
            .iter()
            .filter(|(_, h)| !h.is_finished())
            .count()
    }

    /// Signals every task holding a shutdown receiver to stop.
    pub fn trigger_shutdown(&self) {
        // send_replace never fails, even with no receivers left.
        self.shutdown_tx.send_replace(true);
    }

    /// Signals shutdown and waits for all managed tasks to complete.
    pub async fn shutdown(self) {
        let handles = {
            let mut handles = self.lock_handles();
            self.trigger_shutdown();
            handles.drain(..).collect::<Vec<_>>()
        };
        info!(
            "TaskManager shutting down. Waiting for {} tasks to complete...",
            handles.len()
        );

        let task_names: Vec<&'static str> = handles.iter().map(|(name, _)| *name).collect();
        let results = join_all(handles.into_iter().map(|(_, handle)| handle)).await;

        let mut panics = 0;
        for (task_name, result) in task_names.into_iter().zip(results) {
            match result {
                Ok(()) => debug!(task_name, "Task shut down gracefully."),
                Err(e) => {
                    error!(task_name, error = %e, "Task panicked during shutdown.");
                    panics += 1;
                }
            }
        }

        if panics > 0 {
            error!("{} tasks panicked during shutdown", panics);
        } else {
            info!("All tasks shut down gracefully.");
        }
    }

    fn lock_handles(&self) -> std::sync::MutexGuard<'_, Vec<(&'static str, JoinHandle<()>)>> {
        // A poisoned lock only means a panic happened while pushing a handle;
        // the list itself is still usable.
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_finished_tasks_are_pruned() {
        let manager = TaskManager::new();
        manager.spawn("quick", async {});
        tokio::time::sleep(Duration::from_millis(20)).await;
        manager.spawn("quick", async {});

        assert!(manager.lock_handles().len() <= 1);
    }

    #[tokio::test]
    async fn test_shutdown_signals_and_awaits_tasks() {
        let manager = TaskManager::new();
        let mut shutdown_rx = manager.get_shutdown_rx();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();

        manager.spawn("waiter", async move {
            let _ = shutdown_rx.wait_for(|stop| *stop).await;
            let _ = done_tx.send(());
        });

        tokio::time::timeout(Duration::from_secs(5), manager.shutdown())
            .await
            .expect("shutdown hung");
        assert!(done_rx.await.is_ok());
    }

    #[tokio::test]
    async fn test_spawn_after_shutdown_is_refused() {
        let manager = TaskManager::new();
        manager.trigger_shutdown();
        let (ran_tx, mut ran_rx) = tokio::sync::oneshot::channel::<()>();

        let spawned = manager.spawn("late", async move {
            let _ = ran_tx.send(());
        });

        assert!(!spawned);
        assert_eq!(manager.active(), 0);
        // The future was dropped unpolled, so its sender is gone.
        assert!(ran_rx.try_recv().is_err());
        assert!(manager.lock_handles().is_empty());
    }

    #[tokio::test]
    async fn test_spawn_before_shutdown_is_awaited() {
        let manager = TaskManager::new();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();

        assert!(manager.spawn("work", async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            let _ = done_tx.send(());
        }));
        manager.clone().shutdown().await;

        assert!(done_rx.await.is_ok());
        assert!(!manager.spawn("late", async {}));
    }
}
