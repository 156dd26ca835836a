//! The main application logic, decoupled from the entry point.

use crate::{
    config::Config,
    core::{MailEvent, Transport},
    notification::{Dispatcher, HttpTransport, Notifier},
    server::HostBridge,
    store::{ConfigStorage, ConfigStore, JsonFileStorage},
    task_manager::TaskManager,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, instrument, warn};

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConfigStore>,
    pub dispatcher: Dispatcher,
    pub tasks: TaskManager,
}

impl AppState {
    /// Spawns a dispatch of `event` over the configuration current right now.
    ///
    /// The snapshot is taken before spawning, so an update arriving while the
    /// dispatch runs does not affect it.
    #[instrument(skip_all, fields(event = %event))]
    pub fn message_stored(&self, event: MailEvent) {
        let snapshot = self.store.snapshot();
        debug!(panels = snapshot.panels.len(), "Dispatching stored message");
        let dispatcher = self.dispatcher.clone();
        let spawned = self.tasks.spawn("dispatch", async move {
            dispatcher.dispatch(&snapshot, &event).await;
        });
        if !spawned {
            warn!("Message stored during shutdown, no dispatch started");
        }
    }
}

/// A handle to the running application.
pub struct App {
    state: AppState,
}

impl App {
    /// Builds the application from settings, loading the panel configuration
    /// from disk. An unreadable panel file is a startup error.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let storage: Arc<dyn ConfigStorage> = Arc::new(JsonFileStorage::new(&config.panels_path));
        let transport: Arc<dyn Transport> = Arc::new(
            HttpTransport::new(config.delivery.attempt_timeout())
                .context("failed to build HTTP client")?,
        );
        Self::build(config, storage, transport).await
    }

    /// Builds the application around explicit storage and transport.
    pub async fn build(
        config: &Config,
        storage: Arc<dyn ConfigStorage>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let store = ConfigStore::open(storage)
            .await
            .with_context(|| format!("failed to load {}", config.panels_path.display()))?;

        let tasks = TaskManager::new();
        let notifier = Notifier::new(transport)
            .with_backoff(config.delivery.backoff())
            .with_shutdown(tasks.get_shutdown_rx());
        let dispatcher = Dispatcher::new(notifier)
            .with_disabled_panel_policy(config.delivery.on_disabled_panel);

        Ok(Self {
            state: AppState {
                store: Arc::new(store),
                dispatcher,
                tasks,
            },
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serves the host bridge on `listener` until `shutdown` resolves, then
    /// stops outstanding dispatches and waits for them.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let tasks = self.state.tasks.clone();
        let bridge = HostBridge::new(listener, self.state.clone(), tasks.get_shutdown_rx());
        let bridge_task = tokio::spawn(bridge.run());

        shutdown.await;
        info!("Shutdown signal received. Shutting down gracefully...");

        // Stop accepting host events first; anything the bridge still hands
        // over after this point is refused by the task manager.
        tasks.trigger_shutdown();
        bridge_task.await.context("host bridge task panicked")?;
        tasks.shutdown().await;

        info!("All tasks shut down. Exiting.");
        Ok(())
    }
}
