//! Shared builders for integration tests.

#![allow(dead_code)]

pub mod test_metrics;

use panelhook::app::App;
use panelhook::config::{Config, DeliveryConfig};
use panelhook::notification::test_utils::ScriptedTransport;
use panelhook::notification::{DisabledPanelPolicy, Dispatcher, Notifier};
use panelhook::store::test_utils::MemoryStorage;
use panelhook::DispatchConfig;
use std::sync::Arc;
use std::time::Duration;

pub const FAST_BACKOFF: Duration = Duration::from_millis(1);

/// Settings with millisecond timings so retry loops finish quickly.
pub fn fast_config() -> Config {
    Config {
        delivery: DeliveryConfig {
            attempt_timeout_ms: 1_000,
            backoff_ms: 1,
            on_disabled_panel: DisabledPanelPolicy::HaltDispatch,
        },
        ..Default::default()
    }
}

pub fn dispatcher(transport: &Arc<ScriptedTransport>) -> Dispatcher {
    Dispatcher::new(Notifier::new(transport.clone()).with_backoff(FAST_BACKOFF))
}

/// Builds an app over in-memory storage seeded with `initial`.
pub async fn app_with(
    initial: DispatchConfig,
    transport: Arc<ScriptedTransport>,
) -> (App, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::with_config(initial));
    let app = App::build(&fast_config(), storage.clone(), transport)
        .await
        .expect("app should build");
    (app, storage)
}

/// Polls `condition` until it holds or `timeout` passes.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
