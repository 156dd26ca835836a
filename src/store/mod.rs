//! Process-wide dispatch configuration.
//!
//! The active `DispatchConfig` lives behind an `ArcSwap`. Readers take a
//! snapshot (`Arc<DispatchConfig>`) that stays valid for as long as they hold
//! it; an administrative update installs a new `Arc` rather than mutating the
//! old one, so in-flight dispatches keep the view they started with.

pub mod file;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use crate::error::ConfigError;
use crate::panel::DispatchConfig;

pub use file::JsonFileStorage;

/// Durable storage for the dispatch configuration.
#[async_trait]
pub trait ConfigStorage: Send + Sync {
    /// Loads the stored configuration. A missing store yields the default.
    async fn load(&self) -> Result<DispatchConfig, ConfigError>;

    /// Replaces the stored configuration.
    async fn save(&self, config: &DispatchConfig) -> Result<(), ConfigError>;
}

/// Holds the current configuration snapshot and applies updates to it.
pub struct ConfigStore {
    current: ArcSwap<DispatchConfig>,
    storage: Arc<dyn ConfigStorage>,
}

impl ConfigStore {
    /// Loads the configuration from `storage`.
    ///
    /// Only a load error is returned, and it is meant to abort startup. A
    /// stored panel that would fail validation is reported and kept; its
    /// attempts simply fail at dispatch time.
    pub async fn open(storage: Arc<dyn ConfigStorage>) -> Result<Self, ConfigError> {
        let config = storage.load().await?;
        for (index, panel) in config.panels.iter().enumerate() {
            if let Err(e) = panel.validate() {
                warn!(index, address = %panel.address, "Stored panel is not dispatchable: {}", e);
            }
        }
        info!(
            panels = config.panels.len(),
            enabled = config.enabled_count(),
            allow_retry = config.allow_retry,
            "Loaded dispatch configuration"
        );
        Ok(Self::with_config(config, storage))
    }

    /// Creates a store around an already-loaded configuration.
    pub fn with_config(config: DispatchConfig, storage: Arc<dyn ConfigStorage>) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
            storage,
        }
    }

    /// Returns the current configuration snapshot.
    pub fn snapshot(&self) -> Arc<DispatchConfig> {
        self.current.load_full()
    }

    /// Applies a full replacement payload from the admin UI.
    ///
    /// The payload is parsed, validated and persisted before the in-memory
    /// snapshot is swapped; on any failure the active configuration is left
    /// untouched.
    #[instrument(skip_all)]
    pub async fn apply_update(&self, payload: &str) -> Result<Arc<DispatchConfig>, ConfigError> {
        let result = self.try_apply(payload).await;
        if let Err(e) = &result {
            error!("{}", e);
        }
        result
    }

    async fn try_apply(&self, payload: &str) -> Result<Arc<DispatchConfig>, ConfigError> {
        let config = DispatchConfig::from_json(payload)?;
        config.validate()?;
        self.storage.save(&config).await?;

        let config = Arc::new(config);
        let previous = self.current.swap(config.clone());
        info!(
            panels = config.panels.len(),
            previous_panels = previous.panels.len(),
            allow_retry = config.allow_retry,
            "Dispatch configuration replaced"
        );
        Ok(config)
    }
}
