//! In-memory `ConfigStorage` for tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::ConfigStorage;
use crate::error::ConfigError;
use crate::panel::DispatchConfig;

#[derive(Debug, Default)]
pub struct MemoryStorage {
    initial: DispatchConfig,
    saved: Mutex<Vec<DispatchConfig>>,
    fail_saves: AtomicBool,
}

impl MemoryStorage {
    pub fn with_config(initial: DispatchConfig) -> Self {
        Self {
            initial,
            ..Default::default()
        }
    }

    /// Makes every following `save` fail with a persist error.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Returns every configuration successfully saved so far.
    pub fn saved(&self) -> Vec<DispatchConfig> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfigStorage for MemoryStorage {
    async fn load(&self) -> Result<DispatchConfig, ConfigError> {
        Ok(self
            .saved
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_else(|| self.initial.clone()))
    }

    async fn save(&self, config: &DispatchConfig) -> Result<(), ConfigError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ConfigError::Persist {
                path: PathBuf::from("memory"),
                source: std::io::Error::new(std::io::ErrorKind::Other, "storage unavailable"),
            });
        }
        self.saved.lock().unwrap().push(config.clone());
        Ok(())
    }
}
