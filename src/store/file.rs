//! JSON file persistence for the dispatch configuration.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use super::ConfigStorage;
use crate::error::ConfigError;
use crate::panel::DispatchConfig;

/// Stores the configuration as a single JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persist_error(&self, source: std::io::Error) -> ConfigError {
        ConfigError::Persist {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl ConfigStorage for JsonFileStorage {
    async fn load(&self) -> Result<DispatchConfig, ConfigError> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No panel configuration found, using defaults");
                return Ok(DispatchConfig::default());
            }
            Err(e) => {
                return Err(ConfigError::Load {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })
            }
        };

        serde_json::from_slice(&data).map_err(|e| ConfigError::Load {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    async fn save(&self, config: &DispatchConfig) -> Result<(), ConfigError> {
        let body = serde_json::to_vec_pretty(config)
            .map_err(|e| self.persist_error(std::io::Error::new(ErrorKind::InvalidData, e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.persist_error(e))?;
        }

        // Write aside and rename so a reader never sees a partial file.
        let temp = self.temp_path();
        fs::write(&temp, &body)
            .await
            .map_err(|e| self.persist_error(e))?;
        fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.persist_error(e))?;

        debug!(path = %self.path.display(), bytes = body.len(), "Saved panel configuration");
        Ok(())
    }
}
