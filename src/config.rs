//! Configuration management for panelhook
//!
//! This module defines the process-level `Config` struct. It is separate from
//! the panel list itself (see [`crate::panel::DispatchConfig`]), which is
//! owned by the admin UI and persisted as JSON. Settings are layered with
//! `figment`: built-in defaults, then a `panelhook.toml` file, then
//! `PANELHOOK_` environment variables, then command-line arguments.

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;
use crate::notification::DisabledPanelPolicy;

const DEFAULT_CONFIG_FILE: &str = "panelhook.toml";

/// Where the panel list lives unless overridden. This is the file the mail
/// host's webhook plugin has always used, so existing panel lists are picked
/// up as-is.
pub const DEFAULT_PANELS_FILE: &str = "./plugins/pmail_jez_webhook.json";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging filter for the application, in `EnvFilter` syntax.
    pub log_level: String,
    /// The address the host bridge listens on.
    pub listen_addr: String,
    /// Where the panel configuration JSON is stored.
    pub panels_path: PathBuf,
    /// Delivery timing and policy.
    pub delivery: DeliveryConfig,
    /// Periodic logging of the delivery counters.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Settings for the logging metrics recorder.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether to install the logging recorder at all.
    pub log_metrics: bool,
    /// How often the counters are logged, in seconds.
    pub log_aggregation_seconds: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            log_metrics: true,
            log_aggregation_seconds: 60,
        }
    }
}

/// Timing and policy applied to every delivery.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Upper bound on a single attempt, in milliseconds.
    pub attempt_timeout_ms: u64,
    /// Constant wait between attempts, in milliseconds.
    pub backoff_ms: u64,
    /// What a disabled panel does to the rest of the dispatch.
    pub on_disabled_panel: DisabledPanelPolicy,
}

impl DeliveryConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: 5_000,
            backoff_ms: 5_000,
            on_disabled_panel: DisabledPanelPolicy::HaltDispatch,
        }
    }
}

impl Config {
    /// Loads the application configuration.
    ///
    /// The TOML file named by `--config` is used if given, otherwise
    /// `panelhook.toml` in the working directory (a missing file is fine).
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_file = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            // e.g. PANELHOOK_DELIVERY__BACKOFF_MS=1000
            .merge(Env::prefixed("PANELHOOK_").split("__"))
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            listen_addr: "127.0.0.1:8089".to_string(),
            panels_path: PathBuf::from(DEFAULT_PANELS_FILE),
            delivery: DeliveryConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}
