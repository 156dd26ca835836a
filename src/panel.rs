//! Panel policy and dispatch configuration types.
//!
//! These are the typed forms of the persisted panel configuration. Field
//! names on the wire are hyphenated (`max-retries`, `allow-retry`) to stay
//! compatible with files written by the admin UI.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A single webhook delivery target and its retry policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct PanelConfig {
    /// The URL that receives the GET signal.
    pub address: String,
    /// Additional attempts allowed after the first failure.
    #[serde(rename = "max-retries")]
    pub max_retries: u32,
    /// When set, retries never run out regardless of `max_retries`.
    #[serde(rename = "infinite-retry")]
    pub infinite_retry: bool,
    /// Disabled panels never receive a delivery attempt.
    pub enabled: bool,
}

impl PanelConfig {
    /// Creates an enabled panel with no retries.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            enabled: true,
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_infinite_retry(mut self, infinite_retry: bool) -> Self {
        self.infinite_retry = infinite_retry;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns a fresh retry budget for one delivery sequence.
    pub fn retry_budget(&self) -> RetryBudget {
        RetryBudget {
            remaining: self.max_retries,
            infinite: self.infinite_retry,
        }
    }

    /// Checks that an enabled panel points at an absolute http(s) URL.
    ///
    /// Disabled panels are not checked so half-filled entries can be kept
    /// switched off.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.address.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "enabled panel has an empty address".to_string(),
            ));
        }
        let url = Url::parse(&self.address).map_err(|e| {
            ConfigError::Invalid(format!("invalid address '{}': {}", self.address, e))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ConfigError::Invalid(format!(
                "unsupported scheme '{}' in address '{}'",
                other, self.address
            ))),
        }
    }
}

/// The full set of panels plus the global retry switch.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct DispatchConfig {
    /// Panels in dispatch order.
    pub panels: Vec<PanelConfig>,
    /// When false, no panel is ever retried.
    #[serde(rename = "allow-retry")]
    pub allow_retry: bool,
}

impl DispatchConfig {
    pub fn new(panels: Vec<PanelConfig>, allow_retry: bool) -> Self {
        Self {
            panels,
            allow_retry,
        }
    }

    /// Parses an administrative update payload.
    pub fn from_json(payload: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(payload).map_err(ConfigError::Parse)
    }

    /// Validates every panel, reporting the index of the first bad one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, panel) in self.panels.iter().enumerate() {
            panel.validate().map_err(|e| match e {
                ConfigError::Invalid(reason) => {
                    ConfigError::Invalid(format!("panel {}: {}", index, reason))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    pub fn enabled_count(&self) -> usize {
        self.panels.iter().filter(|p| p.enabled).count()
    }
}

/// The private, per-delivery retry counter.
///
/// Each delivery sequence works on its own copy so concurrent or later
/// events never observe a decremented count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    remaining: u32,
    infinite: bool,
}

impl RetryBudget {
    /// Consumes one retry. Returns false once the budget is exhausted.
    pub fn try_consume(&mut self) -> bool {
        if self.infinite {
            return true;
        }
        match self.remaining.checked_sub(1) {
            Some(left) => {
                self.remaining = left;
                true
            }
            None => false,
        }
    }

    pub fn remaining(&self) -> Option<u32> {
        (!self.infinite).then_some(self.remaining)
    }
}
