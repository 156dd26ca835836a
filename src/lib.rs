//! panelhook - webhook fan-out for stored mail
//!
//! When the mail host finishes persisting an incoming message, panelhook
//! signals every configured panel with an HTTP GET and retries failed
//! deliveries according to each panel's policy.

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod metrics;
pub mod notification;
pub mod panel;
pub mod server;
pub mod store;
pub mod task_manager;

// Re-export core types for convenience
pub use crate::core::*;
pub use error::{ConfigError, TransportError};
pub use panel::{DispatchConfig, PanelConfig, RetryBudget};
