//! Core domain types and service traits for panelhook
//!
//! This module defines the data passed between the host bridge, the
//! dispatcher and the notifier, along with the `Transport` seam that
//! performs the actual network call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TransportError;

/// A "message stored" notification from the mail host.
///
/// The dispatcher never looks inside it; it is carried along only so log
/// lines can be correlated with the host's event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct MailEvent {
    /// Identifier assigned by the host, if any.
    pub id: Option<String>,
    /// When the bridge received the event.
    pub received_at: Option<DateTime<Utc>>,
}

impl MailEvent {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            received_at: Some(Utc::now()),
        }
    }

    /// Stamps the receive time if the host did not supply one.
    pub fn received_now(mut self) -> Self {
        self.received_at.get_or_insert_with(Utc::now);
        self
    }
}

impl fmt::Display for MailEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}", id),
            None => write!(f, "<anonymous>"),
        }
    }
}

/// Terminal result of delivering to one panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// An attempt completed without a transport error.
    Delivered,
    /// The retry policy ran out without a successful attempt.
    GaveUp,
    /// Shutdown interrupted the retry loop.
    Cancelled,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Delivered => "delivered",
            DeliveryOutcome::GaveUp => "gave_up",
            DeliveryOutcome::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Performs a single delivery attempt against a panel address.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the signal. Any `Ok` counts as delivered, whatever the
    /// response status.
    async fn get(&self, address: &str) -> Result<(), TransportError>;
}
