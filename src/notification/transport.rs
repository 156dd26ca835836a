//! The HTTP transport used to signal panels.

use crate::core::Transport;
use crate::error::TransportError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default bound on a single attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends a plain GET to the panel address using a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self))]
    async fn get(&self, address: &str) -> Result<(), TransportError> {
        // Any response counts, whatever its status.
        let response = self.client.get(address).send().await?;
        debug!(status = %response.status(), "Panel responded");
        Ok(())
    }
}
