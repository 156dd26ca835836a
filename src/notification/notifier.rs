//! Delivery to a single panel, with its retry loop.

use crate::core::{DeliveryOutcome, Transport};
use crate::panel::PanelConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{error, info, instrument, warn};

/// Default constant wait between two attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

/// Delivers a signal to one panel, retrying according to its policy.
///
/// A `Notifier` holds no per-delivery state; every call to [`Notifier::notify`]
/// works on its own copy of the panel's retry budget, so one instance can be
/// shared across concurrent dispatches.
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn Transport>,
    backoff: Duration,
    shutdown_rx: watch::Receiver<bool>,
}

impl Notifier {
    /// Creates a notifier with the default backoff and no shutdown signal.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        // With the sender gone, `changed()` errors at once and the backoff
        // wait falls through to the plain timer.
        let (_tx, shutdown_rx) = watch::channel(false);
        Self {
            transport,
            backoff: DEFAULT_BACKOFF,
            shutdown_rx,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Lets a `true` on `shutdown_rx` interrupt pending backoff waits.
    pub fn with_shutdown(mut self, shutdown_rx: watch::Receiver<bool>) -> Self {
        self.shutdown_rx = shutdown_rx;
        self
    }

    /// Attempts delivery to `panel` until it succeeds or the policy gives up.
    ///
    /// With `allow_retry` false exactly one attempt is made. Otherwise failed
    /// attempts are retried after a constant backoff until the panel's retry
    /// budget is exhausted, forever if `infinite_retry` is set. Transport
    /// errors never escape; they are logged and fed back into the loop.
    #[instrument(skip_all, fields(address = %panel.address))]
    pub async fn notify(&self, panel: &PanelConfig, allow_retry: bool) -> DeliveryOutcome {
        let address = panel.address.as_str();
        let mut budget = panel.retry_budget();
        let mut shutdown_rx = self.shutdown_rx.clone();
        let mut attempt: u64 = 0;

        let outcome = loop {
            attempt += 1;
            match self.transport.get(address).await {
                Ok(()) => {
                    metrics::counter!("panelhook_delivery_attempts_total", "result" => "ok")
                        .increment(1);
                    info!(attempt, "Success to Connect: {}", address);
                    break DeliveryOutcome::Delivered;
                }
                Err(e) => {
                    metrics::counter!("panelhook_delivery_attempts_total", "result" => "error")
                        .increment(1);
                    warn!(attempt, "{} : {}", address, e);
                }
            }

            if !allow_retry || !budget.try_consume() {
                error!(attempts = attempt, "Fail to Connect: {}", address);
                break DeliveryOutcome::GaveUp;
            }

            if !self.wait_backoff(&mut shutdown_rx).await {
                warn!(attempts = attempt, "Retries to {} cancelled by shutdown", address);
                break DeliveryOutcome::Cancelled;
            }
        };

        metrics::counter!("panelhook_delivery_outcomes_total", "outcome" => outcome.as_str())
            .increment(1);
        outcome
    }

    /// Sleeps for the backoff interval. Returns false if shutdown was
    /// signalled before or during the wait.
    async fn wait_backoff(&self, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
        let deadline = Instant::now() + self.backoff;
        loop {
            if *shutdown_rx.borrow_and_update() {
                return false;
            }
            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        // Nobody can signal shutdown any more.
                        sleep_until(deadline).await;
                        return true;
                    }
                }
                _ = sleep_until(deadline) => return true,
            }
        }
    }
}
