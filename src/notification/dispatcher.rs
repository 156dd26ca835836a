//! Drives delivery across every configured panel for one inbound event.

use crate::core::{DeliveryOutcome, MailEvent};
use crate::notification::notifier::Notifier;
use crate::panel::DispatchConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// What to do when the walk reaches a disabled panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum DisabledPanelPolicy {
    /// Stop the whole dispatch; no later panel is attempted.
    #[default]
    #[serde(rename = "halt")]
    HaltDispatch,
    /// Move on to the next panel.
    #[serde(rename = "skip")]
    Skip,
}

/// Why a dispatch ended before the end of the panel list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Halt {
    /// A disabled panel was reached under [`DisabledPanelPolicy::HaltDispatch`].
    DisabledPanel { index: usize },
    /// Shutdown interrupted delivery to the panel at `index`.
    Shutdown { index: usize },
}

/// The outcome of delivering to one panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelDelivery {
    pub index: usize,
    pub address: String,
    pub outcome: DeliveryOutcome,
}

/// Everything that happened during one dispatch. Used for logging and tests;
/// the event source never sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub deliveries: Vec<PanelDelivery>,
    pub skipped: Vec<usize>,
    pub halted: Option<Halt>,
}

impl DispatchReport {
    pub fn attempted_addresses(&self) -> Vec<&str> {
        self.deliveries.iter().map(|d| d.address.as_str()).collect()
    }

    pub fn count(&self, outcome: DeliveryOutcome) -> usize {
        self.deliveries
            .iter()
            .filter(|d| d.outcome == outcome)
            .count()
    }
}

/// Walks the panel list in order, handing each enabled panel to the
/// [`Notifier`].
#[derive(Clone)]
pub struct Dispatcher {
    notifier: Notifier,
    on_disabled_panel: DisabledPanelPolicy,
}

impl Dispatcher {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            notifier,
            on_disabled_panel: DisabledPanelPolicy::default(),
        }
    }

    pub fn with_disabled_panel_policy(mut self, policy: DisabledPanelPolicy) -> Self {
        self.on_disabled_panel = policy;
        self
    }

    /// Delivers `event` to the panels of `config`.
    ///
    /// Panels are handled strictly one after another in list order. A
    /// panel that gives up does not stop the walk; a disabled panel does,
    /// unless the policy is [`DisabledPanelPolicy::Skip`].
    #[instrument(skip_all, fields(event = %event))]
    pub async fn dispatch(&self, config: &DispatchConfig, event: &MailEvent) -> DispatchReport {
        let mut report = DispatchReport::default();

        for (index, panel) in config.panels.iter().enumerate() {
            if !panel.enabled {
                match self.on_disabled_panel {
                    DisabledPanelPolicy::HaltDispatch => {
                        debug!(index, address = %panel.address, "Disabled panel reached, halting dispatch");
                        report.halted = Some(Halt::DisabledPanel { index });
                        break;
                    }
                    DisabledPanelPolicy::Skip => {
                        debug!(index, address = %panel.address, "Skipping disabled panel");
                        report.skipped.push(index);
                        continue;
                    }
                }
            }

            let outcome = self.notifier.notify(panel, config.allow_retry).await;
            report.deliveries.push(PanelDelivery {
                index,
                address: panel.address.clone(),
                outcome,
            });

            if outcome == DeliveryOutcome::Cancelled {
                warn!(index, "Dispatch interrupted by shutdown");
                report.halted = Some(Halt::Shutdown { index });
                break;
            }
        }

        info!(
            delivered = report.count(DeliveryOutcome::Delivered),
            gave_up = report.count(DeliveryOutcome::GaveUp),
            halted = ?report.halted,
            "Dispatch finished"
        );
        report
    }
}
