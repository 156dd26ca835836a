//! Delivery of "message stored" signals to the configured panels.
//!
//! The [`dispatcher::Dispatcher`] walks the panel list for one event and hands
//! each enabled panel to the [`notifier::Notifier`], which owns the attempt
//! and retry loop. The network call itself sits behind the
//! [`crate::core::Transport`] trait.
pub mod dispatcher;
pub mod notifier;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod transport;

pub use dispatcher::{DisabledPanelPolicy, DispatchReport, Dispatcher, Halt, PanelDelivery};
pub use notifier::Notifier;
pub use transport::HttpTransport;
