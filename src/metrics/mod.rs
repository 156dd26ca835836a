//! Metrics recording for delivery counters.
//!
//! The notifier emits counters through the `metrics` facade; installing a
//! recorder decides where they go.

pub mod logging_recorder;

pub use logging_recorder::LoggingRecorder;
