//! A metrics recorder that keeps counters in memory and periodically logs them.

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info};

type CounterMap = BTreeMap<String, Arc<AtomicU64>>;

/// Counts every registered counter and logs the totals on a fixed interval.
///
/// Counters are keyed as `name{label=value,...}`, labels in registration
/// order. Gauges and histograms are not recorded.
#[derive(Debug, Clone, Default)]
pub struct LoggingRecorder {
    counters: Arc<Mutex<CounterMap>>,
}

impl LoggingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of the counter rendered as `key`, or 0 if it was never
    /// registered.
    pub fn counter(&self, key: &str) -> u64 {
        self.lock()
            .get(key)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// All counters with their current values, sorted by key.
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        self.lock()
            .iter()
            .map(|(key, c)| (key.clone(), c.load(Ordering::Relaxed)))
            .collect()
    }

    /// Logs a snapshot every `every` until `shutdown_rx` turns true, then
    /// logs a final one.
    pub async fn report(self, every: Duration, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = interval_at(Instant::now() + every, every);
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.wait_for(|stop| *stop) => break,
                _ = ticker.tick() => self.log_snapshot(),
            }
        }
        self.log_snapshot();
        debug!("Metrics reporter stopped");
    }

    fn log_snapshot(&self) {
        for (key, value) in self.snapshot() {
            info!("[Counter] {}: {}", key, value);
        }
    }

    fn lock(&self) -> MutexGuard<'_, CounterMap> {
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Renders `key` as `name{label=value,...}`, or just `name` without labels.
pub fn render_key(key: &Key) -> String {
    let labels: Vec<String> = key
        .labels()
        .map(|l| format!("{}={}", l.key(), l.value()))
        .collect();
    if labels.is_empty() {
        key.name().to_string()
    } else {
        format!("{}{{{}}}", key.name(), labels.join(","))
    }
}

impl Recorder for LoggingRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        let counter = self.lock().entry(render_key(key)).or_default().clone();
        Counter::from_arc(counter)
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_keyed_by_name_and_labels() {
        let recorder = LoggingRecorder::new();

        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("deliveries", "result" => "error").increment(2);
            metrics::counter!("deliveries", "result" => "error").increment(1);
            metrics::counter!("deliveries", "result" => "ok").increment(1);
            metrics::counter!("plain").increment(5);
        });

        assert_eq!(recorder.counter("deliveries{result=error}"), 3);
        assert_eq!(recorder.counter("deliveries{result=ok}"), 1);
        assert_eq!(recorder.counter("plain"), 5);
        assert_eq!(recorder.counter("never"), 0);
        assert_eq!(
            recorder.snapshot(),
            vec![
                ("deliveries{result=error}".to_string(), 3),
                ("deliveries{result=ok}".to_string(), 1),
                ("plain".to_string(), 5),
            ]
        );
    }

    #[tokio::test]
    async fn test_reporter_stops_on_shutdown() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(
            LoggingRecorder::new().report(Duration::from_secs(3600), shutdown_rx),
        );

        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("reporter did not stop")
            .unwrap();
    }
}
