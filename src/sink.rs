//! Metrics sink abstraction
//!
//! The collector hands every derived value to a [`MetricsSink`]. The
//! exporter implements it on top of Prometheus gauge families; tests use
//! [`RecordingSink`], which behaves like a gauge registry: values persist
//! until overwritten and are never cleared between polls.

use std::collections::HashMap;
use std::sync::Mutex;

/// Labels identifying which FRM instance and session a value came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLabels {
    /// FRM base address the snapshot was fetched from
    pub source: String,
    /// Save session name
    pub session: String,
}

impl SourceLabels {
    pub fn new(source: impl Into<String>, session: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            session: session.into(),
        }
    }
}

/// Instantaneous per-train values that need no temporal derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrainReadings {
    pub derailed: bool,
    pub power_consumed: f64,
    pub total_mass: f64,
    pub payload_mass: f64,
    pub max_payload_mass: f64,
}

/// Power drawn by all trains on one circuit.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CircuitReadings {
    pub power_consumed: f64,
    pub max_power_consumed: f64,
}

/// Receiver of gauge observations.
pub trait MetricsSink: Send + Sync {
    /// Last completed trip between two consecutive stations.
    fn set_segment_trip(
        &self,
        train: &str,
        from: &str,
        to: &str,
        labels: &SourceLabels,
        seconds: f64,
    );

    /// Last accepted full loop.
    fn set_round_trip(&self, train: &str, labels: &SourceLabels, seconds: f64);

    /// Current readings for a train.
    fn set_train_readings(&self, train: &str, labels: &SourceLabels, readings: &TrainReadings);

    /// Aggregated train power for a circuit.
    fn set_circuit_readings(
        &self,
        circuit_id: &str,
        labels: &SourceLabels,
        readings: &CircuitReadings,
    );
}

/// Key of a segment gauge: (train, from, to, labels).
pub type SegmentKey = (String, String, String, SourceLabels);

#[derive(Debug, Default)]
struct Recorded {
    segments: HashMap<SegmentKey, f64>,
    round_trips: HashMap<(String, SourceLabels), f64>,
    trains: HashMap<(String, SourceLabels), TrainReadings>,
    circuits: HashMap<(String, SourceLabels), CircuitReadings>,
    writes: usize,
}

/// In-memory sink keeping the last value written for each label set.
#[derive(Debug, Default)]
pub struct RecordingSink {
    inner: Mutex<Recorded>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Recorded) -> R) -> R {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut inner)
    }

    /// Segment gauge value, `None` if never set.
    pub fn segment_trip(&self, train: &str, from: &str, to: &str, labels: &SourceLabels) -> Option<f64> {
        let key = (
            train.to_string(),
            from.to_string(),
            to.to_string(),
            labels.clone(),
        );
        self.with(|r| r.segments.get(&key).copied())
    }

    /// Round trip gauge value, `None` if never set.
    pub fn round_trip(&self, train: &str, labels: &SourceLabels) -> Option<f64> {
        let key = (train.to_string(), labels.clone());
        self.with(|r| r.round_trips.get(&key).copied())
    }

    pub fn train_readings(&self, train: &str, labels: &SourceLabels) -> Option<TrainReadings> {
        let key = (train.to_string(), labels.clone());
        self.with(|r| r.trains.get(&key).copied())
    }

    pub fn circuit_readings(&self, circuit_id: &str, labels: &SourceLabels) -> Option<CircuitReadings> {
        let key = (circuit_id.to_string(), labels.clone());
        self.with(|r| r.circuits.get(&key).copied())
    }

    /// Number of segment label sets ever written.
    pub fn segment_count(&self) -> usize {
        self.with(|r| r.segments.len())
    }

    /// Total number of timing gauge writes (segments and round trips).
    pub fn timing_writes(&self) -> usize {
        self.with(|r| r.writes)
    }
}

impl MetricsSink for RecordingSink {
    fn set_segment_trip(
        &self,
        train: &str,
        from: &str,
        to: &str,
        labels: &SourceLabels,
        seconds: f64,
    ) {
        let key = (
            train.to_string(),
            from.to_string(),
            to.to_string(),
            labels.clone(),
        );
        self.with(|r| {
            r.segments.insert(key, seconds);
            r.writes += 1;
        });
    }

    fn set_round_trip(&self, train: &str, labels: &SourceLabels, seconds: f64) {
        let key = (train.to_string(), labels.clone());
        self.with(|r| {
            r.round_trips.insert(key, seconds);
            r.writes += 1;
        });
    }

    fn set_train_readings(&self, train: &str, labels: &SourceLabels, readings: &TrainReadings) {
        let key = (train.to_string(), labels.clone());
        self.with(|r| {
            r.trains.insert(key, *readings);
        });
    }

    fn set_circuit_readings(
        &self,
        circuit_id: &str,
        labels: &SourceLabels,
        readings: &CircuitReadings,
    ) {
        let key = (circuit_id.to_string(), labels.clone());
        self.with(|r| {
            r.circuits.insert(key, *readings);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_overwrites() {
        let sink = RecordingSink::new();
        let labels = SourceLabels::new("http://frm", "default");

        assert_eq!(sink.segment_trip("T", "A", "B", &labels), None);
        sink.set_segment_trip("T", "A", "B", &labels, 30.0);
        sink.set_segment_trip("T", "A", "B", &labels, 45.0);

        assert_eq!(sink.segment_trip("T", "A", "B", &labels), Some(45.0));
        assert_eq!(sink.segment_count(), 1);
        assert_eq!(sink.timing_writes(), 2);
    }

    #[test]
    fn test_recording_sink_separates_sources() {
        let sink = RecordingSink::new();
        let a = SourceLabels::new("http://a", "default");
        let b = SourceLabels::new("http://b", "default");

        sink.set_round_trip("T", &a, 90.0);
        assert_eq!(sink.round_trip("T", &a), Some(90.0));
        assert_eq!(sink.round_trip("T", &b), None);
    }
}
