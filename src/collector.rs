// FRM Companion - Train timing core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Train collector
//!
//! Turns one batch of train snapshots into gauge observations. The batch is
//! fetched by the caller; this type owns the per-train state and the clock,
//! and is shared for the lifetime of the process.
//!
//! Train names are only unique within one FRM server, so state is kept in a
//! separate store per source address.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::clock::Clock;
use crate::config::TimingConfig;
use crate::error::Result;
use crate::sink::{CircuitReadings, MetricsSink, SourceLabels, TrainReadings};
use crate::snapshot::TrainSnapshot;
use crate::state::{TrainState, TrainStateStore};
use crate::timing::{LapOutcome, TrainTimer};

/// Counts from one [`TrainCollector::observe`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    /// Snapshots processed
    pub trains: usize,
    /// Trains seen for the first time
    pub new_trains: usize,
    /// Segment gauges written
    pub segments: usize,
    /// Round trip gauges written
    pub round_trips: usize,
    /// Laps discarded for exceeding the ceiling
    pub rejected_laps: usize,
}

/// Derives train timing and readings from snapshot batches
pub struct TrainCollector {
    clock: Arc<dyn Clock>,
    timer: TrainTimer,
    /// One coarse lock over every source: polls are infrequent and the
    /// per-train work is tiny.
    stores: Mutex<HashMap<String, TrainStateStore>>,
}

impl TrainCollector {
    /// Create a collector with the default timing configuration
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            timer: TrainTimer::new(&TimingConfig::default()),
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Create a collector with a custom timing configuration
    pub fn with_config(clock: Arc<dyn Clock>, config: TimingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            clock,
            timer: TrainTimer::new(&config),
            stores: Mutex::new(HashMap::new()),
        })
    }

    fn stores(&self) -> MutexGuard<'_, HashMap<String, TrainStateStore>> {
        // The stores hold plain values; a panic mid-update cannot leave them
        // structurally invalid.
        self.stores.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Process one poll's worth of snapshots and publish the results.
    ///
    /// Snapshots are handled in order, so a duplicated train name within a
    /// batch ends up with the state of its last snapshot. Trains are keyed by
    /// `labels.source` and name.
    pub fn observe(
        &self,
        trains: &[TrainSnapshot],
        labels: &SourceLabels,
        sink: &dyn MetricsSink,
    ) -> CollectStats {
        let mut stats = CollectStats {
            trains: trains.len(),
            ..Default::default()
        };
        let mut circuits: BTreeMap<String, CircuitReadings> = BTreeMap::new();

        {
            let mut stores = self.stores();
            // Read under the lock so overlapping polls record arrivals in order.
            let now = self.clock.now();
            let store = stores.entry(labels.source.clone()).or_default();
            for train in trains {
                let (state, created) = store.get_or_create(&train.name);
                if created {
                    debug!("Tracking new train {} at {}", train.name, train.station);
                    stats.new_trains += 1;
                }

                let update =
                    self.timer
                        .observe(&train.name, state, &train.station, train.loop_origin(), now);

                if let Some(segment) = &update.segment {
                    sink.set_segment_trip(
                        &train.name,
                        &segment.from,
                        &segment.to,
                        labels,
                        segment.duration.as_secs_f64(),
                    );
                    stats.segments += 1;
                }
                match update.lap {
                    Some(LapOutcome::Completed(duration)) => {
                        sink.set_round_trip(&train.name, labels, duration.as_secs_f64());
                        stats.round_trips += 1;
                    }
                    Some(LapOutcome::Rejected(_)) => stats.rejected_laps += 1,
                    Some(LapOutcome::Started) | None => {}
                }

                let circuit = circuits.entry(train.circuit_id()).or_default();
                circuit.power_consumed += train.power_consumed();
                circuit.max_power_consumed += train.max_power_consumed();
            }
        }

        for train in trains {
            let readings = TrainReadings {
                derailed: train.derailed,
                power_consumed: train.power_consumed(),
                total_mass: train.total_mass(),
                payload_mass: train.payload_mass(),
                max_payload_mass: train.max_payload_mass(),
            };
            sink.set_train_readings(&train.name, labels, &readings);
        }
        for (circuit_id, readings) in &circuits {
            sink.set_circuit_readings(circuit_id, labels, readings);
        }

        stats
    }

    /// Number of distinct trains ever observed, across all sources
    pub fn tracked_trains(&self) -> usize {
        self.stores().values().map(TrainStateStore::len).sum()
    }

    /// Copy of a train's current state on one source
    pub fn train_state(&self, source: &str, name: &str) -> Option<TrainState> {
        self.stores().get(source)?.get(name).cloned()
    }

    /// Drop a train's state so it is treated as unseen on its next sighting.
    pub fn forget(&self, source: &str, name: &str) -> bool {
        self.stores()
            .get_mut(source)
            .and_then(|store| store.remove(name))
            .is_some()
    }

    /// The round trip ceiling in effect
    pub fn timing_config(&self) -> TimingConfig {
        TimingConfig::with_max_lap_duration(self.timer.lap_timer().max_lap_duration())
    }
}

impl std::fmt::Debug for TrainCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainCollector")
            .field("timer", &self.timer)
            .field("tracked_trains", &self.tracked_trains())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::CompanionError;
    use crate::sink::RecordingSink;
    use std::time::Duration;

    const LOCAL: &str = "http://localhost:8080";

    fn labels() -> SourceLabels {
        SourceLabels::new(LOCAL, "default")
    }

    #[test]
    fn test_collector_creation() {
        let collector = TrainCollector::new(Arc::new(ManualClock::new()));
        assert_eq!(collector.tracked_trains(), 0);
        assert_eq!(collector.timing_config(), TimingConfig::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = TrainCollector::with_config(
            Arc::new(ManualClock::new()),
            TimingConfig::with_max_lap_duration(Duration::ZERO),
        );
        assert!(matches!(result, Err(CompanionError::InvalidConfig(_))));
    }

    #[test]
    fn test_observe_counts() {
        let clock = ManualClock::new();
        let collector = TrainCollector::new(Arc::new(clock.clone()));
        let sink = RecordingSink::new();
        let route = ["A", "B"];

        let stats = collector.observe(
            &[TrainSnapshot::at_station("T", "A", route)],
            &labels(),
            &sink,
        );
        assert_eq!(stats.trains, 1);
        assert_eq!(stats.new_trains, 1);

        clock.advance(Duration::from_secs(10));
        collector.observe(&[TrainSnapshot::at_station("T", "B", route)], &labels(), &sink);
        clock.advance(Duration::from_secs(10));
        let stats = collector.observe(
            &[TrainSnapshot::at_station("T", "A", route)],
            &labels(),
            &sink,
        );
        assert_eq!(stats.new_trains, 0);
        assert_eq!(stats.segments, 1);
        assert_eq!(stats.round_trips, 0);
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let collector = TrainCollector::new(Arc::new(ManualClock::new()));
        let sink = RecordingSink::new();

        collector.observe(
            &[
                TrainSnapshot::at_station("T", "A", ["A"]),
                TrainSnapshot::at_station("T", "B", ["A"]),
            ],
            &labels(),
            &sink,
        );

        assert_eq!(collector.tracked_trains(), 1);
        let state = collector.train_state(LOCAL, "T").unwrap();
        assert_eq!(state.last_station(), "B");
    }

    #[test]
    fn test_forget_resets_train() {
        let collector = TrainCollector::new(Arc::new(ManualClock::new()));
        let sink = RecordingSink::new();

        collector.observe(&[TrainSnapshot::at_station("T", "A", ["A"])], &labels(), &sink);
        assert!(collector.forget(LOCAL, "T"));
        assert!(!collector.forget(LOCAL, "T"));
        assert!(collector.train_state(LOCAL, "T").is_none());
    }

    #[test]
    fn test_same_name_on_two_sources() {
        let clock = ManualClock::new();
        let collector = TrainCollector::new(Arc::new(clock.clone()));
        let sink = RecordingSink::new();
        let a = SourceLabels::new("http://a:8080", "default");
        let b = SourceLabels::new("http://b:8080", "default");

        let route = ["X", "Y"];
        for _ in 0..4 {
            let stats = collector.observe(&[TrainSnapshot::at_station("Train1", "X", route)], &a, &sink);
            assert_eq!(stats.segments, 0);
            let stats = collector.observe(&[TrainSnapshot::at_station("Train1", "Y", route)], &b, &sink);
            assert_eq!(stats.segments, 0);
            clock.advance(Duration::from_secs(15));
        }

        assert_eq!(collector.tracked_trains(), 2);
        assert_eq!(sink.timing_writes(), 0);
        assert_eq!(sink.round_trip("Train1", &a), None);
        assert_eq!(sink.segment_trip("Train1", "X", "Y", &b), None);

        let state = collector.train_state(&a.source, "Train1").unwrap();
        assert_eq!(state.last_station(), "X");
        let state = collector.train_state(&b.source, "Train1").unwrap();
        assert_eq!(state.last_station(), "Y");
        assert!(!collector.forget("http://c:8080", "Train1"));
    }
}
