//! Per-train state for the timing subsystem
//!
//! Manages one fixed-shape record per train name:
//! - The last observed station
//! - The instant of the last observed arrival, once one is known
//! - The instant the current lap started, once one is known
//!
//! Entries are created lazily on first sighting and are never removed by
//! the collector itself.

use std::collections::HashMap;
use std::time::Instant;

/// Result of comparing a train's current station with the last one seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationChange {
    /// First sighting; the station is recorded but nothing is known about
    /// when the train got there.
    Baseline,
    /// Same station as last poll.
    Unchanged,
    /// The train moved since the last poll.
    Transition {
        /// Station the train came from
        from: String,
    },
}

/// Mutable state tracked for a single train
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrainState {
    /// Last observed station; `None` until first sighting
    last_station: Option<String>,
    /// Instant of the last observed transition
    last_arrival: Option<Instant>,
    /// Instant the train last arrived at its loop origin
    lap_start: Option<Instant>,
}

impl TrainState {
    /// Create an unseen train state
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `current` as the train's station and report what changed.
    ///
    /// This is the only place a transition is detected; both timers act on
    /// its result.
    pub fn observe_station(&mut self, current: &str) -> StationChange {
        match self.last_station.as_deref() {
            None => {
                self.last_station = Some(current.to_string());
                StationChange::Baseline
            }
            Some(last) if last == current => StationChange::Unchanged,
            Some(_) => {
                let from = self.last_station.replace(current.to_string());
                StationChange::Transition {
                    from: from.unwrap_or_default(),
                }
            }
        }
    }

    /// Last observed station (empty until first sighting)
    pub fn last_station(&self) -> &str {
        self.last_station.as_deref().unwrap_or("")
    }

    /// Whether this train has been observed at least once
    pub fn is_seen(&self) -> bool {
        self.last_station.is_some()
    }

    /// Instant of the last observed arrival, if known
    pub fn last_arrival(&self) -> Option<Instant> {
        self.last_arrival
    }

    /// Whether the last arrival instant is known
    pub fn arrival_known(&self) -> bool {
        self.last_arrival.is_some()
    }

    /// Record an arrival, returning the previous arrival if one was known
    pub fn record_arrival(&mut self, now: Instant) -> Option<Instant> {
        self.last_arrival.replace(now)
    }

    /// Instant the current lap started, if known
    pub fn lap_start(&self) -> Option<Instant> {
        self.lap_start
    }

    /// Whether the current lap start is known
    pub fn lap_start_known(&self) -> bool {
        self.lap_start.is_some()
    }

    /// Start a new lap, returning the previous lap start if one was known
    pub fn start_lap(&mut self, now: Instant) -> Option<Instant> {
        self.lap_start.replace(now)
    }
}

/// Keyed store of train states
#[derive(Debug, Default)]
pub struct TrainStateStore {
    trains: HashMap<String, TrainState>,
}

impl TrainStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            trains: HashMap::new(),
        }
    }

    /// Get a train's state, creating an unseen entry on first access.
    ///
    /// The flag is `true` when the entry was created by this call.
    pub fn get_or_create(&mut self, name: &str) -> (&mut TrainState, bool) {
        let created = !self.trains.contains_key(name);
        let state = self.trains.entry(name.to_string()).or_default();
        (state, created)
    }

    /// Get a train's state without creating it
    pub fn get(&self, name: &str) -> Option<&TrainState> {
        self.trains.get(name)
    }

    /// Drop a train's state. Only used by external expiry policies.
    pub fn remove(&mut self, name: &str) -> Option<TrainState> {
        self.trains.remove(name)
    }

    /// Number of trains ever seen
    pub fn len(&self) -> usize {
        self.trains.len()
    }

    /// Whether no train has been seen yet
    pub fn is_empty(&self) -> bool {
        self.trains.is_empty()
    }

    /// Iterate over all tracked trains
    pub fn trains(&self) -> impl Iterator<Item = (&str, &TrainState)> {
        self.trains.iter().map(|(name, state)| (name.as_str(), state))
    }
}
