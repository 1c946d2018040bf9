// FRM Companion - Train timing core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Segment and lap timing.
//!
//! FRM only tells us where a train is right now. Durations are derived
//! from the instants at which a *change* of station is observed:
//!
//! - **Segment trip**: time between two consecutive observed transitions.
//!   The first transition after a train is first seen never yields a value,
//!   since the instant it reached its starting station is unknown.
//! - **Round trip**: time between two consecutive transitions into the
//!   train's loop origin (first timetable entry). Laps above the configured
//!   ceiling are dropped and a new lap starts anyway.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::TimingConfig;
use crate::state::{StationChange, TrainState};

/// A completed segment between two stations.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentTrip {
    pub from: String,
    pub to: String,
    pub duration: Duration,
}

/// What happened to a train's lap on this poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LapOutcome {
    /// Arrived at the loop origin with no previous lap start.
    Started,
    /// Completed a plausible lap.
    Completed(Duration),
    /// Lap exceeded the ceiling; discarded.
    Rejected(Duration),
}

/// Everything derived from one observation of one train.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingUpdate {
    pub segment: Option<SegmentTrip>,
    pub lap: Option<LapOutcome>,
}

impl TimingUpdate {
    /// Round trip duration to publish, if any.
    pub fn round_trip(&self) -> Option<Duration> {
        match self.lap {
            Some(LapOutcome::Completed(duration)) => Some(duration),
            _ => None,
        }
    }
}

/// Derives segment trip times from station changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentTimer;

impl SegmentTimer {
    /// Apply a detected station change to the train's arrival tracking.
    pub fn on_change(
        &self,
        state: &mut TrainState,
        change: &StationChange,
        current: &str,
        now: Instant,
    ) -> Option<SegmentTrip> {
        let StationChange::Transition { from } = change else {
            return None;
        };

        let previous = state.record_arrival(now)?;
        Some(SegmentTrip {
            from: from.clone(),
            to: current.to_string(),
            duration: now.saturating_duration_since(previous),
        })
    }
}

/// Derives round trip times from arrivals at the loop origin.
#[derive(Debug, Clone)]
pub struct LapTimer {
    max_lap_duration: Duration,
}

impl LapTimer {
    pub fn new(max_lap_duration: Duration) -> Self {
        Self { max_lap_duration }
    }

    pub fn max_lap_duration(&self) -> Duration {
        self.max_lap_duration
    }

    /// Apply a detected station change to the train's lap tracking.
    ///
    /// `origin` is the first timetable entry; `None` disables lap timing.
    pub fn on_change(
        &self,
        state: &mut TrainState,
        change: &StationChange,
        current: &str,
        origin: Option<&str>,
        now: Instant,
    ) -> Option<LapOutcome> {
        let origin = origin?;
        if !matches!(change, StationChange::Transition { .. }) || current != origin {
            return None;
        }

        let outcome = match state.start_lap(now) {
            None => LapOutcome::Started,
            Some(previous) => {
                let elapsed = now.saturating_duration_since(previous);
                if elapsed <= self.max_lap_duration {
                    LapOutcome::Completed(elapsed)
                } else {
                    LapOutcome::Rejected(elapsed)
                }
            }
        };
        Some(outcome)
    }
}

impl Default for LapTimer {
    fn default() -> Self {
        Self::new(TimingConfig::default().max_lap_duration)
    }
}

/// Runs both timers over a single observation.
#[derive(Debug, Clone, Default)]
pub struct TrainTimer {
    segment: SegmentTimer,
    lap: LapTimer,
}

impl TrainTimer {
    pub fn new(config: &TimingConfig) -> Self {
        Self {
            segment: SegmentTimer,
            lap: LapTimer::new(config.max_lap_duration),
        }
    }

    pub fn lap_timer(&self) -> &LapTimer {
        &self.lap
    }

    /// Observe `current` for a train and derive whatever completed.
    pub fn observe(
        &self,
        train: &str,
        state: &mut TrainState,
        current: &str,
        origin: Option<&str>,
        now: Instant,
    ) -> TimingUpdate {
        let change = state.observe_station(current);
        if change == StationChange::Unchanged {
            return TimingUpdate::default();
        }

        let segment = self.segment.on_change(state, &change, current, now);
        let lap = self.lap.on_change(state, &change, current, origin, now);

        if let Some(LapOutcome::Rejected(elapsed)) = lap {
            debug!(
                "Discarding {}s round trip for {} (ceiling {}s)",
                elapsed.as_secs(),
                train,
                self.lap.max_lap_duration.as_secs()
            );
        }

        TimingUpdate { segment, lap }
    }
}
