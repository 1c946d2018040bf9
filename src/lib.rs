//! # FRM Companion - train timing for FICSIT Remote Monitoring
//!
//! FRM exposes where every train is *right now*, nothing more. This crate
//! turns a stream of those snapshots into trip durations:
//!
//! - **Segment trip**: time between two consecutive station changes
//! - **Round trip**: time between two arrivals at the first timetable stop
//!
//! plus the instantaneous train readings (power, mass, derailment) the
//! exporter publishes alongside them.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use frm_companion::{ManualClock, RecordingSink, SourceLabels, TrainCollector, TrainSnapshot};
//!
//! let clock = ManualClock::new();
//! let collector = TrainCollector::new(Arc::new(clock.clone()));
//! let sink = RecordingSink::new();
//! let labels = SourceLabels::new("http://localhost:8080", "default");
//! let route = ["A", "B", "C"];
//!
//! for station in ["A", "B", "C"] {
//!     collector.observe(&[TrainSnapshot::at_station("Train1", station, route)], &labels, &sink);
//!     clock.advance(Duration::from_secs(30));
//! }
//!
//! // A -> B only established the arrival at B; B -> C is the first full segment.
//! assert_eq!(sink.segment_trip("Train1", "A", "B", &labels), None);
//! assert_eq!(sink.segment_trip("Train1", "B", "C", &labels), Some(30.0));
//! ```
//!
//! ## Modules
//!
//! - [`clock`]: injectable time source
//! - [`snapshot`]: FRM train snapshot model
//! - [`state`]: per-train state and transition detection
//! - [`timing`]: segment and lap timers
//! - [`sink`]: metrics sink abstraction
//! - [`collector`]: batch processing over a shared state store
//! - [`config`]: timing configuration

pub mod clock;
pub mod collector;
pub mod config;
pub mod error;
pub mod sink;
pub mod snapshot;
pub mod state;
pub mod timing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collector::{CollectStats, TrainCollector};
pub use config::{TimingConfig, DEFAULT_MAX_LAP_DURATION};
pub use error::{CompanionError, Result};
pub use sink::{CircuitReadings, MetricsSink, RecordingSink, SourceLabels, TrainReadings};
pub use snapshot::{format_circuit_id, TimetableStop, TrainCar, TrainPowerInfo, TrainSnapshot};
pub use state::{StationChange, TrainState, TrainStateStore};
pub use timing::{LapOutcome, LapTimer, SegmentTimer, SegmentTrip, TimingUpdate, TrainTimer};
