//! Configuration types for train timing

use std::time::Duration;

use crate::error::{CompanionError, Result};

/// Default ceiling for an accepted round trip.
///
/// Laps of 90s have been observed as genuine and a 180s lap after a polling
/// gap as bogus; anything in that range separates the two. Tune it with
/// [`TimingConfig::with_max_lap_duration`] for networks with longer loops.
pub const DEFAULT_MAX_LAP_DURATION: Duration = Duration::from_secs(120);

/// Timing configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TimingConfig {
    /// Round trips longer than this are discarded as anomalous
    /// (restart, derailment recovery, missed polls).
    pub max_lap_duration: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            max_lap_duration: DEFAULT_MAX_LAP_DURATION,
        }
    }
}

impl TimingConfig {
    /// Create a configuration with a custom lap ceiling
    pub fn with_max_lap_duration(max_lap_duration: Duration) -> Self {
        Self { max_lap_duration }
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.max_lap_duration.is_zero() {
            return Err(CompanionError::InvalidConfig(
                "max_lap_duration must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
