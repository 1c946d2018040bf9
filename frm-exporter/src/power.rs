//! Power circuit collector.
//!
//! Republishes `/getPower` as per-circuit gauges. No state is kept between
//! polls.

use frm_companion::{format_circuit_id, SourceLabels};
use serde::Deserialize;
use tracing::warn;

use crate::fetch::{FetchError, FrmClient};
use crate::metrics::{record_poll, update_power_metrics};

/// Default FRM endpoint for power circuits.
pub const POWER_ENDPOINT: &str = "/getPower";

/// One power circuit as reported by FRM.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PowerDetails {
    #[serde(rename = "CircuitGroupID", default)]
    pub circuit_group_id: f64,
    #[serde(rename = "PowerConsumed", default)]
    pub power_consumed: f64,
    #[serde(rename = "PowerCapacity", default)]
    pub power_capacity: f64,
    #[serde(rename = "PowerMaxConsumed", default)]
    pub power_max_consumed: f64,
    #[serde(rename = "BatteryDifferential", default)]
    pub battery_differential: f64,
    #[serde(rename = "BatteryPercent", default)]
    pub battery_percent: f64,
    #[serde(rename = "BatteryCapacity", default)]
    pub battery_capacity: f64,
    #[serde(rename = "BatteryTimeEmpty", default)]
    pub battery_time_empty: String,
    #[serde(rename = "BatteryTimeFull", default)]
    pub battery_time_full: String,
    #[serde(rename = "FuseTriggered", default)]
    pub fuse_triggered: bool,
}

impl PowerDetails {
    pub fn circuit_id(&self) -> String {
        format_circuit_id(self.circuit_group_id)
    }

    pub fn battery_seconds_empty(&self) -> Option<f64> {
        parse_time_seconds(&self.battery_time_empty)
    }

    pub fn battery_seconds_full(&self) -> Option<f64> {
        parse_time_seconds(&self.battery_time_full)
    }
}

/// Parse an FRM `HH:MM:SS` (or `MM:SS`) duration into seconds.
pub fn parse_time_seconds(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() > 3 {
        return None;
    }

    let mut seconds = 0u64;
    for part in parts {
        let n: u64 = part.trim().parse().ok()?;
        seconds = seconds * 60 + n;
    }
    Some(seconds as f64)
}

/// Collects power circuit metrics.
#[derive(Debug, Clone)]
pub struct PowerCollector {
    client: FrmClient,
    endpoint: String,
}

impl PowerCollector {
    pub fn new(client: FrmClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Fetch the circuits from `address` and update the gauges.
    pub async fn collect(&self, address: &str, session: &str) -> Result<usize, FetchError> {
        let details: Vec<PowerDetails> = match self.client.get_json(address, &self.endpoint).await {
            Ok(details) => details,
            Err(e) => {
                warn!("Error reading power statistics from FRM: {}", e);
                record_poll("power", address, false);
                return Err(e);
            }
        };

        let labels = SourceLabels::new(address, session);
        for circuit in &details {
            update_power_metrics(circuit, &labels);
        }
        record_poll("power", address, true);
        Ok(details.len())
    }
}
