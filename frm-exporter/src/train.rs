// FRM Exporter - Train collector
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Train collector.
//!
//! Fetches `/getTrains` and feeds the batch to the timing core, which keeps
//! per-train state for the lifetime of the process.

use frm_companion::{CollectStats, SourceLabels, TrainSnapshot};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::fetch::{FetchError, FrmClient};
use crate::metrics::{record_poll, PrometheusSink};

/// Default FRM endpoint for trains.
pub const TRAIN_ENDPOINT: &str = "/getTrains";

/// Collects train timing and readings.
#[derive(Debug, Clone)]
pub struct TrainCollector {
    client: FrmClient,
    endpoint: String,
    timing: Arc<frm_companion::TrainCollector>,
}

impl TrainCollector {
    pub fn new(
        client: FrmClient,
        endpoint: impl Into<String>,
        timing: Arc<frm_companion::TrainCollector>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            timing,
        }
    }

    /// Number of trains with timing state.
    pub fn tracked_trains(&self) -> usize {
        self.timing.tracked_trains()
    }

    /// Fetch the trains from `address` and publish their metrics.
    pub async fn collect(&self, address: &str, session: &str) -> Result<CollectStats, FetchError> {
        let trains: Vec<TrainSnapshot> = match self.client.get_json(address, &self.endpoint).await {
            Ok(trains) => trains,
            Err(e) => {
                warn!("Error reading train statistics from FRM: {}", e);
                record_poll("train", address, false);
                return Err(e);
            }
        };

        let labels = SourceLabels::new(address, session);
        let stats = self.timing.observe(&trains, &labels, &PrometheusSink);
        debug!(
            "Trains from {}: {} seen, {} new, {} segments, {} round trips, {} laps discarded",
            address,
            stats.trains,
            stats.new_trains,
            stats.segments,
            stats.round_trips,
            stats.rejected_laps
        );
        record_poll("train", address, true);
        Ok(stats)
    }
}
