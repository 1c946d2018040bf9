// FRM Exporter - Prometheus metrics definitions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus metrics for FRM monitoring.
//!
//! This module defines all Prometheus metrics exposed by the exporter
//! and the [`PrometheusSink`] the train timing core writes into.

use frm_companion::{CircuitReadings, MetricsSink, SourceLabels, TrainReadings};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, CounterVec, Encoder, GaugeVec, TextEncoder,
};

use crate::power::PowerDetails;

lazy_static! {
    // ============================================================
    // Train Timing Metrics
    // ============================================================

    /// Last completed trip between two consecutive stations.
    pub static ref TRAIN_SEGMENT_TRIP: GaugeVec = register_gauge_vec!(
        "train_segment_trip_seconds",
        "Recorded train trip time between two stations in seconds",
        &["train", "fromStation", "toStation", "source", "session"]
    ).unwrap();

    /// Last accepted full loop from the first timetable stop back to it.
    pub static ref TRAIN_ROUND_TRIP: GaugeVec = register_gauge_vec!(
        "train_round_trip_seconds",
        "Recorded train round trip time in seconds",
        &["train", "source", "session"]
    ).unwrap();

    // ============================================================
    // Train Readings
    // ============================================================

    pub static ref TRAIN_DERAILED: GaugeVec = register_gauge_vec!(
        "train_derailed",
        "Is train derailed (1=derailed, 0=on track)",
        &["train", "source", "session"]
    ).unwrap();

    /// Power drawn by the whole train (per-locomotive draw times locomotives).
    pub static ref TRAIN_POWER: GaugeVec = register_gauge_vec!(
        "train_power_consumed",
        "How much power the train is consuming",
        &["train", "source", "session"]
    ).unwrap();

    pub static ref TRAIN_TOTAL_MASS: GaugeVec = register_gauge_vec!(
        "train_total_mass",
        "Total mass of the train",
        &["train", "source", "session"]
    ).unwrap();

    pub static ref TRAIN_PAYLOAD_MASS: GaugeVec = register_gauge_vec!(
        "train_payload_mass",
        "Current payload mass of the train",
        &["train", "source", "session"]
    ).unwrap();

    pub static ref TRAIN_MAX_PAYLOAD_MASS: GaugeVec = register_gauge_vec!(
        "train_max_payload_mass",
        "Maximum payload mass of the train",
        &["train", "source", "session"]
    ).unwrap();

    pub static ref TRAIN_CIRCUIT_POWER: GaugeVec = register_gauge_vec!(
        "train_circuit_power_consumed",
        "Power consumed by all trains on a circuit",
        &["circuit_id", "source", "session"]
    ).unwrap();

    pub static ref TRAIN_CIRCUIT_POWER_MAX: GaugeVec = register_gauge_vec!(
        "train_circuit_power_consumed_max",
        "Maximum power all trains on a circuit can consume",
        &["circuit_id", "source", "session"]
    ).unwrap();

    // ============================================================
    // Power Circuit Metrics
    // ============================================================

    pub static ref POWER_CONSUMED: GaugeVec = register_gauge_vec!(
        "power_consumed",
        "Power consumed on a circuit",
        &["circuit_id", "source", "session"]
    ).unwrap();

    pub static ref POWER_CAPACITY: GaugeVec = register_gauge_vec!(
        "power_capacity",
        "Power capacity of a circuit",
        &["circuit_id", "source", "session"]
    ).unwrap();

    pub static ref POWER_MAX_CONSUMED: GaugeVec = register_gauge_vec!(
        "power_max_consumed",
        "Maximum power that can be consumed on a circuit",
        &["circuit_id", "source", "session"]
    ).unwrap();

    pub static ref BATTERY_DIFFERENTIAL: GaugeVec = register_gauge_vec!(
        "battery_differential",
        "Power surplus (positive) or deficit (negative) flowing into batteries",
        &["circuit_id", "source", "session"]
    ).unwrap();

    pub static ref BATTERY_PERCENT: GaugeVec = register_gauge_vec!(
        "battery_percent",
        "Battery charge percentage",
        &["circuit_id", "source", "session"]
    ).unwrap();

    pub static ref BATTERY_CAPACITY: GaugeVec = register_gauge_vec!(
        "battery_capacity",
        "Total battery capacity",
        &["circuit_id", "source", "session"]
    ).unwrap();

    pub static ref BATTERY_SECONDS_EMPTY: GaugeVec = register_gauge_vec!(
        "battery_seconds_empty",
        "Seconds until the batteries are empty",
        &["circuit_id", "source", "session"]
    ).unwrap();

    pub static ref BATTERY_SECONDS_FULL: GaugeVec = register_gauge_vec!(
        "battery_seconds_full",
        "Seconds until the batteries are full",
        &["circuit_id", "source", "session"]
    ).unwrap();

    pub static ref FUSE_TRIGGERED: GaugeVec = register_gauge_vec!(
        "fuse_triggered",
        "Has the fuse been triggered (1=triggered, 0=ok)",
        &["circuit_id", "source", "session"]
    ).unwrap();

    // ============================================================
    // Exporter Metrics
    // ============================================================

    /// Completed polls per collector and source.
    pub static ref POLLS_TOTAL: CounterVec = register_counter_vec!(
        "frm_exporter_polls_total",
        "Total polls of the FRM web server",
        &["collector", "source"]
    ).unwrap();

    /// Failed polls per collector and source.
    pub static ref POLL_ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "frm_exporter_poll_errors_total",
        "Total failed polls of the FRM web server",
        &["collector", "source"]
    ).unwrap();
}

fn bool_gauge(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// [`MetricsSink`] backed by the process-wide Prometheus registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusSink;

impl MetricsSink for PrometheusSink {
    fn set_segment_trip(
        &self,
        train: &str,
        from: &str,
        to: &str,
        labels: &SourceLabels,
        seconds: f64,
    ) {
        TRAIN_SEGMENT_TRIP
            .with_label_values(&[train, from, to, labels.source.as_str(), labels.session.as_str()])
            .set(seconds);
    }

    fn set_round_trip(&self, train: &str, labels: &SourceLabels, seconds: f64) {
        TRAIN_ROUND_TRIP
            .with_label_values(&[train, labels.source.as_str(), labels.session.as_str()])
            .set(seconds);
    }

    fn set_train_readings(&self, train: &str, labels: &SourceLabels, readings: &TrainReadings) {
        let values = [train, labels.source.as_str(), labels.session.as_str()];
        TRAIN_DERAILED
            .with_label_values(&values)
            .set(bool_gauge(readings.derailed));
        TRAIN_POWER
            .with_label_values(&values)
            .set(readings.power_consumed);
        TRAIN_TOTAL_MASS
            .with_label_values(&values)
            .set(readings.total_mass);
        TRAIN_PAYLOAD_MASS
            .with_label_values(&values)
            .set(readings.payload_mass);
        TRAIN_MAX_PAYLOAD_MASS
            .with_label_values(&values)
            .set(readings.max_payload_mass);
    }

    fn set_circuit_readings(
        &self,
        circuit_id: &str,
        labels: &SourceLabels,
        readings: &CircuitReadings,
    ) {
        let values = [circuit_id, labels.source.as_str(), labels.session.as_str()];
        TRAIN_CIRCUIT_POWER
            .with_label_values(&values)
            .set(readings.power_consumed);
        TRAIN_CIRCUIT_POWER_MAX
            .with_label_values(&values)
            .set(readings.max_power_consumed);
    }
}

/// Update power circuit metrics from one `/getPower` entry.
pub fn update_power_metrics(details: &PowerDetails, labels: &SourceLabels) {
    let circuit_id = details.circuit_id();
    let values = [
        circuit_id.as_str(),
        labels.source.as_str(),
        labels.session.as_str(),
    ];

    POWER_CONSUMED
        .with_label_values(&values)
        .set(details.power_consumed);
    POWER_CAPACITY
        .with_label_values(&values)
        .set(details.power_capacity);
    POWER_MAX_CONSUMED
        .with_label_values(&values)
        .set(details.power_max_consumed);
    BATTERY_DIFFERENTIAL
        .with_label_values(&values)
        .set(details.battery_differential);
    BATTERY_PERCENT
        .with_label_values(&values)
        .set(details.battery_percent);
    BATTERY_CAPACITY
        .with_label_values(&values)
        .set(details.battery_capacity);
    if let Some(seconds) = details.battery_seconds_empty() {
        BATTERY_SECONDS_EMPTY.with_label_values(&values).set(seconds);
    }
    if let Some(seconds) = details.battery_seconds_full() {
        BATTERY_SECONDS_FULL.with_label_values(&values).set(seconds);
    }
    FUSE_TRIGGERED
        .with_label_values(&values)
        .set(bool_gauge(details.fuse_triggered));
}

/// Record the outcome of one collector poll.
pub fn record_poll(collector: &str, source: &str, ok: bool) {
    POLLS_TOTAL.with_label_values(&[collector, source]).inc();
    if !ok {
        POLL_ERRORS_TOTAL
            .with_label_values(&[collector, source])
            .inc();
    }
}

/// Encode all metrics to Prometheus text format.
pub fn encode_metrics() -> Result<String, MetricsError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Metrics encoding errors.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Encoded metrics are not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(source: &str) -> SourceLabels {
        SourceLabels::new(source, "default")
    }

    #[test]
    fn test_bool_gauge() {
        assert_eq!(bool_gauge(true), 1.0);
        assert_eq!(bool_gauge(false), 0.0);
    }

    #[test]
    fn test_prometheus_sink_segment() {
        let labels = labels("http://metrics-test-segment");
        PrometheusSink.set_segment_trip("Train1", "First", "Second", &labels, 30.0);

        let value = TRAIN_SEGMENT_TRIP
            .with_label_values(&["Train1", "First", "Second", labels.source.as_str(), "default"])
            .get();
        assert_eq!(value, 30.0);
    }

    #[test]
    fn test_prometheus_sink_train_readings() {
        let labels = labels("http://metrics-test-readings");
        let readings = TrainReadings {
            derailed: true,
            power_consumed: 134.0,
            total_mass: 50584.0,
            payload_mass: 17584.0,
            max_payload_mass: 70000.0,
        };
        PrometheusSink.set_train_readings("Train1", &labels, &readings);

        let values = ["Train1", labels.source.as_str(), "default"];
        assert_eq!(TRAIN_DERAILED.with_label_values(&values).get(), 1.0);
        assert_eq!(TRAIN_POWER.with_label_values(&values).get(), 134.0);
        assert_eq!(TRAIN_MAX_PAYLOAD_MASS.with_label_values(&values).get(), 70000.0);
    }

    #[test]
    fn test_record_poll() {
        record_poll("train", "http://metrics-test-poll", true);
        record_poll("train", "http://metrics-test-poll", false);

        let values = ["train", "http://metrics-test-poll"];
        assert_eq!(POLLS_TOTAL.with_label_values(&values).get(), 2.0);
        assert_eq!(POLL_ERRORS_TOTAL.with_label_values(&values).get(), 1.0);
    }

    #[test]
    fn test_encode_metrics() {
        PrometheusSink.set_round_trip("Train1", &labels("http://metrics-test-encode"), 90.0);

        let output = encode_metrics().unwrap();
        assert!(output.contains("train_round_trip_seconds"));
    }
}
