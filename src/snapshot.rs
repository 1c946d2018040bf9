// FRM Companion - Train timing core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Snapshot types decoded from the FRM `/getTrains` endpoint.
//!
//! One [`TrainSnapshot`] is one poll-time observation of a train. Only the
//! name, station and timetable drive the timing subsystem; cars, power and
//! the derailed flag feed the instantaneous train metrics.

use serde::Deserialize;

/// One entry of a train's timetable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TimetableStop {
    #[serde(rename = "StationName", default)]
    pub station_name: String,
}

impl TimetableStop {
    pub fn new(station_name: impl Into<String>) -> Self {
        Self {
            station_name: station_name.into(),
        }
    }
}

/// A single vehicle (locomotive or freight car) in a train.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrainCar {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "TotalMass", default)]
    pub total_mass: f64,
    #[serde(rename = "PayloadMass", default)]
    pub payload_mass: f64,
    #[serde(rename = "MaxPayloadMass", default)]
    pub max_payload_mass: f64,
}

impl TrainCar {
    /// Whether this car draws power (electric locomotives do, freight cars don't).
    pub fn is_locomotive(&self) -> bool {
        self.name.contains("Locomotive")
    }
}

/// Power draw reported for a train.
///
/// FRM reports consumption per locomotive, not per train.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrainPowerInfo {
    #[serde(rename = "CircuitGroupID", default)]
    pub circuit_group_id: f64,
    #[serde(rename = "PowerConsumed", default)]
    pub power_consumed: f64,
    #[serde(rename = "MaxPowerConsumed", default)]
    pub max_power_consumed: f64,
}

/// Observation of one train at poll time.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrainSnapshot {
    /// Train name. The sole identity key.
    #[serde(rename = "Name", alias = "TrainName", default)]
    pub name: String,
    /// Station the train is at or was last at.
    #[serde(rename = "TrainStation", default)]
    pub station: String,
    /// Ordered route; index 0 is the loop origin. May be empty.
    #[serde(rename = "TimeTable", default)]
    pub timetable: Vec<TimetableStop>,
    #[serde(rename = "Vehicles", alias = "TrainCars", default)]
    pub cars: Vec<TrainCar>,
    #[serde(rename = "PowerInfo", default)]
    pub power: TrainPowerInfo,
    #[serde(rename = "Derailed", default)]
    pub derailed: bool,
    #[serde(rename = "Status", default)]
    pub status: String,
}

impl TrainSnapshot {
    /// Minimal snapshot carrying only what the timers consult.
    pub fn at_station<I, S>(name: impl Into<String>, station: impl Into<String>, timetable: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            station: station.into(),
            timetable: timetable.into_iter().map(TimetableStop::new).collect(),
            ..Default::default()
        }
    }

    /// The loop-origin station, if the train has a timetable.
    pub fn loop_origin(&self) -> Option<&str> {
        self.timetable.first().map(|stop| stop.station_name.as_str())
    }

    /// Number of locomotives in the consist.
    pub fn locomotive_count(&self) -> usize {
        self.cars.iter().filter(|car| car.is_locomotive()).count()
    }

    /// Power currently drawn by the whole train.
    pub fn power_consumed(&self) -> f64 {
        self.power.power_consumed * self.locomotive_count() as f64
    }

    /// Maximum power the whole train can draw.
    pub fn max_power_consumed(&self) -> f64 {
        self.power.max_power_consumed * self.locomotive_count() as f64
    }

    pub fn total_mass(&self) -> f64 {
        self.cars.iter().map(|car| car.total_mass).sum()
    }

    pub fn payload_mass(&self) -> f64 {
        self.cars.iter().map(|car| car.payload_mass).sum()
    }

    pub fn max_payload_mass(&self) -> f64 {
        self.cars.iter().map(|car| car.max_payload_mass).sum()
    }

    /// Circuit id as a label value (`1`, not `1.0`).
    pub fn circuit_id(&self) -> String {
        format_circuit_id(self.power.circuit_group_id)
    }
}

/// Format a circuit group id the way FRM users see it in game.
///
/// `Display` for `f64` prints the shortest exact decimal without an exponent
/// and drops the fractional part of integral values.
pub fn format_circuit_id(id: f64) -> String {
    format!("{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn car(name: &str, total: f64, payload: f64, max_payload: f64) -> TrainCar {
        TrainCar {
            name: name.to_string(),
            total_mass: total,
            payload_mass: payload,
            max_payload_mass: max_payload,
        }
    }

    #[test]
    fn test_decode_frm_train() {
        let json = r#"{
            "Name": "Train1",
            "TrainStation": "First",
            "Derailed": false,
            "Status": "Self-Driving",
            "TimeTable": [{"StationName": "First"}, {"StationName": "Second"}],
            "Vehicles": [
                {"Name": "Electric Locomotive", "TotalMass": 3000, "PayloadMass": 0, "MaxPayloadMass": 0}
            ],
            "PowerInfo": {"CircuitGroupID": 1, "PowerConsumed": 67, "MaxPowerConsumed": 120}
        }"#;

        let train: TrainSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(train.name, "Train1");
        assert_eq!(train.station, "First");
        assert_eq!(train.loop_origin(), Some("First"));
        assert_eq!(train.cars.len(), 1);
        assert_eq!(train.circuit_id(), "1");
    }

    #[test]
    fn test_decode_legacy_field_names() {
        let json = r#"{"TrainName": "Old", "TrainStation": "X", "TrainCars": []}"#;
        let train: TrainSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(train.name, "Old");
        assert!(train.timetable.is_empty());
        assert_eq!(train.loop_origin(), None);
    }

    #[test]
    fn test_power_scales_with_locomotives() {
        let mut train = TrainSnapshot::at_station("T", "A", ["A"]);
        train.cars = vec![
            car("Electric Locomotive", 3000.0, 0.0, 0.0),
            car("Electric Locomotive", 3000.0, 0.0, 0.0),
            car("Freight Car", 47584.0, 17584.0, 70000.0),
        ];
        train.power.power_consumed = 67.0;
        train.power.max_power_consumed = 120.0;

        assert_eq!(train.locomotive_count(), 2);
        assert_eq!(train.power_consumed(), 134.0);
        assert_eq!(train.max_power_consumed(), 240.0);
    }

    #[test]
    fn test_mass_sums() {
        let mut train = TrainSnapshot::at_station("T", "A", Vec::<String>::new());
        train.cars = vec![
            car("Electric Locomotive", 3000.0, 0.0, 0.0),
            car("Freight Car", 47584.0, 17584.0, 70000.0),
        ];

        assert_eq!(train.total_mass(), 50584.0);
        assert_eq!(train.payload_mass(), 17584.0);
        assert_eq!(train.max_payload_mass(), 70000.0);
    }

    #[test]
    fn test_format_circuit_id() {
        assert_eq!(format_circuit_id(0.0), "0");
        assert_eq!(format_circuit_id(12.0), "12");
        assert_eq!(format_circuit_id(1.5), "1.5");
    }

    #[test]
    fn test_format_circuit_id_large_and_signed() {
        assert_eq!(format_circuit_id(1e20), "100000000000000000000");
        assert_eq!(format_circuit_id(-3.0), "-3");
        assert_eq!(format_circuit_id(-0.0), "-0");
    }
}
