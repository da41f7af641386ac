//! The telemetry record assembled once per cycle and its JSON wire form.
//!
//! Unavailable quantities are `None` and travel as JSON `null`. The
//! `air_quality` object is left out of the document entirely when the air
//! quality sensor faulted.

use alloc::string::{String, ToString};

use serde::{Deserialize, Serialize};

/// Three axis vector; each component is independently valid or unavailable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vector3(pub [Option<f64>; 3]);

impl Vector3 {
    pub const UNAVAILABLE: Vector3 = Vector3([None; 3]);

    pub fn new(x: Option<f64>, y: Option<f64>, z: Option<f64>) -> Self {
        Vector3([x, y, z])
    }

    pub fn x(&self) -> Option<f64> {
        self.0[0]
    }

    pub fn y(&self) -> Option<f64> {
        self.0[1]
    }

    pub fn z(&self) -> Option<f64> {
        self.0[2]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirQuality {
    #[serde(rename = "TVOC")]
    pub tvoc_ppb: u16,
    #[serde(rename = "AQI")]
    pub aqi: u8,
    #[serde(rename = "eCO2")]
    pub eco2_ppm: u16,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub team_id: u16,
    pub sequence_number: u32,
    pub timestamp: i64,
    pub battery_pct: Option<f64>,
    pub temperature_c: Option<f64>,
    pub pressure_pa: Option<f64>,
    pub altitude_m: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub gyroscope: Vector3,
    pub accelerometer: Vector3,
    pub tilt_rad: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_quality: Option<AirQuality>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record encoding failed: {0}")]
    Encode(String),
    #[error("record decoding failed: {0}")]
    Decode(String),
}

impl TelemetryRecord {
    /// A record with every measured field unavailable.
    pub fn unavailable(team_id: u16, sequence_number: u32, timestamp: i64) -> Self {
        TelemetryRecord {
            team_id,
            sequence_number,
            timestamp,
            battery_pct: None,
            temperature_c: None,
            pressure_pa: None,
            altitude_m: None,
            humidity_pct: None,
            gyroscope: Vector3::UNAVAILABLE,
            accelerometer: Vector3::UNAVAILABLE,
            tilt_rad: None,
            air_quality: None,
        }
    }

    pub fn to_json(&self) -> Result<String, RecordError> {
        serde_json::to_string(self).map_err(|e| RecordError::Encode(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, RecordError> {
        serde_json::from_str(text).map_err(|e| RecordError::Decode(e.to_string()))
    }

    /// Number of measured fields that carry no value.
    pub fn unavailable_count(&self) -> usize {
        let scalars = [
            self.battery_pct,
            self.temperature_c,
            self.pressure_pa,
            self.altitude_m,
            self.humidity_pct,
            self.tilt_rad,
        ];
        scalars.iter().filter(|v| v.is_none()).count()
            + self.gyroscope.0.iter().filter(|v| v.is_none()).count()
            + self.accelerometer.0.iter().filter(|v| v.is_none()).count()
            + usize::from(self.air_quality.is_none())
    }
}
