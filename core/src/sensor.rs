use crate::error::ParseError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorType {
    Temperature,
    #[serde(rename = "EC")]
    Ec,
    #[serde(rename = "pH")]
    Ph,
}

impl SensorType {
    /// Every board carries exactly one sensor of each type
    pub const ALL: [SensorType; 3] = [SensorType::Ph, SensorType::Ec, SensorType::Temperature];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Temperature => "Temperature",
            SensorType::Ec => "EC",
            SensorType::Ph => "pH",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "temperature" => Ok(SensorType::Temperature),
            "ec" => Ok(SensorType::Ec),
            "ph" => Ok(SensorType::Ph),
            _ => Err(ParseError::SensorType(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: i32,
    pub board_id: String,
    pub sensor_type: SensorType,
    #[serde(rename = "sensor_threshold_min")]
    pub threshold_min: Option<f64>,
    #[serde(rename = "sensor_threshold_max")]
    pub threshold_max: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl Sensor {
    pub fn new(board_id: &str, sensor_type: SensorType) -> Self {
        Sensor {
            id: 0,
            board_id: board_id.to_owned(),
            sensor_type,
            threshold_min: None,
            threshold_max: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_thresholds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.threshold_min = min;
        self.threshold_max = max;
        self
    }
}
