use crate::{Board, SensorType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything that carries one value per sensor type
pub trait Measured {
    fn value(&self, sensor_type: SensorType) -> f64;
}

/// Payload of `<ns>/<board_id>/telemetry`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMessage {
    pub temperature: f64,
    pub ec: f64,
    pub ph: f64,
}

impl Measured for TelemetryMessage {
    fn value(&self, sensor_type: SensorType) -> f64 {
        match sensor_type {
            SensorType::Temperature => self.temperature,
            SensorType::Ec => self.ec,
            SensorType::Ph => self.ph,
        }
    }
}

/// A persisted telemetry sample, append-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: i64,
    pub board_id: String,
    pub temperature: f64,
    pub ec: f64,
    pub ph: f64,
    pub created_at: DateTime<Utc>,
}

impl Measured for Reading {
    fn value(&self, sensor_type: SensorType) -> f64 {
        match sensor_type {
            SensorType::Temperature => self.temperature,
            SensorType::Ec => self.ec,
            SensorType::Ph => self.ph,
        }
    }
}

/// Events fanned out to the viewers of a single board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum BoardEvent {
    Telemetry(Reading),
    Status(Board),
}

impl BoardEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            BoardEvent::Telemetry(_) => "telemetry",
            BoardEvent::Status(_) => "status",
        }
    }

    pub fn board_id(&self) -> &str {
        match self {
            BoardEvent::Telemetry(reading) => &reading.board_id,
            BoardEvent::Status(board) => &board.board_id,
        }
    }
}

/// Frames addressed to one viewer connection only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ControlFrame {
    Subscribed { board_id: String },
    Error { message: String },
}
