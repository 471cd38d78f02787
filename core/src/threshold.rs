//! Threshold evaluation of a single measurement against a board's sensors.
//!
//! Pure functions only, callers decide what a breach triggers.

use crate::{Measured, Sensor, SensorType};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundKind {
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breach {
    pub sensor_type: SensorType,
    pub observed_value: f64,
    pub bound_kind: BoundKind,
    pub bound_value: f64,
}

impl fmt::Display for Breach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bound_kind {
            BoundKind::Max => write!(
                f,
                "{} ({:.2}) exceeded maximum threshold ({:.2})",
                self.sensor_type, self.observed_value, self.bound_value
            ),
            BoundKind::Min => write!(
                f,
                "{} ({:.2}) is below minimum threshold ({:.2})",
                self.sensor_type, self.observed_value, self.bound_value
            ),
        }
    }
}

/// Compares each sensor's reading against its bounds
///
/// An absent bound is not checked, bounds are exclusive.
pub fn evaluate<M: Measured>(measurement: &M, sensors: &[Sensor]) -> Vec<Breach> {
    let mut breaches = Vec::new();
    for sensor in sensors {
        let observed = measurement.value(sensor.sensor_type);
        if let Some(min) = sensor.threshold_min {
            if observed < min {
                breaches.push(Breach {
                    sensor_type: sensor.sensor_type,
                    observed_value: observed,
                    bound_kind: BoundKind::Min,
                    bound_value: min,
                });
            }
        }
        if let Some(max) = sensor.threshold_max {
            if observed > max {
                breaches.push(Breach {
                    sensor_type: sensor.sensor_type,
                    observed_value: observed,
                    bound_kind: BoundKind::Max,
                    bound_value: max,
                });
            }
        }
    }
    breaches
}
