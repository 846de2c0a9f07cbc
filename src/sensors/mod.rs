//! Simulated sensors.
//!
//! Each sensor is a small stateful generator with a UUID of its own. The
//! publishing core only ever asks them for their next reading; the numeric
//! models here are simple.

pub mod ecu;
pub mod gps;
pub mod pressure;
pub mod thermistor;

pub use ecu::{EngineControlUnit, VoltageDivider};
pub use gps::{GpsSensor, Route};
pub use pressure::PressureSensor;
pub use thermistor::Thermistor;

use chrono::Utc;
use uuid::Uuid;

/// Seconds since the UNIX epoch, with sub-second precision.
pub fn now_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

pub(crate) fn sensor_id() -> String {
    Uuid::new_v4().to_string()
}
