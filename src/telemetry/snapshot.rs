//! Telemetry data model
//!
//! Every type here serializes to the JSON shape consumers subscribe to. Field
//! names are part of the wire contract (`fuel-press` keeps its hyphen).
//! Numeric channels are [`Sample`]s so an unreadable sensor still produces its
//! field, carrying the [`UNAVAILABLE`] marker instead of a number.

use serde::{Serialize, Serializer};

/// Marker written in place of a reading the sensor could not produce.
pub const UNAVAILABLE: &str = "unavailable";

/// One numeric channel value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Value(f64),
    Unavailable,
}

impl Sample {
    /// Non-finite values (open circuits, divisions by zero) cannot be encoded
    /// as JSON numbers and become `Unavailable`.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Sample::Value(value)
        } else {
            Sample::Unavailable
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Sample::Value(v) => Some(*v),
            Sample::Unavailable => None,
        }
    }
}

impl From<Option<f64>> for Sample {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Sample::Unavailable, Sample::from_f64)
    }
}

impl Serialize for Sample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value().filter(|v| v.is_finite()) {
            Some(v) => serializer.serialize_f64(v),
            None => serializer.serialize_str(UNAVAILABLE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpsReading {
    pub id: String,
    pub timestamp: f64,
    pub lat: Sample,
    pub lon: Sample,
}

/// Engine control unit channels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineReadings {
    /// Engine coolant temperature, Celsius.
    pub ect: Sample,
    /// Intake air temperature, Celsius.
    pub iat: Sample,
    /// Manifold absolute pressure, kPa.
    pub map: Sample,
    /// Fuel rail pressure, kPa.
    #[serde(rename = "fuel-press")]
    pub fuel_press: Sample,
    /// Oxygen sensor voltage, V.
    pub oxygen: Sample,
    /// Vehicle speed, km/h.
    pub vss: Sample,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureReading {
    pub id: String,
    pub timestamp: f64,
    pub temperature: Sample,
    pub unit: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PressureReading {
    pub id: String,
    pub timestamp: f64,
    pub pressure: Sample,
    pub unit: String,
    pub location: String,
}

/// The reading only one vehicle kind carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassReading {
    CargoTemperature(TemperatureReading),
    TrailerPressure(PressureReading),
}

/// One cycle's complete set of readings for a vehicle.
///
/// Serializes as
/// `{"id", "gps": {..}, "engine": {..}, "cargo_temperature" | "trailer_pressure": {..}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub id: String,
    pub gps: GpsReading,
    pub engine: EngineReadings,
    #[serde(flatten)]
    pub class: ClassReading,
}
