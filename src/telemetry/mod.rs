//! The `telemetry` module holds the snapshot data model and the frame builder
//! that fills it from a vehicle's sensors once per publishing cycle.

pub mod builder;
pub mod snapshot;

pub use builder::{ClassSensor, FrameBuilder};
pub use snapshot::{
    ClassReading, EngineReadings, GpsReading, PressureReading, Sample, TelemetrySnapshot,
    TemperatureReading, UNAVAILABLE,
};
