use crate::sensors::{EngineControlUnit, GpsSensor, PressureSensor, Thermistor};
use crate::telemetry::{ClassReading, TelemetrySnapshot};
use crate::vehicle::{VehicleIdentity, VehicleKind};

/// The sensor only one vehicle kind carries.
#[derive(Debug)]
pub enum ClassSensor {
    Cargo(Thermistor),
    Trailer(PressureSensor),
}

impl ClassSensor {
    pub fn for_kind(kind: VehicleKind) -> Self {
        match kind {
            VehicleKind::Van => ClassSensor::Cargo(Thermistor::new("cargo")),
            VehicleKind::Truck => ClassSensor::Trailer(PressureSensor::trailer()),
        }
    }

    pub fn read(&mut self) -> ClassReading {
        match self {
            ClassSensor::Cargo(sensor) => ClassReading::CargoTemperature(sensor.read()),
            ClassSensor::Trailer(sensor) => ClassReading::TrailerPressure(sensor.read()),
        }
    }
}

/// Assembles one snapshot per call from a vehicle's sensors.
#[derive(Debug)]
pub struct FrameBuilder {
    identity: VehicleIdentity,
    gps: GpsSensor,
    ecu: EngineControlUnit,
    class: ClassSensor,
}

impl FrameBuilder {
    pub fn new(identity: VehicleIdentity, gps: GpsSensor) -> Self {
        let class = ClassSensor::for_kind(identity.kind);
        Self {
            identity,
            gps,
            ecu: EngineControlUnit::new(),
            class,
        }
    }

    pub fn identity(&self) -> &VehicleIdentity {
        &self.identity
    }

    pub fn build(&mut self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            id: self.identity.id.clone(),
            gps: self.gps.read(),
            engine: self.ecu.read(),
            class: self.class.read(),
        }
    }
}
