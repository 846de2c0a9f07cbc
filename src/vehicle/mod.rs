//! Vehicles
//!
//! A vehicle ties an identity to its sensors, its broker registry and the
//! fan-out table of its kind. The publishing driver only sees it through the
//! [`TelemetrySource`] capability, so tests can drive it with canned frames.

use std::fmt;
use std::path::Path;

use crate::broker::BrokerDescriptor;
use crate::config::Settings;
use crate::routing::FanOutTable;
use crate::sensors::{GpsSensor, Route};
use crate::telemetry::{FrameBuilder, TelemetrySnapshot};
use crate::utils::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleKind {
    Van,
    Truck,
}

impl VehicleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleKind::Van => "van",
            VehicleKind::Truck => "truck",
        }
    }

    /// Fleet ids are `<kind>-<n>`, numbered from 1.
    pub fn vehicle_id(&self, number: usize) -> String {
        format!("{}-{number}", self.as_str())
    }
}

impl fmt::Display for VehicleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleIdentity {
    pub id: String,
    pub kind: VehicleKind,
}

impl VehicleIdentity {
    pub fn new(id: impl Into<String>, kind: VehicleKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// What the publishing driver needs from a vehicle.
pub trait TelemetrySource: Send {
    fn identity(&self) -> &VehicleIdentity;

    /// Read every sensor once.
    fn collect_data(&mut self) -> TelemetrySnapshot;

    fn fan_out_table(&self) -> &FanOutTable;
}

#[derive(Debug)]
pub struct Vehicle {
    frames: FrameBuilder,
    table: FanOutTable,
    brokers: Vec<BrokerDescriptor>,
}

impl Vehicle {
    pub fn new(identity: VehicleIdentity, gps: GpsSensor, brokers: Vec<BrokerDescriptor>) -> Self {
        let table = FanOutTable::for_kind(identity.kind);
        Self {
            frames: FrameBuilder::new(identity, gps),
            table,
            brokers,
        }
    }

    /// Build a vehicle driving `route` with the broker registry of its kind.
    pub fn from_settings(identity: VehicleIdentity, route: &str, settings: &Settings) -> Result<Self> {
        let route = Route::load(Path::new(&settings.routes.dir), route)?;
        let gps = GpsSensor::new(route, settings.routes.looping);
        let brokers = BrokerDescriptor::registry_for(identity.kind, &settings.brokers);
        Ok(Self::new(identity, gps, brokers))
    }

    pub fn brokers(&self) -> &[BrokerDescriptor] {
        &self.brokers
    }
}

impl TelemetrySource for Vehicle {
    fn identity(&self) -> &VehicleIdentity {
        self.frames.identity()
    }

    fn collect_data(&mut self) -> TelemetrySnapshot {
        self.frames.build()
    }

    fn fan_out_table(&self) -> &FanOutTable {
        &self.table
    }
}

#[cfg(test)]
mod tests;
