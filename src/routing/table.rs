//! Fan-out tables
//!
//! A table is the declarative list of `(broker, topic, view)` triples one
//! snapshot is published to, in publish order. Tables are fixed per vehicle
//! kind; the number and order of routes never depends on snapshot content.

use std::collections::HashSet;

use crate::broker::{FLEET_BROKER, TRUCKS_BROKER, VANS_BROKER};
use crate::utils::{FleetError, Result};
use crate::vehicle::VehicleKind;

/// Topic naming scheme. Per-vehicle topics are rendered with the vehicle id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicTemplate {
    FleetData,
    FleetGps,
    Vehicle,
    VehicleGps,
    VehicleCargoTemp,
}

impl TopicTemplate {
    pub fn render(&self, vehicle_id: &str) -> String {
        match self {
            TopicTemplate::FleetData => "fleet/data".to_string(),
            TopicTemplate::FleetGps => "fleet/gps".to_string(),
            TopicTemplate::Vehicle => format!("fleet/{vehicle_id}"),
            TopicTemplate::VehicleGps => format!("fleet/{vehicle_id}/gps"),
            TopicTemplate::VehicleCargoTemp => format!("fleet/{vehicle_id}/cargo-temp"),
        }
    }
}

/// Which part of the snapshot a route carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// The whole snapshot.
    Full,
    /// The GPS reading, tagged with `vehicle_id`.
    Gps,
    /// The kind-specific reading, tagged with `vehicle_id`.
    ClassReading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub broker: &'static str,
    pub topic: TopicTemplate,
    pub view: View,
}

impl RouteSpec {
    const fn new(broker: &'static str, topic: TopicTemplate, view: View) -> Self {
        Self {
            broker,
            topic,
            view,
        }
    }
}

const VAN_ROUTES: [RouteSpec; 5] = [
    RouteSpec::new(FLEET_BROKER, TopicTemplate::FleetData, View::Full),
    RouteSpec::new(FLEET_BROKER, TopicTemplate::FleetGps, View::Gps),
    RouteSpec::new(VANS_BROKER, TopicTemplate::Vehicle, View::Full),
    RouteSpec::new(VANS_BROKER, TopicTemplate::VehicleGps, View::Gps),
    RouteSpec::new(VANS_BROKER, TopicTemplate::VehicleCargoTemp, View::ClassReading),
];

// Trailer pressure only travels inside the full data message.
const TRUCK_ROUTES: [RouteSpec; 4] = [
    RouteSpec::new(FLEET_BROKER, TopicTemplate::FleetData, View::Full),
    RouteSpec::new(FLEET_BROKER, TopicTemplate::FleetGps, View::Gps),
    RouteSpec::new(TRUCKS_BROKER, TopicTemplate::Vehicle, View::Full),
    RouteSpec::new(TRUCKS_BROKER, TopicTemplate::VehicleGps, View::Gps),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutTable {
    routes: Vec<RouteSpec>,
}

impl FanOutTable {
    pub fn for_kind(kind: VehicleKind) -> Self {
        let routes = match kind {
            VehicleKind::Van => VAN_ROUTES.to_vec(),
            VehicleKind::Truck => TRUCK_ROUTES.to_vec(),
        };
        Self { routes }
    }

    pub fn routes(&self) -> &[RouteSpec] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Every route must name a registered broker. Checked once, before the
    /// first cycle.
    pub fn validate<'a>(&self, registered: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let registered: HashSet<&str> = registered.into_iter().collect();
        match self.routes.iter().find(|r| !registered.contains(r.broker)) {
            Some(route) => Err(FleetError::UnknownBroker {
                broker: route.broker.to_string(),
                topic: route.topic.render("<vehicle>"),
            }),
            None => Ok(()),
        }
    }
}
