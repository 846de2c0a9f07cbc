//! Fleet launcher
//!
//! Builds every vehicle of a plan, then runs one publishing driver per vehicle
//! as its own tokio task. All drivers share the shutdown signal and nothing
//! else.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tracing::{error, info};

use crate::broker::{ConnectionSet, Connector, MqttConnector};
use crate::config::Settings;
use crate::delivery::AckTracker;
use crate::driver::{DriverReport, DriverSettings, PublishingDriver};
use crate::utils::Result;
use crate::vehicle::{TelemetrySource, Vehicle, VehicleIdentity, VehicleKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetPlan {
    pub vans: usize,
    pub trucks: usize,
    pub route: String,
    /// Stop each vehicle after this many cycles instead of waiting for Ctrl-C.
    pub cycles: Option<u64>,
}

impl FleetPlan {
    /// Vans first, then trucks, each numbered from 1.
    pub fn identities(&self) -> Vec<VehicleIdentity> {
        let vans = (1..=self.vans).map(|n| (VehicleKind::Van, n));
        let trucks = (1..=self.trucks).map(|n| (VehicleKind::Truck, n));
        vans.chain(trucks)
            .map(|(kind, n)| VehicleIdentity::new(kind.vehicle_id(n), kind))
            .collect()
    }
}

/// Assemble one vehicle's driver: sensors, broker registry, connection set.
pub fn prepare_vehicle(
    identity: VehicleIdentity,
    route: &str,
    settings: &Settings,
    driver_settings: DriverSettings,
    connector: Arc<dyn Connector>,
    shutdown: watch::Receiver<bool>,
) -> Result<PublishingDriver<Vehicle>> {
    let vehicle = Vehicle::from_settings(identity, route, settings)?;
    let mut connections = ConnectionSet::new(
        &vehicle.identity().id,
        connector,
        Arc::new(AckTracker::new()),
    );
    for descriptor in vehicle.brokers() {
        connections.add(descriptor.clone())?;
    }
    PublishingDriver::new(vehicle, connections, driver_settings, shutdown)
}

/// Run the plan against real MQTT brokers.
pub async fn run_fleet(
    plan: &FleetPlan,
    settings: &Settings,
    shutdown: watch::Receiver<bool>,
) -> Result<Vec<(String, DriverReport)>> {
    run_fleet_with(plan, settings, shutdown, |identity| {
        Arc::new(MqttConnector::new(identity.id.clone(), settings)) as Arc<dyn Connector>
    })
    .await
}

/// Run the plan with a connector chosen per vehicle. Every vehicle is built
/// before any of them starts, so a configuration error launches nothing.
/// A vehicle that fails to build for any other reason is skipped.
pub async fn run_fleet_with<F>(
    plan: &FleetPlan,
    settings: &Settings,
    shutdown: watch::Receiver<bool>,
    connector_for: F,
) -> Result<Vec<(String, DriverReport)>>
where
    F: Fn(&VehicleIdentity) -> Arc<dyn Connector>,
{
    let mut driver_settings = DriverSettings::from_settings(&settings.publisher)?;
    driver_settings.max_cycles = plan.cycles;

    let mut drivers = Vec::new();
    for identity in plan.identities() {
        let connector = connector_for(&identity);
        let id = identity.id.clone();
        let prepared = prepare_vehicle(
            identity,
            &plan.route,
            settings,
            driver_settings.clone(),
            connector,
            shutdown.clone(),
        );
        match prepared {
            Ok(driver) => drivers.push((id, driver)),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => error!(vehicle = %id, error = %err, "vehicle failed to start; skipping"),
        }
    }

    info!(vans = plan.vans, trucks = plan.trucks, route = %plan.route, "starting fleet");
    let (ids, tasks): (Vec<String>, Vec<_>) = drivers
        .into_iter()
        .map(|(id, driver)| (id, tokio::spawn(driver.run())))
        .unzip();

    let mut reports = Vec::with_capacity(ids.len());
    for (id, outcome) in ids.into_iter().zip(join_all(tasks).await) {
        match outcome {
            Ok(report) => reports.push((id, report)),
            Err(err) => error!(vehicle = %id, error = %err, "vehicle task failed"),
        }
    }
    Ok(reports)
}

#[cfg(test)]
mod tests;
