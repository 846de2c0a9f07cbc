use std::fs;

use tempfile::TempDir;

use super::*;
use crate::broker::{FLEET_BROKER, TRUCKS_BROKER, VANS_BROKER};
use crate::routing::FanOutTable;
use crate::utils::FleetError;

#[test]
fn test_vehicle_ids_and_display() {
    assert_eq!(VehicleKind::Van.vehicle_id(7), "van-7");
    assert_eq!(VehicleKind::Truck.vehicle_id(1), "truck-1");
    assert_eq!(VehicleKind::Truck.to_string(), "truck");
}

#[test]
fn test_from_settings_wires_brokers_for_kind() {
    let settings = Settings::default();

    let van = Vehicle::from_settings(
        VehicleIdentity::new("van-1", VehicleKind::Van),
        "dublin-limerick",
        &settings,
    )
    .unwrap();
    let names: Vec<&str> = van.brokers().iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec![FLEET_BROKER, VANS_BROKER]);
    assert_eq!(van.fan_out_table(), &FanOutTable::for_kind(VehicleKind::Van));

    let truck = Vehicle::from_settings(
        VehicleIdentity::new("truck-1", VehicleKind::Truck),
        "dublin-limerick",
        &settings,
    )
    .unwrap();
    assert_eq!(truck.brokers()[1].name, TRUCKS_BROKER);
    assert_eq!(truck.brokers()[1].port, settings.brokers.trucks_port);
}

#[test]
fn test_table_brokers_match_registry() {
    for kind in [VehicleKind::Van, VehicleKind::Truck] {
        let vehicle = Vehicle::from_settings(
            VehicleIdentity::new(kind.vehicle_id(1), kind),
            "dublin-limerick",
            &Settings::default(),
        )
        .unwrap();
        let registered = vehicle.brokers().iter().map(|b| b.name.as_str());
        assert!(vehicle.fan_out_table().validate(registered).is_ok());
    }
}

#[test]
fn test_from_settings_reads_route_dir() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("loop-clean.csv"), "lat,lon\n10.0,20.0\n").unwrap();
    let mut settings = Settings::default();
    settings.routes.dir = tmp.path().display().to_string();

    let mut van = Vehicle::from_settings(
        VehicleIdentity::new("van-3", VehicleKind::Van),
        "loop",
        &settings,
    )
    .unwrap();
    let snapshot = van.collect_data();
    assert_eq!(snapshot.id, "van-3");
    assert_eq!(snapshot.gps.lat.value(), Some(10.0));

    // looping by default
    assert_eq!(van.collect_data().gps.lon.value(), Some(20.0));
}

#[test]
fn test_from_settings_unknown_route() {
    let err = Vehicle::from_settings(
        VehicleIdentity::new("van-1", VehicleKind::Van),
        "nowhere",
        &Settings::default(),
    )
    .unwrap_err();
    assert!(matches!(err, FleetError::UnknownRoute(_)));
}
