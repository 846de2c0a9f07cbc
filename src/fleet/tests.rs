use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use super::{FleetPlan, run_fleet, run_fleet_with};
use crate::broker::Connector;
use crate::broker::testing::ScriptedConnector;
use crate::config::Settings;
use crate::utils::FleetError;
use crate::vehicle::VehicleKind;

fn plan(vans: usize, trucks: usize) -> FleetPlan {
    FleetPlan {
        vans,
        trucks,
        route: "dublin-limerick".to_string(),
        cycles: Some(1),
    }
}

#[test]
fn test_identities_number_each_kind_from_one() {
    let ids: Vec<(String, VehicleKind)> = plan(2, 1)
        .identities()
        .into_iter()
        .map(|i| (i.id, i.kind))
        .collect();

    assert_eq!(
        ids,
        vec![
            ("van-1".to_string(), VehicleKind::Van),
            ("van-2".to_string(), VehicleKind::Van),
            ("truck-1".to_string(), VehicleKind::Truck),
        ]
    );
}

#[tokio::test]
async fn test_unknown_route_launches_nothing() {
    let mut plan = plan(1, 1);
    plan.route = "cork-galway".to_string();
    let (_tx, rx) = watch::channel(false);

    let err = run_fleet(&plan, &Settings::default(), rx).await.unwrap_err();
    assert!(matches!(err, FleetError::UnknownRoute(ref name) if name == "cork-galway"));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_unknown_mode_launches_nothing() {
    let mut settings = Settings::default();
    settings.publisher.mode = "bursty".to_string();
    let (_tx, rx) = watch::channel(false);

    let err = run_fleet(&plan(1, 0), &settings, rx).await.unwrap_err();
    assert!(matches!(err, FleetError::Config(_)));
}

#[tokio::test(start_paused = true)]
async fn test_every_vehicle_runs_independently() {
    let connectors: Arc<Mutex<Vec<(String, ScriptedConnector)>>> = Arc::default();
    let registry = connectors.clone();
    let (_tx, rx) = watch::channel(false);
    let settings = Settings::default();
    let plan = plan(2, 1);

    let fleet = run_fleet_with(&plan, &settings, rx, move |identity| {
        let connector = ScriptedConnector::auto_ack();
        registry
            .lock()
            .unwrap()
            .push((identity.id.clone(), connector.clone()));
        Arc::new(connector) as Arc<dyn Connector>
    });

    let brokers = async {
        loop {
            let opened = {
                let connectors = connectors.lock().unwrap();
                connectors.len() == 3
                    && connectors
                        .iter()
                        .all(|(_, c)| c.opened("fleet") == 1)
            };
            if opened {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        for (id, connector) in connectors.lock().unwrap().iter() {
            connector.connect("fleet");
            if id.starts_with("van") {
                connector.connect("vans");
            } else {
                connector.connect("trucks");
            }
        }
    };

    let (reports, ()) = tokio::join!(fleet, brokers);
    let reports = reports.unwrap();

    let summary: Vec<(&str, u64, u64)> = reports
        .iter()
        .map(|(id, r)| (id.as_str(), r.cycles, r.published))
        .collect();
    assert_eq!(
        summary,
        vec![("van-1", 1, 5), ("van-2", 1, 5), ("truck-1", 1, 4)]
    );

    for (id, connector) in connectors.lock().unwrap().iter() {
        let published = connector.published();
        assert!(published.iter().all(|p| p.topic.starts_with("fleet/")));
        assert!(published.iter().any(|p| p.topic == format!("fleet/{id}")));
    }
}
