use super::{Settings, load_config_from};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.brokers.host, "localhost");
    assert_eq!(settings.brokers.fleet_port, 1883);
    assert_eq!(settings.brokers.vans_port, 1884);
    assert_eq!(settings.brokers.trucks_port, 1885);
    assert_eq!(settings.publisher.interval_ms, 1000);
    assert_eq!(settings.publisher.ready_poll_ms, 100);
    assert_eq!(settings.publisher.ack_timeout_ms, 5000);
    assert_eq!(settings.publisher.mode, "serialized");
    assert!(settings.routes.looping);
}

#[test]
#[serial]
fn test_missing_file_yields_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("absent");

    let settings = load_config_from(path.to_str().unwrap()).expect("load config");
    assert_eq!(settings.brokers.host, "localhost");
    assert_eq!(settings.logging.level, "info");
}

#[test]
#[serial]
fn test_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("fleet.toml");
    let toml = r#"
        [brokers]
        host = "mqtt.depot"
        vans_port = 2884

        [publisher]
        interval_ms = 250
        mode = "concurrent"

        [routes]
        looping = false
    "#;
    fs::write(&path, toml).expect("write config file");

    let settings = load_config_from(path.to_str().unwrap()).expect("load config");
    assert_eq!(settings.brokers.host, "mqtt.depot");
    assert_eq!(settings.brokers.vans_port, 2884);
    assert_eq!(settings.brokers.fleet_port, 1883);
    assert_eq!(settings.publisher.interval_ms, 250);
    assert_eq!(settings.publisher.mode, "concurrent");
    assert_eq!(settings.publisher.ack_timeout_ms, 5000);
    assert!(!settings.routes.looping);
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("fleet.toml");
    fs::write(&path, "[brokers]\nhost = \"from-file\"\n").expect("write config file");

    temp_env::with_vars(
        [
            ("FLEETPUB__BROKERS__HOST", Some("from-env")),
            ("FLEETPUB__PUBLISHER__ACK_TIMEOUT_MS", Some("0")),
        ],
        || {
            let settings = load_config_from(path.to_str().unwrap()).expect("load config");
            assert_eq!(settings.brokers.host, "from-env");
            assert_eq!(settings.publisher.ack_timeout_ms, 0);
        },
    );
}
