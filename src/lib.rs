//! # fleetpub
//!
//! `fleetpub` simulates a fleet of vans and trucks publishing sensor telemetry
//! to several MQTT brokers at once. Each vehicle samples its sensors once per
//! cycle, fans the snapshot out to a fixed set of broker/topic pairs and paces
//! itself on the brokers' acknowledgements.
//!
//! ## Core Modules
//!
//! - `broker`: per-vehicle broker connections, readiness and the MQTT transport.
//! - `delivery`: tracks publishes until the broker acknowledges them.
//! - `driver`: the connect, wait-for-ready, publish, sleep cycle of one vehicle.
//! - `routing`: fan-out tables and the messages built from a snapshot.
//! - `telemetry`: the snapshot data model and frame builder.
//! - `sensors`: simulated GPS, engine, temperature and pressure sensors.
//! - `vehicle`: vehicle kinds, identities and the `TelemetrySource` trait.
//! - `fleet`: launches one driver task per vehicle.
//! - `subscriber`: a one-topic subscriber that prints what it receives.
//! - `config`: layered configuration loading.
//! - `utils`: the shared error type and logging setup.

pub mod broker;
pub mod config;
pub mod delivery;
pub mod driver;
pub mod fleet;
pub mod routing;
pub mod sensors;
pub mod subscriber;
pub mod telemetry;
pub mod utils;
pub mod vehicle;
