//! The `broker` module manages a vehicle's connections to its named MQTT
//! brokers: registration, non-blocking connect, readiness and publishing.

pub mod connection;
pub mod descriptor;
pub mod mqtt;
pub mod set;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{Connection, ConnectionState, LinkEvents};
pub use descriptor::{BrokerDescriptor, FLEET_BROKER, TRUCKS_BROKER, VANS_BROKER};
pub use mqtt::{MqttConnector, MqttTransport};
pub use set::ConnectionSet;
pub use transport::{Connector, Transport};
