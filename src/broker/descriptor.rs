use crate::config::BrokerSettings;
use crate::vehicle::VehicleKind;

pub const FLEET_BROKER: &str = "fleet";
pub const VANS_BROKER: &str = "vans";
pub const TRUCKS_BROKER: &str = "trucks";

/// Static address of one named broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerDescriptor {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl BrokerDescriptor {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }

    /// Brokers a vehicle of `kind` publishes to: the shared fleet broker plus
    /// the broker of its class.
    pub fn registry_for(kind: VehicleKind, settings: &BrokerSettings) -> Vec<Self> {
        let fleet = Self::new(FLEET_BROKER, &settings.host, settings.fleet_port);
        let class = match kind {
            VehicleKind::Van => Self::new(VANS_BROKER, &settings.host, settings.vans_port),
            VehicleKind::Truck => Self::new(TRUCKS_BROKER, &settings.host, settings.trucks_port),
        };
        vec![fleet, class]
    }
}
