//! The `error` module defines the error type shared by every layer of `fleetpub`.
//!
//! Configuration problems are fatal and surface at startup. Everything else is
//! recoverable: the publishing driver logs it with enough context to correlate
//! (broker, topic, correlation id) and carries on with the next route or cycle.

use thiserror::Error;

pub type Result<T, E = FleetError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("broker `{0}` is already registered")]
    DuplicateBroker(String),

    #[error("route `{topic}` references unknown broker `{broker}`")]
    UnknownBroker { broker: String, topic: String },

    #[error("unknown GPS route `{0}`")]
    UnknownRoute(String),

    #[error("failed to load route file {path}: {reason}")]
    RouteFile { path: String, reason: String },

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("broker `{0}` not found")]
    BrokerNotFound(String),

    #[error("broker `{0}` is not connected")]
    NotConnected(String),

    #[error("could not connect to broker `{broker}`: {reason}")]
    Connect { broker: String, reason: String },

    #[error("transport for broker `{broker}` rejected publish: {reason}")]
    Transport { broker: String, reason: String },

    #[error("failed to encode payload for `{topic}`: {source}")]
    Encode {
        topic: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FleetError {
    /// Configuration errors end the vehicle; every other error is logged and
    /// retried or skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FleetError::DuplicateBroker(_)
                | FleetError::UnknownBroker { .. }
                | FleetError::UnknownRoute(_)
                | FleetError::RouteFile { .. }
                | FleetError::Config(_)
        )
    }
}
