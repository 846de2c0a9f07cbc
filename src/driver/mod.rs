//! Publishing cycle driver
//!
//! Drives one vehicle: opens its broker connections, waits until every one of
//! them is connected, then publishes a fresh snapshot through the vehicle's
//! fan-out table once per interval until it is cancelled.

pub mod cycle;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use config::ConfigError;

use crate::config::PublisherSettings;
use crate::utils::{FleetError, Result};

pub use cycle::PublishingDriver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Connecting,
    AwaitingReady,
    Running,
    Interrupted,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverState::Idle => "idle",
            DriverState::Connecting => "connecting",
            DriverState::AwaitingReady => "awaiting-ready",
            DriverState::Running => "running",
            DriverState::Interrupted => "interrupted",
            DriverState::ShuttingDown => "shutting-down",
            DriverState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// How a cycle waits for acknowledgements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishMode {
    /// Each publish waits for its own acknowledgement before the next route.
    #[default]
    Serialized,
    /// Publishes overlap; stale entries are expired at the end of the cycle.
    Concurrent,
}

impl FromStr for PublishMode {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serialized" => Ok(PublishMode::Serialized),
            "concurrent" => Ok(PublishMode::Concurrent),
            other => Err(FleetError::Config(ConfigError::Message(format!(
                "unknown publish mode `{other}`; expected `serialized` or `concurrent`"
            )))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSettings {
    pub interval: Duration,
    pub ready_poll: Duration,
    /// `None` waits for acknowledgements indefinitely.
    pub ack_timeout: Option<Duration>,
    pub mode: PublishMode,
    /// Stop on its own after this many cycles.
    pub max_cycles: Option<u64>,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            ready_poll: Duration::from_millis(100),
            ack_timeout: Some(Duration::from_secs(5)),
            mode: PublishMode::Serialized,
            max_cycles: None,
        }
    }
}

impl DriverSettings {
    pub fn from_settings(settings: &PublisherSettings) -> Result<Self> {
        let ack_timeout = match settings.ack_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        Ok(Self {
            interval: Duration::from_millis(settings.interval_ms),
            // A zero poll interval would spin.
            ready_poll: Duration::from_millis(settings.ready_poll_ms.max(1)),
            ack_timeout,
            mode: settings.mode.parse()?,
            max_cycles: None,
        })
    }
}

/// What one driver did over its lifetime.
///
/// Delivery counts are taken when the driver stops. Publishes still waiting
/// for an acknowledgement at that point are counted in `in_flight`; the
/// transport may report them lost after the report is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverReport {
    pub cycles: u64,
    pub published: u64,
    pub acknowledged: u64,
    pub lost: u64,
    pub in_flight: u64,
    pub failed: u64,
}

impl fmt::Display for DriverReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cycles, {} published, {} acknowledged, {} lost, {} in flight, {} failed",
            self.cycles,
            self.published,
            self.acknowledged,
            self.lost,
            self.in_flight,
            self.failed
        )
    }
}
