use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Covers broker addresses, publishing cadence, GPS routes and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub brokers: BrokerSettings,
    pub publisher: PublisherSettings,
    pub routes: RouteSettings,
    pub logging: LoggingSettings,
}

/// Where the fleet, van and truck brokers listen.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub host: String,
    pub fleet_port: u16,
    pub vans_port: u16,
    pub trucks_port: u16,
    pub keep_alive_secs: u64,
}

/// Publishing cycle cadence and acknowledgement pacing.
#[derive(Debug, Deserialize, Clone)]
pub struct PublisherSettings {
    pub interval_ms: u64,
    pub ready_poll_ms: u64,
    /// `0` disables the acknowledgement timeout.
    pub ack_timeout_ms: u64,
    /// `serialized` or `concurrent`.
    pub mode: String,
    pub reconnect_delay_ms: u64,
}

/// GPS route files and playback.
#[derive(Debug, Deserialize, Clone)]
pub struct RouteSettings {
    pub dir: String,
    pub looping: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    /// `compact`, `pretty` or `json`.
    pub format: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub brokers: Option<PartialBrokerSettings>,
    pub publisher: Option<PartialPublisherSettings>,
    pub routes: Option<PartialRouteSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialBrokerSettings {
    pub host: Option<String>,
    pub fleet_port: Option<u16>,
    pub vans_port: Option<u16>,
    pub trucks_port: Option<u16>,
    pub keep_alive_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialPublisherSettings {
    pub interval_ms: Option<u64>,
    pub ready_poll_ms: Option<u64>,
    pub ack_timeout_ms: Option<u64>,
    pub mode: Option<String>,
    pub reconnect_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialRouteSettings {
    pub dir: Option<String>,
    pub looping: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            brokers: BrokerSettings {
                host: "localhost".to_string(),
                fleet_port: 1883,
                vans_port: 1884,
                trucks_port: 1885,
                keep_alive_secs: 60,
            },
            publisher: PublisherSettings {
                interval_ms: 1000,
                ready_poll_ms: 100,
                ack_timeout_ms: 5000,
                mode: "serialized".to_string(),
                reconnect_delay_ms: 1000,
            },
            routes: RouteSettings {
                dir: "routes".to_string(),
                looping: true,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                format: "compact".to_string(),
            },
        }
    }
}

impl Settings {
    /// Fill every field the partial settings leave out with its default.
    pub fn merge(partial: PartialSettings) -> Self {
        let default = Settings::default();
        let brokers = partial.brokers.unwrap_or_default();
        let publisher = partial.publisher.unwrap_or_default();
        let routes = partial.routes.unwrap_or_default();
        let logging = partial.logging.unwrap_or_default();

        Settings {
            brokers: BrokerSettings {
                host: brokers.host.unwrap_or(default.brokers.host),
                fleet_port: brokers.fleet_port.unwrap_or(default.brokers.fleet_port),
                vans_port: brokers.vans_port.unwrap_or(default.brokers.vans_port),
                trucks_port: brokers.trucks_port.unwrap_or(default.brokers.trucks_port),
                keep_alive_secs: brokers
                    .keep_alive_secs
                    .unwrap_or(default.brokers.keep_alive_secs),
            },
            publisher: PublisherSettings {
                interval_ms: publisher
                    .interval_ms
                    .unwrap_or(default.publisher.interval_ms),
                ready_poll_ms: publisher
                    .ready_poll_ms
                    .unwrap_or(default.publisher.ready_poll_ms),
                ack_timeout_ms: publisher
                    .ack_timeout_ms
                    .unwrap_or(default.publisher.ack_timeout_ms),
                mode: publisher.mode.unwrap_or(default.publisher.mode),
                reconnect_delay_ms: publisher
                    .reconnect_delay_ms
                    .unwrap_or(default.publisher.reconnect_delay_ms),
            },
            routes: RouteSettings {
                dir: routes.dir.unwrap_or(default.routes.dir),
                looping: routes.looping.unwrap_or(default.routes.looping),
            },
            logging: LoggingSettings {
                level: logging.level.unwrap_or(default.logging.level),
                format: logging.format.unwrap_or(default.logging.format),
            },
        }
    }
}
