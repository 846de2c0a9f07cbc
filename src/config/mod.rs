mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{
    BrokerSettings, LoggingSettings, PublisherSettings, RouteSettings, Settings,
};

/// Prefix for environment overrides, e.g. `FLEETPUB__BROKERS__HOST=mqtt.local`.
pub const ENV_PREFIX: &str = "FLEETPUB";

/// Loads `config/default.*` (if present) and `FLEETPUB__*` environment
/// variables, merged over the built-in defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config/default")
}

/// Same as [`load_config`] but reads the file source from `path`
/// (extension optional, any format the `config` crate understands).
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(Settings::merge(partial))
}

#[cfg(test)]
mod tests;
