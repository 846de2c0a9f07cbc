use crate::config::LoggingSettings;

fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" | "warning" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}

/// Initialize tracing with the compact formatter at `default_level`.
pub fn init(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .compact()
        .with_max_level(parse_level(default_level))
        .with_target(false)
        .try_init();
}

/// Initialize tracing from the `[logging]` section.
///
/// Uses `try_init` so tests and repeated launches can call this more than once.
pub fn init_with(settings: &LoggingSettings) {
    let level = parse_level(&settings.level);
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    let _ = match settings.format.as_str() {
        "json" => builder.json().try_init(),
        "pretty" => builder.pretty().try_init(),
        _ => builder.compact().try_init(),
    };
}
