use quoteform_core::config::{AppConfig, LogFormat, LoggingConfig};
use tracing::Level;

/// Installs the global subscriber. Logs go to stderr so command payloads on
/// stdout stay machine-readable.
pub fn init(logging: &LoggingConfig) -> anyhow::Result<()> {
    let level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|error| anyhow::anyhow!("failed to install log subscriber: {error}"))
}

/// Falls back to the default logging section when configuration is broken;
/// the command itself reports the config error.
pub fn init_from(config: Option<&AppConfig>) -> anyhow::Result<()> {
    match config {
        Some(config) => init(&config.logging),
        None => init(&AppConfig::default().logging),
    }
}
