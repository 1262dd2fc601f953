//! Logging configuration for lorabridge

use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

use crate::config::LoggingConfig;
use crate::Result;

/// Initialize the logging system with default settings.
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Initialize logging with an explicit level, ignoring configuration.
pub fn init_logging_with_level(level: &str) -> Result<()> {
    let config = LoggingConfig {
        level: level.to_string(),
        file: false,
    };
    init_logging_with_config(&config)
}

/// Initialize logging from configuration.
///
/// Console output goes to stdout; third-party HTTP stack noise (hyper, tower,
/// reqwest) is capped at warn. When `file` is enabled, all events are also
/// written to a daily-rolling file under `logs/`.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let level = &config.level;
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,lorabridge={level},hyper=warn,tower=warn,reqwest=warn"
        ))
    });

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stdout);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    if config.file {
        std::fs::create_dir_all("logs")?;
        let file_appender = tracing_appender::rolling::daily("logs", "lorabridge.log");
        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender)
            .boxed();
        registry.with(file_layer).init();
    } else {
        registry.init();
    }

    Ok(())
}
