use anyhow::Context;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use crate::config::LoggingSettings;

/// Install the global logger at the configured level.
///
/// Connection and HTTP plumbing crates are capped at `Warn`.
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(settings.level_filter())
        .with_module_level("tokio_postgres", LevelFilter::Warn)
        .with_module_level("hyper", LevelFilter::Warn)
        .with_module_level("tokio_util", LevelFilter::Warn)
        .init()
        .context("Failed to initialize logger")
}
