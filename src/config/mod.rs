#[allow(clippy::module_inception)]
mod config;

pub use config::{
    LoggingSettings, PostgresSettings, ServerSettings, Settings, StoreBackend, StoreSettings,
    TokenSettings,
};
