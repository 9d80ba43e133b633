use config::{Config, ConfigError, Environment, File, FileFormat};
use log::LevelFilter;
use serde::Deserialize;

/// PostgreSQL database connection configuration.
///
/// Holds the `tokens` reference table and the append-only `quotes` table.
#[derive(Debug, Deserialize, Clone)]
pub struct PostgresSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_port() -> u16 {
    5432
}

fn default_pool_size() -> usize {
    16
}

/// HTTP API configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingSettings {
    /// Falls back to `Info` when the configured level is not recognised.
    pub fn level_filter(&self) -> LevelFilter {
        self.level.trim().parse().unwrap_or(LevelFilter::Info)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

impl StoreBackend {
    /// Whether written rows outlive the process.
    pub fn is_persistent(self) -> bool {
        matches!(self, Self::Postgres)
    }
}

/// Quote store selection and startup behaviour.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Run migrations and seed configured tokens on startup
    #[serde(default)]
    pub create_database: bool,
}

/// Static token reference data seeded into the `tokens` table.
#[derive(Debug, Deserialize, Clone)]
pub struct TokenSettings {
    pub address: String,
    pub symbol: String,
    pub decimals: i32,
}

/// Root application configuration.
///
/// Loaded from `config.yaml` at startup, with `QUOTES__SECTION__KEY`
/// environment variables taking precedence.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub postgres: Option<PostgresSettings>,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub tokens: Vec<TokenSettings>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("QUOTES").separator("__"))
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }

    pub fn from_yaml(document: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(document, FileFormat::Yaml))
            .build()?
            .try_deserialize()
    }
}
