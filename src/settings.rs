use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Postgres {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// How a bulk payment update over both participation kinds is committed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkMode {
    /// One set-based update per kind. A failure between them leaves the
    /// first kind updated.
    #[default]
    BestEffort,
    /// Both kinds in one database transaction.
    Transactional,
}

#[derive(Debug, Default, Deserialize)]
pub struct Payments {
    #[serde(default)]
    pub bulk_mode: BulkMode,
}

#[derive(Debug, Deserialize)]
pub struct Stats {
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub postgres: Postgres,
    #[serde(default)]
    pub payments: Payments,
    #[serde(default)]
    pub stats: Stats,
}

impl Settings {
    /// Loads `path`, then lets `CLUB__SECTION__KEY` variables override it.
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("CLUB").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_refresh_interval() -> u64 {
    60
}
