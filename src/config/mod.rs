mod connection;

pub use connection::{
    ConnectionConfig, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_DRIVER, DEFAULT_MAX_LIFETIME_SECS,
    DEFAULT_PORT, Driver, ResolvedConnection,
};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_CONFIG_FILE: &str = "stmtmgr.toml";
const ENV_PREFIX: &str = "STMTMGR_";

/// A named statement registered by the binary at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StatementSpec {
    pub name: String,
    pub query: String,
}

/// Binary configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Log level for tracing subscriber initialization (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `loglevel`. Env: `STMTMGR_LOGLEVEL`. Default: `info`.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    /// Path of the JSON connection document.
    /// TOML: `connection_file`. Env: `STMTMGR_CONNECTION_FILE`. Default: `connection.json`.
    #[serde(default = "default_connection_file")]
    pub connection_file: PathBuf,

    /// Statements registered in order (TOML: `[[statements]]`).
    #[serde(default)]
    pub statements: Vec<StatementSpec>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            loglevel: default_loglevel(),
            connection_file: default_connection_file(),
            statements: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Builds a Figment that merges defaults, `stmtmgr.toml` if present, then `STMTMGR_*` env.
    pub fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }
}

fn default_loglevel() -> String {
    "info".to_string()
}

fn default_connection_file() -> PathBuf {
    PathBuf::from("connection.json")
}
