//! Service configuration.
//!
//! Read from a TOML file (every key optional), then overridden from the
//! environment. Overrides go through a lookup function so tests never touch
//! the process environment.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::store::pg::is_valid_table_name;

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "canal.toml";

/// Records per history request when the caller gives no usable `limit`.
pub const DEFAULT_HISTORY_LIMIT: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub listen: String,
    /// Dashboard assets served for paths the API does not claim.
    pub static_dir: Option<PathBuf>,
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
            static_dir: None,
            worker_threads: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub table: String,
    /// Seed file for the memory backend.
    pub fixture_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Postgres,
            database_url: None,
            table: "canal.ice_measurements".to_string(),
            fixture_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    pub default_history_limit: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            default_history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ServiceConfig {
    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// File, then process environment. Not validated: callers apply any
    /// further overrides and then call `validate` once.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// File, then overrides from `lookup`.
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load(path)?;
        config.apply_env_overrides(lookup)?;
        Ok(config)
    }

    /// Applies `PORT`, `DATABASE_URL`, `CANAL_STORE_TABLE` and
    /// `CANAL_LOG_LEVEL` from `lookup`. Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT") {
            let port: u16 = port.trim().parse().map_err(|_| ConfigError::Invalid {
                reason: format!("PORT must be a port number, got {port:?}"),
            })?;
            let host = self
                .server
                .listen
                .rsplit_once(':')
                .map(|(host, _)| host)
                .unwrap_or("0.0.0.0");
            self.server.listen = format!("{host}:{port}");
        }
        if let Some(url) = get("DATABASE_URL") {
            self.store.database_url = Some(url);
        }
        if let Some(table) = get("CANAL_STORE_TABLE") {
            self.store.table = table;
        }
        if let Some(level) = get("CANAL_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        if !is_valid_table_name(&self.store.table) {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "store.table must be a lowercase identifier or schema.identifier, got {:?}",
                    self.store.table
                ),
            });
        }
        if self.api.default_history_limit == 0 {
            return Err(ConfigError::Invalid {
                reason: "api.default_history_limit must be at least 1".to_string(),
            });
        }
        if self.server.worker_threads == Some(0) {
            return Err(ConfigError::Invalid {
                reason: "server.worker_threads must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.listen.parse().map_err(|_| ConfigError::Invalid {
            reason: format!("server.listen is not a socket address: {:?}", self.server.listen),
        })
    }
}
