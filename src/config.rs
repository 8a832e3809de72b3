//! Configuration management for the runner.
//!
//! Loads runner defaults and named connections from a TOML file. A missing
//! file is not an error; every setting has a default.

use crate::dialect::Dialect;
use crate::error::{Result, RunnerError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Runner defaults.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Named database connections.
    #[serde(default)]
    pub connections: HashMap<String, ConnectionConfig>,
}

/// Runner defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Dialect used when none can be inferred (e.g. `dbrun select`).
    #[serde(default)]
    pub default_dialect: Dialect,

    /// Default page size for grid selections.
    #[serde(default = "default_page_limit")]
    pub page_limit: u64,

    /// Per-statement timeout.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,

    /// Rows kept per statement result; the rest are dropped.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

fn default_page_limit() -> u64 {
    100
}

fn default_query_timeout_secs() -> u64 {
    30
}

fn default_max_rows() -> usize {
    1000
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_dialect: Dialect::default(),
            page_limit: default_page_limit(),
            query_timeout_secs: default_query_timeout_secs(),
            max_rows: default_max_rows(),
        }
    }
}

impl RunnerConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Engine dialect. Inferred from the URL scheme when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Dialect>,

    /// Connection URL, e.g. `postgres://user@localhost:5432/app` or
    /// `sqlite://data.db`.
    pub url: String,
}

impl ConnectionConfig {
    /// Creates a connection config from a URL, inferring the dialect.
    pub fn from_url(conn_str: &str) -> Result<Self> {
        let url = Url::parse(conn_str)
            .map_err(|e| RunnerError::config(format!("Invalid connection string: {e}")))?;

        let dialect = Dialect::from_url_scheme(url.scheme()).ok_or_else(|| {
            RunnerError::config(format!(
                "Invalid scheme '{}'. Expected one of: postgres, mysql, mssql, clickhouse, sqlite",
                url.scheme()
            ))
        })?;

        Ok(Self {
            dialect: Some(dialect),
            url: conn_str.to_string(),
        })
    }

    /// Returns the configured dialect, falling back to the URL scheme.
    pub fn dialect(&self) -> Result<Dialect> {
        if let Some(dialect) = self.dialect {
            return Ok(dialect);
        }
        let url = Url::parse(&self.url)
            .map_err(|e| RunnerError::config(format!("Invalid connection string: {e}")))?;
        Dialect::from_url_scheme(url.scheme()).ok_or_else(|| {
            RunnerError::config(format!(
                "Cannot infer dialect from scheme '{}'; set `dialect` explicitly",
                url.scheme()
            ))
        })
    }

    /// Returns a display-safe string (no password) for logs and output.
    pub fn display_string(&self) -> String {
        match Url::parse(&self.url) {
            Ok(mut url) => {
                if url.password().is_some() {
                    let _ = url.set_password(None);
                }
                url.to_string()
            }
            Err(_) => "<invalid url>".to_string(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("db-runner")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| RunnerError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            RunnerError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Gets a named connection, or the default connection if name is None.
    pub fn get_connection(&self, name: Option<&str>) -> Option<&ConnectionConfig> {
        let key = name.unwrap_or("default");
        self.connections.get(key)
    }
}
