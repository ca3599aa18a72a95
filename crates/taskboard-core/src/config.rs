//! BoardConfig - TOML + 環境変数
//!
//! 優先順位: 環境変数 (`PORT`, `TASKBOARD_HOST`) > TOML ファイル > Default
//! どのセクションも省略可能（`#[serde(default)]`）。

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BoardError;
use crate::relay::SnapshotPolicy;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub server: ServerConfig,
    pub relay: RelayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub snapshot_policy: SnapshotPolicy,
    pub seed_sample_tasks: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            snapshot_policy: SnapshotPolicy::default(),
            seed_sample_tasks: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive. `RUST_LOG` wins when set.
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

impl BoardConfig {
    /// Load from an optional TOML file, then apply environment overrides.
    ///
    /// # Errors
    /// - `BoardError::Io` if the file cannot be read
    /// - `BoardError::Config` if it is not valid TOML or an override is malformed
    pub fn load(path: Option<&Path>) -> Result<Self, BoardError> {
        let config = match path {
            Some(path) => Self::from_toml(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_toml(text: &str) -> Result<Self, BoardError> {
        toml::from_str(text).map_err(|e| BoardError::Config(e.to_string()))
    }

    /// `lookup` is `std::env::var` in production; tests pass a closure.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, BoardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| BoardError::Config(format!("PORT is not a port number: {port:?}")))?;
        }
        if let Some(host) = lookup("TASKBOARD_HOST")
            && !host.trim().is_empty()
        {
            self.server.host = host.trim().to_string();
        }
        Ok(self)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, BoardError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| BoardError::Config(format!("bad bind address: {e}")))
    }
}
