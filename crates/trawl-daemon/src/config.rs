//! Daemon configuration.
//!
//! Configuration is loaded from `~/.config/trawl/config.toml` unless another
//! path is given on the command line or in `TRAWL_CONFIG`.
//!
//! ## Example Configuration
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [upstream]
//! base_url = "https://api.example.com"
//! refresh_url = "http://127.0.0.1:5173/api/refresh"
//! timeout_seconds = 30
//!
//! [search]
//! max_records = 250000
//! deadline_seconds = 120
//! decode_failure = "exhaust"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use trawl_common::{SearchConfig, UpstreamConfig};

use crate::error::{DaemonError, Result};

/// Daemon configuration loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrawlConfig {
    /// Listen address
    #[serde(default)]
    pub server: ServerConfig,

    /// Record store and refresh endpoint
    pub upstream: UpstreamConfig,

    /// Search walk and matcher tuning
    #[serde(default)]
    pub search: SearchConfig,
}

/// Listen address for the HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// The `host:port` pair to bind.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8080
}

impl TrawlConfig {
    /// Loads configuration from `path`, or from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config directory cannot be determined
    /// - The file doesn't exist
    /// - Deserialization or validation fails
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load_from(&Self::config_path()?),
        }
    }

    /// Loads and validates configuration from a specific file.
    ///
    /// # Errors
    ///
    /// See [`TrawlConfig::load`].
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DaemonError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| DaemonError::Config(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        Ok(config)
    }

    /// Returns the default configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| DaemonError::Config("Failed to determine config directory".to_string()))?
            .join("trawl");

        Ok(config_dir.join("config.toml"))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An upstream URL is not a valid http(s) URL
    /// - The total-count header name is blank
    /// - `search.page_size` is outside 1..=2500 or `search.keys` is empty
    pub fn validate(&self) -> Result<()> {
        self.upstream.validate()?;
        self.search.validate()?;

        Ok(())
    }
}
