//! Configuration file and defaults.
//!
//! The config file is TOML. Its path is resolved in this order:
//!
//! 1. an explicit path (the `--config` flag)
//! 2. the `SHEETMATCH_CONFIG` environment variable
//! 3. `<config dir>/sheetmatch/config.toml`
//!
//! A missing file yields the defaults. `SHEETMATCH_HOST` and
//! `SHEETMATCH_PORT` override the server address after loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::compare::DEFAULT_CHUNK_SIZE;
use crate::{Error, Result};

/// Project name used for the config directory.
pub const PROJECT_NAME: &str = "sheetmatch";

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SHEETMATCH_CONFIG";

/// Environment variable overriding `server.host`.
pub const HOST_ENV: &str = "SHEETMATCH_HOST";

/// Environment variable overriding `server.port`.
pub const PORT_ENV: &str = "SHEETMATCH_PORT";

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetmatchConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Comparison defaults.
    pub compare: CompareConfig,
    /// How long uploads and jobs are kept.
    pub retention: RetentionConfig,
    /// Log settings.
    pub logging: LoggingConfig,
}

/// HTTP server settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Largest accepted request body.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Comparison defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// File 1 rows per progress step.
    pub chunk_size: usize,
    /// Zero-based header row.
    pub header_row: usize,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            header_row: 0,
        }
    }
}

/// Retention of in-memory uploads and jobs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Seconds an upload is kept.
    pub upload_ttl_secs: u64,
    /// Seconds a job (and its report) is kept.
    pub job_ttl_secs: u64,
    /// Seconds between eviction sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            upload_ttl_secs: 3600,
            job_ttl_secs: 3600,
            sweep_interval_secs: 60,
        }
    }
}

impl RetentionConfig {
    /// Upload TTL.
    pub fn upload_ttl(&self) -> Duration {
        Duration::from_secs(self.upload_ttl_secs)
    }

    /// Job TTL.
    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(self.job_ttl_secs)
    }

    /// Sweep interval, never shorter than one second.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Log settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,sheetmatch=debug".to_string(),
        }
    }
}

impl SheetmatchConfig {
    /// Default config file location for this platform.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(PROJECT_NAME).join("config.toml"))
    }

    /// Resolve the config file path from an explicit path, the environment,
    /// or the platform default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        Self::default_config_path()
    }

    /// Load the configuration and apply environment overrides.
    ///
    /// A missing file yields the defaults; an explicit path that does not
    /// exist is an error.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit) {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) if explicit.is_some() => {
                return Err(Error::config(format!(
                    "Config file does not exist at {}",
                    path.display()
                )));
            }
            _ => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        toml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Apply `SHEETMATCH_HOST` and `SHEETMATCH_PORT`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var(HOST_ENV) {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var(PORT_ENV) {
            self.server.port = port
                .parse()
                .map_err(|_| Error::config(format!("{PORT_ENV} is not a valid port: {port}")))?;
        }
        Ok(())
    }

    /// Check values that would make the service unusable.
    pub fn validate(&self) -> Result<()> {
        if self.compare.chunk_size == 0 {
            return Err(Error::config("compare.chunk_size must be at least 1"));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(Error::config("server.max_upload_bytes must be positive"));
        }
        Ok(())
    }

    /// Serialize as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }
}
