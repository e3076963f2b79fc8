//! Configuration loading for scan-relay.
//!
//! Configuration is loaded from a TOML file (default: `relay.toml`). Every
//! section and every field is optional.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on record lifetime: 24 hours.
pub const MAX_TTL_SECS: u64 = 24 * 60 * 60;

/// Root configuration for scan-relay.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Relay behavior.
    pub relay: RelayConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Rate limiting configuration.
    pub limits: LimitsConfig,
    /// Cleanup task configuration.
    pub cleanup: CleanupConfig,
    /// Name lookup configuration.
    pub lookup: LookupConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for the HTTP server (default: 0.0.0.0:8080).
    pub bind_address: String,
}

/// Relay behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Record lifetime in seconds (default and maximum: 24 hours).
    pub ttl_secs: u64,
    /// Whether a pull without an explicit `ack` consumes the code (default: true).
    pub consume_by_default: bool,
    /// Whether a successful submit echoes the accepted code (default: true).
    pub echo_code: bool,
    /// Sweep expired records before every submit (default: true).
    pub sweep_on_submit: bool,
}

/// Which record store backs the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local map. Records are lost on restart.
    Memory,
    /// SQLite database file.
    Sqlite,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend (default: memory).
    pub backend: StorageBackend,
    /// Path to SQLite database file, used by the sqlite backend.
    pub database: PathBuf,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum submits per client IP per minute (default: 30).
    pub submits_per_minute: u32,
    /// Maximum pulls per client IP per minute (default: 240).
    ///
    /// Pollers typically ask every few hundred milliseconds.
    pub pulls_per_minute: u32,
    /// Maximum requests per second across all clients (default: 1000).
    pub global_requests_per_second: u32,
}

/// Cleanup task configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Cleanup interval in seconds (default: 300).
    pub interval_secs: u64,
    /// Enable cleanup task (default: true).
    pub enabled: bool,
}

/// Name lookup configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// CSV file of `id,name` rows. Lookups always miss when unset.
    pub ids_file: Option<PathBuf>,
}

// Default value functions
fn default_http_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_ttl() -> u64 {
    MAX_TTL_SECS
}

fn default_database_path() -> PathBuf {
    PathBuf::from("relay.db")
}

fn default_submits_per_minute() -> u32 {
    30
}

fn default_pulls_per_minute() -> u32 {
    240
}

fn default_global_requests_per_second() -> u32 {
    1000
}

fn default_cleanup_interval() -> u64 {
    300 // 5 minutes
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_http_bind(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            consume_by_default: true,
            echo_code: true,
            sweep_on_submit: true,
        }
    }
}

impl RelayConfig {
    /// Record lifetime as a `Duration`.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            database: default_database_path(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            submits_per_minute: default_submits_per_minute(),
            pulls_per_minute: default_pulls_per_minute(),
            global_requests_per_second: default_global_requests_per_second(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_cleanup_interval(),
            enabled: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails
    /// [`Config::validate`].
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the relay cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relay.ttl_secs == 0 || self.relay.ttl_secs > MAX_TTL_SECS {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "relay.ttl_secs must be between 1 and {MAX_TTL_SECS}, got {}",
                    self.relay.ttl_secs
                ),
            });
        }

        let quotas = [
            ("limits.submits_per_minute", self.limits.submits_per_minute),
            ("limits.pulls_per_minute", self.limits.pulls_per_minute),
            (
                "limits.global_requests_per_second",
                self.limits.global_requests_per_second,
            ),
        ];
        if let Some((name, _)) = quotas.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid {
                reason: format!("{name} must be > 0"),
            });
        }

        if self.cleanup.enabled && self.cleanup.interval_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "cleanup.interval_secs must be > 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Configuration parsed but is unusable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}
