//! Configuration loading and management.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("[storage] {0} must be an absolute path")]
    RelativePath(&'static str),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity.
    pub server: ServerConfig,
    /// Network listen configuration.
    pub listen: ListenConfig,
    /// Optional TLS configuration. When present the listener is TLS-only.
    pub tls: Option<TlsConfig>,
    /// Message of the Day configuration.
    #[serde(default)]
    pub motd: MotdConfig,
    /// Chat log and room state directories.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name, used as the prefix of every server-originated reply.
    pub hostname: String,
}

/// Network listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind to (e.g., "0.0.0.0:6667").
    pub address: SocketAddr,
}

/// TLS listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    /// Path to certificate chain file (PEM format).
    pub cert_path: PathBuf,
    /// Path to PKCS#8 private key file (PEM format).
    pub key_path: PathBuf,
}

/// Message of the Day (MOTD) configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MotdConfig {
    /// Path to the MOTD file. Re-read on every MOTD request; absent or
    /// unreadable files yield `422`.
    pub file: Option<PathBuf>,
}

/// Persistence directories.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    /// Absolute path to the per-room chat log directory.
    pub logdir: Option<PathBuf>,
    /// Absolute path to the per-room state directory.
    pub statedir: Option<PathBuf>,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(logdir) = &self.storage.logdir {
            if !logdir.is_absolute() {
                return Err(ConfigError::RelativePath("logdir"));
            }
        }
        if let Some(statedir) = &self.storage.statedir {
            if !statedir.is_absolute() {
                return Err(ConfigError::RelativePath("statedir"));
            }
        }
        Ok(())
    }
}
