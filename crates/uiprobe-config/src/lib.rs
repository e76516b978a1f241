// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and environment overrides for the
//! uiprobe daemon.
//!
//! Provides [`DaemonConfig`] — the daemon's runtime settings — with TOML
//! loading, `UIPROBE_*` environment overrides, and a validation pass that
//! separates hard errors from advisory [`ConfigWarning`]s.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// The start-up scripts directory does not exist.
    StartupDirMissing {
        /// The configured directory.
        dir: PathBuf,
    },
    /// The daemon is configured to bind a privileged port.
    PrivilegedPort {
        /// The configured port.
        port: u16,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::StartupDirMissing { dir } => {
                write!(
                    f,
                    "start-up scripts directory '{}' does not exist",
                    dir.display()
                )
            }
            ConfigWarning::PrivilegedPort { port } => {
                write!(f, "port {port} requires elevated privileges to bind")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Default bind address.
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8089;

/// Default start-up scripts directory.
pub const DEFAULT_STARTUP_DIR: &str = "/etc/uiprobe/startup";

/// Recognised log levels.
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Top-level runtime configuration for the uiprobe daemon.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Listener settings.
    pub connection: ConnectionConfig,

    /// Start-up script settings.
    pub startup: StartupConfig,

    /// Log level override (e.g. `"debug"`, `"info"`, `"warn"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            startup: StartupConfig::default(),
            log_level: Some("info".into()),
        }
    }
}

/// Listener settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Bind address.
    pub address: String,
    /// Listening port.
    pub port: u16,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.into(),
            port: DEFAULT_PORT,
        }
    }
}

impl ConnectionConfig {
    /// The `address:port` string handed to the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Start-up script settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct StartupConfig {
    /// Directory whose regular files run, in sorted order, before the
    /// listener binds.
    pub scripts_dir: PathBuf,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            scripts_dir: PathBuf::from(DEFAULT_STARTUP_DIR),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`DaemonConfig`] from an optional TOML file path.
///
/// With `None`, returns the defaults.  Environment overrides are applied on
/// top in both cases.
///
/// # Errors
///
/// [`ConfigError::FileNotFound`] or [`ConfigError::ParseError`].
pub fn load_config(path: Option<&Path>) -> Result<DaemonConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => DaemonConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into a [`DaemonConfig`].
///
/// # Errors
///
/// [`ConfigError::ParseError`] on malformed TOML.
pub fn parse_toml(content: &str) -> Result<DaemonConfig, ConfigError> {
    toml::from_str::<DaemonConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides.
///
/// Recognised variables:
/// - `UIPROBE_ADDRESS`
/// - `UIPROBE_PORT` (ignored when not a valid port number)
/// - `UIPROBE_LOG_LEVEL`
/// - `UIPROBE_STARTUP_DIR`
pub fn apply_env_overrides(config: &mut DaemonConfig) {
    if let Ok(val) = std::env::var("UIPROBE_ADDRESS") {
        config.connection.address = val;
    }
    if let Ok(val) = std::env::var("UIPROBE_PORT")
        && let Ok(port) = val.parse::<u16>()
    {
        config.connection.port = port;
    }
    if let Ok(val) = std::env::var("UIPROBE_LOG_LEVEL") {
        config.log_level = Some(val);
    }
    if let Ok(val) = std::env::var("UIPROBE_STARTUP_DIR") {
        config.startup.scripts_dir = PathBuf::from(val);
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (bad log level, empty address, port zero) are returned as a
/// [`ConfigError::ValidationError`]; soft issues come back as warnings.
///
/// # Errors
///
/// [`ConfigError::ValidationError`] listing every hard problem found.
pub fn validate_config(config: &DaemonConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if let Some(ref level) = config.log_level
        && !VALID_LOG_LEVELS.contains(&level.as_str())
    {
        errors.push(format!("invalid log_level '{level}'"));
    }

    if config.connection.address.is_empty() {
        errors.push("connection.address must not be empty".into());
    }

    if config.connection.port == 0 {
        errors.push("connection.port must not be zero".into());
    } else if config.connection.port < 1024 {
        warnings.push(ConfigWarning::PrivilegedPort {
            port: config.connection.port,
        });
    }

    if !config.startup.scripts_dir.is_dir() {
        warnings.push(ConfigWarning::StartupDirMissing {
            dir: config.startup.scripts_dir.clone(),
        });
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}
