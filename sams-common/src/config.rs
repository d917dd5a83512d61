//! Bootstrap configuration loading
//!
//! Two-tier configuration:
//! 1. **Bootstrap** (this module): port, database path, logging. Static, read once at startup.
//! 2. **Runtime** (`settings` table): recognition threshold and session slots, see
//!    [`crate::db::settings`].
//!
//! Bootstrap priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (handled by the binary's argument parser)
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is not an error: a warning is logged and defaults apply.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable that overrides the config file location
pub const CONFIG_PATH_ENV: &str = "SAMS_CONFIG";

/// Default HTTP port for sams-server
pub const DEFAULT_PORT: u16 = 5790;

/// Database file name inside the data folder
pub const DATABASE_FILE_NAME: &str = "sams.db";

/// Bootstrap configuration as read from TOML
///
/// Every field is optional so that a partial file only overrides what it names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Path to SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub port: u16,
    pub database_path: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_path: default_data_folder().join(DATABASE_FILE_NAME),
            log_level: default_log_level(),
        }
    }
}

/// Get OS-dependent default data folder
fn default_data_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/sams (or /var/lib/sams for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("sams"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/sams"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("sams"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/sams"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("sams"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\sams"))
    } else {
        PathBuf::from("./sams_data")
    }
}

/// Resolve the config file location
///
/// `SAMS_CONFIG` wins over the platform config directory (`<config_dir>/sams/config.toml`).
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir().map(|d| d.join("sams").join("config.toml"))
}

/// Load TOML config from `path`
///
/// Returns `Ok(None)` when the file does not exist. A file that exists but
/// does not parse is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<Option<TomlConfig>> {
    if !path.exists() {
        warn!("Config file not found at {}, using defaults", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str::<TomlConfig>(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))?;

    info!("Loaded config file: {}", path.display());
    Ok(Some(config))
}

/// Fully resolved bootstrap configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub port: u16,
    pub database_path: PathBuf,
    pub log_level: String,
}

impl BootstrapConfig {
    /// Merge command-line/env overrides, TOML values and compiled defaults
    pub fn resolve(
        port: Option<u16>,
        database_path: Option<PathBuf>,
        toml: Option<TomlConfig>,
    ) -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        let toml = toml.unwrap_or_default();

        Self {
            port: port.or(toml.port).unwrap_or(defaults.port),
            database_path: database_path
                .or(toml.database_path)
                .unwrap_or(defaults.database_path),
            log_level: toml.logging.level,
        }
    }
}
