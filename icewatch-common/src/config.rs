//! TOML configuration loading and setting source resolution
//!
//! Settings are resolved with the following priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback, where one exists)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory name used under the platform config directory
pub const CONFIG_DIR_NAME: &str = "icewatch";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; a missing file or missing field falls back to
/// environment variables and compiled defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TomlConfig {
    /// Backend base URL (e.g. `https://api.example.org`)
    #[serde(default)]
    pub api_url: Option<String>,

    /// Reporter device identifier sent with each submission
    #[serde(default)]
    pub device_id: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Position fix timeout in seconds
    #[serde(default)]
    pub fix_timeout_secs: Option<u64>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
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

/// Where a resolved setting came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment(String),
    TomlFile,
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::CommandLine => write!(f, "command line"),
            ConfigSource::Environment(name) => write!(f, "environment ({})", name),
            ConfigSource::TomlFile => write!(f, "TOML config"),
            ConfigSource::Default => write!(f, "compiled default"),
        }
    }
}

/// Resolve a string setting from CLI → ENV → TOML
///
/// Environment variables are tried in the order given. Blank values are
/// treated as absent at every tier.
pub fn resolve_setting(
    cli_arg: Option<&str>,
    env_var_names: &[&str],
    toml_value: Option<&str>,
) -> Option<(String, ConfigSource)> {
    if let Some(value) = cli_arg.filter(|v| !v.trim().is_empty()) {
        return Some((value.trim().to_string(), ConfigSource::CommandLine));
    }

    for name in env_var_names {
        if let Ok(value) = std::env::var(name) {
            if !value.trim().is_empty() {
                return Some((
                    value.trim().to_string(),
                    ConfigSource::Environment(name.to_string()),
                ));
            }
        }
    }

    toml_value
        .filter(|v| !v.trim().is_empty())
        .map(|v| (v.trim().to_string(), ConfigSource::TomlFile))
}

/// Candidate config file locations for the current platform, in lookup order
pub fn config_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    }

    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    }

    candidates
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the config file from an explicit path, or the first platform default that exists
///
/// A missing file is not an error: defaults apply. A file that exists but
/// cannot be parsed is an error, so a typo does not silently discard settings.
pub fn load_config_or_default(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        return load_toml_config(path);
    }

    for candidate in config_file_candidates() {
        if candidate.exists() {
            debug!(path = %candidate.display(), "Loading TOML config");
            return load_toml_config(&candidate);
        }
    }

    warn!("No config file found, using environment and defaults");
    Ok(TomlConfig::default())
}
