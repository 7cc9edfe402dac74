//! Configuration resolution for icewatch-client
//!
//! **Priority:** command line → environment → TOML → compiled defaults.
//! The API base URL has no compiled default; it must come from one of the
//! first three tiers. It is resolved once at startup and never changes.

use icewatch_common::config::{resolve_setting, TomlConfig};
use icewatch_common::{Error, Result};
use std::time::Duration;
use tracing::info;

use crate::services::backend_client::DEFAULT_REQUEST_TIMEOUT;
use crate::services::position_provider::DEFAULT_FIX_TIMEOUT;

/// Environment variables consulted for the API URL, in order
pub const API_URL_ENV_VARS: [&str; 2] = ["ICEWATCH_API_URL", "API_URL"];

/// Environment variable for the reporter device id
pub const DEVICE_ID_ENV_VAR: &str = "ICEWATCH_DEVICE_ID";

/// Command-line overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub device_id: Option<String>,
}

/// Resolved, immutable client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Backend base URL without trailing slash
    pub api_url: String,
    pub device_id: String,
    pub request_timeout: Duration,
    pub fix_timeout: Duration,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the URL
    pub fn new(api_url: &str) -> Result<Self> {
        Ok(Self {
            api_url: normalize_api_url(api_url)?,
            device_id: icewatch_common::uuid_utils::generate_device_id(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            fix_timeout: DEFAULT_FIX_TIMEOUT,
        })
    }

    /// Resolve from overrides, environment and an already-loaded TOML config
    pub fn from_sources(overrides: &ConfigOverrides, toml_config: &TomlConfig) -> Result<Self> {
        let (raw_url, source) = resolve_setting(
            overrides.api_url.as_deref(),
            &API_URL_ENV_VARS,
            toml_config.api_url.as_deref(),
        )
        .ok_or_else(|| {
            Error::Config(
                "API URL not configured. Provide one of:\n\
                 1. Command line: --api-url https://your-backend\n\
                 2. Environment: ICEWATCH_API_URL or API_URL\n\
                 3. TOML config: ~/.config/icewatch/config.toml (api_url = \"https://your-backend\")"
                    .to_string(),
            )
        })?;

        let mut config = Self::new(&raw_url)?;
        info!(api_url = %config.api_url, source = %source, "API URL resolved");

        if let Some((device_id, source)) = resolve_setting(
            overrides.device_id.as_deref(),
            &[DEVICE_ID_ENV_VAR],
            toml_config.device_id.as_deref(),
        ) {
            info!(source = %source, "Device id configured");
            config.device_id = device_id;
        }

        if let Some(secs) = toml_config.request_timeout_secs {
            config.request_timeout = positive_secs(secs, "request_timeout_secs")?;
        }
        if let Some(secs) = toml_config.fix_timeout_secs {
            config.fix_timeout = positive_secs(secs, "fix_timeout_secs")?;
        }

        Ok(config)
    }
}

/// Validate an http(s) base URL and strip any trailing slash
pub fn normalize_api_url(raw: &str) -> Result<String> {
    let url = reqwest::Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("Invalid API URL '{}': {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "API URL must use http or https, got '{}'",
            url.scheme()
        )));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn positive_secs(secs: u64, key: &str) -> Result<Duration> {
    if secs == 0 {
        return Err(Error::Config(format!("{} must be greater than zero", key)));
    }
    Ok(Duration::from_secs(secs))
}
