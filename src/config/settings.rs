//! Application settings loaded from `config.toml` and the environment.
//!
//! Non-secret settings live in the TOML file and every field has a default, so a
//! missing file is not an error. Secrets (JWT signing secret, payment API key) are
//! only ever read from the environment.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Root of `config.toml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// HTTP listener settings
    pub server: ServerSettings,
    /// Payment gateway settings
    pub payments: PaymentSettings,
    /// Bearer token validation settings
    pub auth: AuthSettings,
}

/// `[server]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address to bind, e.g. `"0.0.0.0:8080"`
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// `[payments]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentSettings {
    /// Base URL of the gateway REST API
    pub api_base: String,
    /// ISO currency code for all charges
    pub currency: String,
    /// Country used when opening seller accounts
    pub country: String,
    /// Public URL of the web app, used to build redirect URLs
    pub site_url: String,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.stripe.com".to_string(),
            currency: "eur".to_string(),
            country: "FR".to_string(),
            site_url: "http://localhost:5173".to_string(),
        }
    }
}

/// `[auth]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Expected `aud` claim of access tokens
    pub jwt_audience: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_audience: "authenticated".to_string(),
        }
    }
}

/// Parses settings from TOML text.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads settings from a TOML file.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!(path = %path.display(), "No config file found, using defaults");
        return Ok(Settings::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;
    parse_settings(&contents)
}

/// Loads settings from `CONFIG_PATH`, or `./config.toml` when unset.
pub fn load_default_settings() -> Result<Settings> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_settings(path)
}

/// Reads a required secret from the environment.
pub fn require_secret(name: &str) -> Result<String> {
    std::env::var(name)
        .inspect_err(|e| tracing::error!("{name} not available: {e}"))
        .map_err(Error::EnvVar)
}
