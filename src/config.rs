//! Service configuration.
//!
//! Loaded from a TOML file (`soilmon.toml` by default), then overridden by
//! environment variables. A `.env` file in the working directory is read
//! first, so secrets can stay out of the TOML file:
//!
//! | Env Var          | Overrides             |
//! |------------------|-----------------------|
//! | `DATABASE_URL`   | `[database] url`      |
//! | `AEMET_API_KEY`  | `[aemet] api_key`     |
//!
//! Every field has a default, so an empty file (or no file) is valid.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::alert::thresholds::AdvisoryThresholds;
use crate::ingest::aemet::AEMET_BASE_URL;

pub const DEFAULT_CONFIG_FILE: &str = "soilmon.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No AEMET API key: set AEMET_API_KEY, [aemet] api_key or [aemet] api_key_path")]
    MissingApiKey,

    #[error("No database configured: set DATABASE_URL or [database] url")]
    MissingDatabaseUrl,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AemetConfig {
    pub api_key: Option<String>,
    /// File holding the API key, as downloaded from the AEMET portal.
    pub api_key_path: Option<PathBuf>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for AemetConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_path: None,
            base_url: AEMET_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl AemetConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Where real-time station observations come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Deterministic built-in data, no network.
    #[default]
    Fixture,
    /// Live AEMET OpenData API.
    Aemet,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoricalConfig {
    /// Statistic used as the monthly humidity reference.
    pub parameter_code: String,
    pub reference_year: i32,
}

impl Default for HistoricalConfig {
    fn default() -> Self {
        Self {
            parameter_code: "AD25mm_Provincias".to_string(),
            reference_year: 2020,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. "info" or "soilmon_service=debug".
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub aemet: AemetConfig,
    pub provider: ProviderConfig,
    pub historical: HistoricalConfig,
    pub thresholds: AdvisoryThresholds,
    pub logging: LoggingConfig,
}

impl Config {
    /// Parses and validates a TOML document. No environment overrides.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, or `soilmon.toml` if it exists, or the defaults; then
    /// applies `.env` and environment overrides.
    ///
    /// An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        let chosen = match path {
            Some(p) => Some(p),
            None if default_path.exists() => Some(default_path),
            None => None,
        };

        let mut config = match chosen {
            Some(p) => {
                let content = fs::read_to_string(p).map_err(|source| ConfigError::Read {
                    path: p.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&content)?
            }
            None => Config::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides from a key lookup. Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_blank("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(key) = non_blank("AEMET_API_KEY") {
            self.aemet.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds.validate().map_err(ConfigError::Invalid)?;
        if self.aemet.timeout_secs == 0 {
            return Err(ConfigError::Invalid("aemet.timeout_secs must be positive".into()));
        }
        if self.historical.parameter_code.trim().is_empty() {
            return Err(ConfigError::Invalid("historical.parameter_code is empty".into()));
        }
        Ok(())
    }

    /// The AEMET API key: inline value first, then the key file.
    pub fn aemet_api_key(&self) -> Result<String, ConfigError> {
        if let Some(key) = self.aemet.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }
        if let Some(path) = &self.aemet.api_key_path {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let key = content.trim();
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }
        Err(ConfigError::MissingApiKey)
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)
    }
}
