//! Configuration Management Module
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `BEST_AIR__*` environment variables (`BEST_AIR__MODEL__START_YEAR=2025`).

use crate::error::{RegistryError, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "BEST_AIR";

/// Config file picked up from the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "best-air.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub registry: RegistryConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
}

/// Where tables come from and when they load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Directory holding `tables/<name>.csv`; bundled copies when unset
    pub tables_dir: Option<PathBuf>,
    /// Use the bundled copy of a table missing from `tables_dir`
    pub fallback_to_bundled: bool,
    /// Load every built-in table at construction
    pub preload: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            tables_dir: None,
            fallback_to_bundled: true,
            preload: false,
        }
    }
}

/// Analysis parameters used by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub start_year: i32,
    pub end_year: i32,
    pub discount_rate: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            start_year: 2020,
            end_year: 2050,
            discount_rate: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration
    ///
    /// An explicit `path` must exist; otherwise [`DEFAULT_CONFIG_FILE`] is
    /// read if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(RegistryError::Config(format!(
                        "config file '{}' does not exist",
                        p.display()
                    )));
                }
                File::new(&p.to_string_lossy(), FileFormat::Toml)
            }
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
        };

        let config: AppConfig = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.model.validate()
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.start_year > self.end_year {
            return Err(RegistryError::Config(format!(
                "start_year {} is after end_year {}",
                self.start_year, self.end_year
            )));
        }
        if !self.discount_rate.is_finite() || self.discount_rate <= -1.0 {
            return Err(RegistryError::Config(format!(
                "invalid discount_rate {}",
                self.discount_rate
            )));
        }
        Ok(())
    }
}
