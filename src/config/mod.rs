//! Configuration for the analyzer.

pub mod secrets;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::analysis::anomaly::{
    DEFAULT_CONTAMINATION, DEFAULT_IQR_MULTIPLIER, DEFAULT_ZSCORE_THRESHOLD,
};
use crate::analysis::trend::DEFAULT_SIGNIFICANCE_LEVEL;
use crate::error::{ClimateError, Result};
use crate::pipeline::adapters::noaa::DEFAULT_BASE_URL;

pub use secrets::SecretsManager;

/// Configuration for the analyzer
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Directory input files are read from
    pub data_dir: PathBuf,
    /// Directory exports are written to
    pub output_dir: PathBuf,
    /// Default `env_logger` filter
    pub log_level: String,
    /// NOAA CDO API token
    pub api_key: Option<String>,
    /// Connection string of a results database
    pub database_url: Option<String>,
    /// Connection string of a cache
    pub redis_url: Option<String>,
    /// Root of the NOAA CDO v2 API
    pub noaa_base_url: String,
    /// Significance level of trend tests
    pub significance_level: f64,
    /// Expected anomaly share for the isolation forest
    pub contamination: f64,
    /// IQR fence multiplier
    pub iqr_multiplier: f64,
    /// Z-score cut-off
    pub zscore_threshold: f64,
    /// Worker threads for parallel jobs (all CPUs, capped, when unset)
    pub max_workers: Option<usize>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            log_level: "info".to_string(),
            api_key: None,
            database_url: None,
            redis_url: None,
            noaa_base_url: DEFAULT_BASE_URL.to_string(),
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
            contamination: DEFAULT_CONTAMINATION,
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
            zscore_threshold: DEFAULT_ZSCORE_THRESHOLD,
            max_workers: None,
        }
    }
}

impl AnalyzerConfig {
    /// Configuration from the process environment and the default secrets file
    pub fn from_env() -> Result<Self> {
        let secrets = SecretsManager::new(None)?;
        Ok(Self::from_vars(std::env::vars(), &secrets))
    }

    /// Configuration from explicit variables; secrets fill in missing keys
    ///
    /// `API_KEY` falls back to the `API_KEY` or `NOAA_TOKEN` secret.
    pub fn from_vars<I>(vars: I, secrets: &SecretsManager) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: BTreeMap<String, String> = vars.into_iter().collect();
        let var = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();
        let defaults = Self::default();

        Self {
            data_dir: var("CLIMATE_DATA_DIR").map_or(defaults.data_dir, PathBuf::from),
            output_dir: var("CLIMATE_OUTPUT_DIR").map_or(defaults.output_dir, PathBuf::from),
            log_level: var("LOG_LEVEL").unwrap_or(defaults.log_level),
            api_key: var("API_KEY").or_else(|| {
                secrets
                    .get("API_KEY")
                    .or_else(|| secrets.get("NOAA_TOKEN"))
                    .map(str::to_string)
            }),
            database_url: var("DATABASE_URL")
                .or_else(|| secrets.get("DATABASE_URL").map(str::to_string)),
            redis_url: var("REDIS_URL").or_else(|| secrets.get("REDIS_URL").map(str::to_string)),
            noaa_base_url: var("NOAA_BASE_URL").unwrap_or(defaults.noaa_base_url),
            max_workers: var("MAX_WORKERS").and_then(|v| v.parse().ok()),
            ..defaults
        }
    }

    /// Reject statistical parameters outside their valid ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(ClimateError::invalid_parameter(
                "significance_level",
                format!("must be in (0, 1), got {}", self.significance_level),
            )
            .into());
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(ClimateError::invalid_parameter(
                "contamination",
                format!("must be in (0, 0.5], got {}", self.contamination),
            )
            .into());
        }
        if !(self.iqr_multiplier > 0.0) {
            return Err(ClimateError::invalid_parameter(
                "iqr_multiplier",
                format!("must be positive, got {}", self.iqr_multiplier),
            )
            .into());
        }
        if !(self.zscore_threshold > 0.0) {
            return Err(ClimateError::invalid_parameter(
                "zscore_threshold",
                format!("must be positive, got {}", self.zscore_threshold),
            )
            .into());
        }
        if self.max_workers == Some(0) {
            return Err(ClimateError::invalid_parameter("max_workers", "must be at least 1").into());
        }
        Ok(())
    }
}
