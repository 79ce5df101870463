//! Application facade
//!
//! [`ClimateAnalyzer`] holds the loaded data set and the latest anomaly table
//! and exposes the whole-table operations used by the command line.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use arrow::datatypes::FieldRef;
use arrow::record_batch::RecordBatch;
use rayon::prelude::*;
use serde_arrow::schema::{SchemaLike, TracingOptions};
use serde_json::Value;

use crate::analysis::anomaly::AnomalyDetector;
use crate::analysis::base::AnalyzerRegistry;
use crate::analysis::quality::{
    DEFAULT_STATION_COLUMN, DEFAULT_TIMESTAMP_COLUMN, DataQualityReport, quality_report,
};
use crate::analysis::trend::{MIN_TREND_POINTS, TrendAnalyzer, TrendResult};
use crate::config::AnalyzerConfig;
use crate::error::{ClimateError, Result};
use crate::export::ExporterFactory;
use crate::types::{AnalysisResult, AnomalyRow};
use crate::utils::arrow::{column_values, indexed_values, numeric_columns};
use crate::utils::io::read_table;
use crate::utils::parallel::get_optimal_workers;

/// Default z-score threshold of [`ClimateAnalyzer::detect_anomalies`]
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 2.0;

/// Entry point for whole-table analysis
#[derive(Debug)]
pub struct ClimateAnalyzer {
    config: AnalyzerConfig,
    registry: AnalyzerRegistry,
    data: Option<RecordBatch>,
    anomaly_rows: Vec<AnomalyRow>,
    anomalies: Option<RecordBatch>,
}

impl ClimateAnalyzer {
    #[must_use]
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            registry: AnalyzerRegistry::with_defaults(),
            data: None,
            anomaly_rows: Vec::new(),
            anomalies: None,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// The loaded data set
    #[must_use]
    pub const fn data(&self) -> Option<&RecordBatch> {
        self.data.as_ref()
    }

    /// Anomaly table of the last [`Self::detect_anomalies`] call
    #[must_use]
    pub const fn anomalies(&self) -> Option<&RecordBatch> {
        self.anomalies.as_ref()
    }

    /// Rows of the last anomaly table
    #[must_use]
    pub fn anomaly_rows(&self) -> &[AnomalyRow] {
        &self.anomaly_rows
    }

    fn loaded(&self) -> Result<&RecordBatch> {
        self.data.as_ref().ok_or_else(|| ClimateError::NoData.into())
    }

    /// Load a `.csv` or `.parquet` file, replacing any previous data
    pub fn load_data(&mut self, path: impl AsRef<Path>) -> Result<&RecordBatch> {
        let path = path.as_ref();
        log::info!("Loading data from {}", path.display());
        let batch = read_table(path)?;
        log::info!("Loaded {} records", batch.num_rows());
        self.clear_anomalies();
        Ok(self.data.insert(batch))
    }

    /// Use an in-memory batch as the data set
    pub fn set_data(&mut self, batch: RecordBatch) {
        self.clear_anomalies();
        self.data = Some(batch);
    }

    fn clear_anomalies(&mut self) {
        self.anomaly_rows.clear();
        self.anomalies = None;
    }

    /// Trend of every numeric column with enough values
    pub fn analyze_trends(&self) -> Result<BTreeMap<String, TrendResult>> {
        let data = self.loaded()?;
        log::info!("Analyzing climate trends...");
        let analyzer = TrendAnalyzer::new(self.config.significance_level)?;

        let workers = self.config.max_workers.unwrap_or_else(get_optimal_workers);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .context("Failed to build worker pool")?;
        log::debug!("Using parallel processing with {workers} threads");

        let columns = numeric_columns(data);
        let trends = pool.install(|| {
            columns
                .par_iter()
                .map(|name| -> Result<Option<(String, TrendResult)>> {
                    let values = column_values(data, name)?;
                    if values.len() < MIN_TREND_POINTS {
                        log::debug!("Skipping '{name}': only {} values", values.len());
                        return Ok(None);
                    }
                    Ok(Some((name.clone(), analyzer.analyze(&values)?)))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        Ok(trends.into_iter().flatten().collect())
    }

    /// Z-score anomalies over all numeric columns
    ///
    /// Returns a batch with columns `column, index, value, score, method`,
    /// where `index` is the row position in the loaded data.
    pub fn detect_anomalies(&mut self, threshold: f64) -> Result<&RecordBatch> {
        let data = self.loaded()?;
        log::info!("Detecting anomalies with threshold {threshold}");
        let detector = AnomalyDetector::new(self.config.contamination)?;

        let mut rows = Vec::new();
        for name in numeric_columns(data) {
            let indexed = indexed_values(data, &name)?;
            let values: Vec<f64> = indexed.iter().map(|(_, v)| *v).collect();
            rows.extend(
                detector
                    .detect_zscore(&values, threshold)
                    .into_iter()
                    .map(|anomaly| AnomalyRow {
                        column: name.clone(),
                        index: indexed[anomaly.index].0 as u64,
                        value: anomaly.value,
                        score: anomaly.score,
                        method: anomaly.method,
                    }),
            );
        }
        log::info!("Found {} anomalies", rows.len());

        let fields = Vec::<FieldRef>::from_type::<AnomalyRow>(TracingOptions::default())
            .map_err(|e| anyhow::anyhow!("Schema generation error: {e}"))?;
        let batch = serde_arrow::to_record_batch(&fields, &rows)
            .map_err(|e| anyhow::anyhow!("Serialization error: {e}"))?;
        self.anomaly_rows = rows;
        Ok(self.anomalies.insert(batch))
    }

    /// Quality report of the loaded data
    pub fn quality_report(&self) -> Result<DataQualityReport> {
        quality_report(
            self.loaded()?,
            DEFAULT_TIMESTAMP_COLUMN,
            DEFAULT_STATION_COLUMN,
        )
    }

    /// Run a registered analyzer over the loaded data
    ///
    /// Statistical settings missing from `params` are taken from the configuration.
    pub fn run_analyzer(&self, name: &str, params: &Value) -> Result<AnalysisResult> {
        let data = self.loaded()?;
        let params = self.with_config_defaults(params);
        self.registry.get(name, &params)?.run(data)
    }

    fn with_config_defaults(&self, params: &Value) -> Value {
        let mut params = params.clone();
        if let Value::Object(map) = &mut params {
            let defaults = [
                ("significance_level", self.config.significance_level),
                ("contamination", self.config.contamination),
                ("iqr_multiplier", self.config.iqr_multiplier),
                ("zscore_threshold", self.config.zscore_threshold),
            ];
            for (key, value) in defaults {
                map.entry(key).or_insert_with(|| Value::from(value));
            }
        }
        params
    }

    /// Names of the registered analyzers
    #[must_use]
    pub fn analyzers(&self) -> Vec<String> {
        self.registry.list_analyzers()
    }

    /// Export the anomaly table, or the loaded data when there is none
    pub fn export_results(&self, name: &str, format: &str) -> Result<PathBuf> {
        let batch = match &self.anomalies {
            Some(anomalies) => anomalies,
            None => self.loaded()?,
        };
        log::info!(
            "Exporting results to {}",
            self.config.output_dir.display()
        );
        ExporterFactory::create(format, &self.config.output_dir)?.export(batch, name)
    }
}

/// Analyzer with configuration from the environment, optionally overriding the data directory
pub fn create_app(data_dir: Option<PathBuf>) -> Result<ClimateAnalyzer> {
    let mut config = AnalyzerConfig::from_env()?;
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    config.validate()?;
    Ok(ClimateAnalyzer::new(config))
}
