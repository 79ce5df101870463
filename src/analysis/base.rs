//! Analyzer abstraction and registry
//!
//! Every analysis that runs over a whole batch implements [`Analyzer`]. The
//! [`AnalyzerRegistry`] maps names to factories so that analyzers can be
//! selected at runtime (for example from the command line).

use std::collections::BTreeMap;

use arrow::datatypes::FieldRef;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use serde_arrow::schema::{SchemaLike, TracingOptions};
use serde_json::{Value, json};

use crate::analysis::anomaly::{
    AnomalyDetector, DEFAULT_CONTAMINATION, DEFAULT_IQR_MULTIPLIER, DEFAULT_ZSCORE_THRESHOLD,
};
use crate::analysis::quality::{DEFAULT_STATION_COLUMN, DEFAULT_TIMESTAMP_COLUMN, quality_report};
use crate::analysis::trend::{DEFAULT_SIGNIFICANCE_LEVEL, TrendAnalyzer};
use crate::error::{ClimateError, Result};
use crate::types::AnalysisResult;
use crate::utils::arrow::{indexed_values, is_numeric};

/// An analysis over a record batch
pub trait Analyzer: Send + Sync {
    /// Registry name of the analyzer
    fn name(&self) -> &str;

    /// Perform the analysis; assumes the input already passed validation
    fn analyze(&self, batch: &RecordBatch) -> Result<AnalysisResult>;

    /// Check that the batch has what the analysis needs
    fn validate_input(&self, batch: &RecordBatch) -> bool;

    /// Validate then analyze
    fn run(&self, batch: &RecordBatch) -> Result<AnalysisResult> {
        log::info!("Running {} analysis", self.name());
        if !self.validate_input(batch) {
            return Err(ClimateError::InvalidInput {
                analyzer: self.name().to_string(),
            }
            .into());
        }
        self.analyze(batch)
    }
}

/// Row of [`AnalyzerRunner::to_record_batch`] with JSON-encoded payloads
#[derive(Debug, Serialize, Deserialize)]
struct ResultRow {
    analyzer: String,
    timestamp: String,
    parameters: String,
    metrics: String,
    data: Option<String>,
}

/// Holds an analyzer together with its most recent result
pub struct AnalyzerRunner {
    analyzer: Box<dyn Analyzer>,
    results: Option<AnalysisResult>,
}

impl AnalyzerRunner {
    /// Wrap an analyzer
    #[must_use]
    pub fn new(analyzer: Box<dyn Analyzer>) -> Self {
        Self {
            analyzer,
            results: None,
        }
    }

    /// Run the analyzer and keep the result
    pub fn run(&mut self, batch: &RecordBatch) -> Result<&AnalysisResult> {
        let result = self.analyzer.run(batch)?;
        Ok(self.results.insert(result))
    }

    /// Result of the last successful run
    #[must_use]
    pub const fn results(&self) -> Option<&AnalysisResult> {
        self.results.as_ref()
    }

    /// Last result as a one-row batch with JSON-encoded payload columns
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let result = self.results.as_ref().ok_or(ClimateError::NoResults)?;

        let rows = [ResultRow {
            analyzer: result.analyzer.clone(),
            timestamp: result.timestamp.clone(),
            parameters: result.parameters.to_string(),
            metrics: result.metrics.to_string(),
            data: result.data.as_ref().map(Value::to_string),
        }];

        let fields = Vec::<FieldRef>::from_type::<ResultRow>(TracingOptions::default())
            .map_err(|e| anyhow::anyhow!("Schema generation error: {e}"))?;
        serde_arrow::to_record_batch(&fields, &rows)
            .map_err(|e| anyhow::anyhow!("Failed to build result batch: {e}"))
    }
}

/// Builds an analyzer from JSON parameters
pub type AnalyzerFactory = Box<dyn Fn(&Value) -> Result<Box<dyn Analyzer>> + Send + Sync>;

/// Registry of analyzer factories by name
#[derive(Default)]
pub struct AnalyzerRegistry {
    factories: BTreeMap<String, AnalyzerFactory>,
}

impl std::fmt::Debug for AnalyzerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerRegistry")
            .field("analyzers", &self.list_analyzers())
            .finish()
    }
}

impl AnalyzerRegistry {
    /// Registry with the `trend`, `anomaly` and `quality` analyzers
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.register("trend", |params| {
            Ok(Box::new(ColumnTrendAnalyzer::from_params(params)?) as Box<dyn Analyzer>)
        });
        registry.register("anomaly", |params| {
            Ok(Box::new(ColumnAnomalyAnalyzer::from_params(params)?) as Box<dyn Analyzer>)
        });
        registry.register("quality", |params| {
            Ok(Box::new(QualityAnalyzer::from_params(params)) as Box<dyn Analyzer>)
        });
        registry
    }

    /// Register (or replace) a factory under `name`
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Value) -> Result<Box<dyn Analyzer>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Build the analyzer registered under `name`
    pub fn get(&self, name: &str, params: &Value) -> Result<Box<dyn Analyzer>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ClimateError::UnknownAnalyzer(name.to_string()))?;
        factory(params)
    }

    /// Registered names, sorted
    #[must_use]
    pub fn list_analyzers(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

fn param_str(params: &Value, key: &str) -> Option<String> {
    params.get(key).and_then(Value::as_str).map(str::to_string)
}

fn param_f64(params: &Value, key: &str, default: f64) -> f64 {
    params.get(key).and_then(Value::as_f64).unwrap_or(default)
}

fn require_column(params: &Value) -> Result<String> {
    param_str(params, "column")
        .ok_or_else(|| ClimateError::invalid_parameter("column", "missing").into())
}

fn numeric_column_present(batch: &RecordBatch, column: &str, min_values: usize) -> bool {
    let Ok(field) = batch.schema().field_with_name(column).cloned() else {
        return false;
    };
    is_numeric(field.data_type())
        && indexed_values(batch, column).is_ok_and(|values| values.len() >= min_values)
}

/// Mann-Kendall trend of one numeric column
#[derive(Debug, Clone)]
pub struct ColumnTrendAnalyzer {
    column: String,
    trend: TrendAnalyzer,
}

impl ColumnTrendAnalyzer {
    /// Analyze `column` at the given significance level
    pub fn new(column: impl Into<String>, significance_level: f64) -> Result<Self> {
        Ok(Self {
            column: column.into(),
            trend: TrendAnalyzer::new(significance_level)?,
        })
    }

    /// Parameters: `column` (required), `significance_level`
    pub fn from_params(params: &Value) -> Result<Self> {
        Self::new(
            require_column(params)?,
            param_f64(params, "significance_level", DEFAULT_SIGNIFICANCE_LEVEL),
        )
    }
}

impl Analyzer for ColumnTrendAnalyzer {
    fn name(&self) -> &str {
        "trend"
    }

    fn analyze(&self, batch: &RecordBatch) -> Result<AnalysisResult> {
        let values: Vec<f64> = indexed_values(batch, &self.column)?
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        let trend = self.trend.analyze(&values)?;

        let mut metrics = serde_json::to_value(trend.trend_metrics())?;
        metrics["intercept"] = json!(trend.intercept);
        metrics["observations"] = json!(values.len());

        Ok(AnalysisResult::new(
            self.name(),
            json!({
                "column": self.column,
                "significance_level": self.trend.significance_level(),
            }),
            metrics,
        ))
    }

    fn validate_input(&self, batch: &RecordBatch) -> bool {
        numeric_column_present(batch, &self.column, 3)
    }
}

/// IQR, z-score and isolation forest anomalies of one numeric column
#[derive(Debug, Clone)]
pub struct ColumnAnomalyAnalyzer {
    column: String,
    detector: AnomalyDetector,
    iqr_multiplier: f64,
    zscore_threshold: f64,
}

impl ColumnAnomalyAnalyzer {
    /// Analyze `column` with explicit detector settings
    pub fn new(
        column: impl Into<String>,
        contamination: f64,
        iqr_multiplier: f64,
        zscore_threshold: f64,
    ) -> Result<Self> {
        Ok(Self {
            column: column.into(),
            detector: AnomalyDetector::new(contamination)?,
            iqr_multiplier,
            zscore_threshold,
        })
    }

    /// Parameters: `column` (required), `contamination`, `iqr_multiplier`, `zscore_threshold`
    pub fn from_params(params: &Value) -> Result<Self> {
        Self::new(
            require_column(params)?,
            param_f64(params, "contamination", DEFAULT_CONTAMINATION),
            param_f64(params, "iqr_multiplier", DEFAULT_IQR_MULTIPLIER),
            param_f64(params, "zscore_threshold", DEFAULT_ZSCORE_THRESHOLD),
        )
    }
}

impl Analyzer for ColumnAnomalyAnalyzer {
    fn name(&self) -> &str {
        "anomaly"
    }

    fn analyze(&self, batch: &RecordBatch) -> Result<AnalysisResult> {
        let indexed = indexed_values(batch, &self.column)?;
        let values: Vec<f64> = indexed.iter().map(|(_, v)| *v).collect();

        let mut by_method = BTreeMap::new();
        by_method.insert("iqr", self.detector.detect_iqr(&values, self.iqr_multiplier));
        by_method.insert(
            "zscore",
            self.detector.detect_zscore(&values, self.zscore_threshold),
        );
        by_method.insert(
            "isolation_forest",
            self.detector.detect_isolation_forest(&values)?,
        );

        // Report row positions of the batch rather than positions among present values
        for anomalies in by_method.values_mut() {
            for anomaly in anomalies.iter_mut() {
                anomaly.index = indexed[anomaly.index].0;
            }
        }

        let counts: BTreeMap<&str, usize> = by_method.iter().map(|(k, v)| (*k, v.len())).collect();

        Ok(AnalysisResult::new(
            self.name(),
            json!({
                "column": self.column,
                "contamination": self.detector.contamination(),
                "iqr_multiplier": self.iqr_multiplier,
                "zscore_threshold": self.zscore_threshold,
            }),
            json!({ "counts": counts, "observations": values.len() }),
        )
        .with_data(serde_json::to_value(&by_method)?))
    }

    fn validate_input(&self, batch: &RecordBatch) -> bool {
        numeric_column_present(batch, &self.column, 1)
    }
}

/// Data quality report of the whole batch
#[derive(Debug, Clone)]
pub struct QualityAnalyzer {
    timestamp_column: String,
    station_column: String,
}

impl Default for QualityAnalyzer {
    fn default() -> Self {
        Self {
            timestamp_column: DEFAULT_TIMESTAMP_COLUMN.to_string(),
            station_column: DEFAULT_STATION_COLUMN.to_string(),
        }
    }
}

impl QualityAnalyzer {
    /// Parameters: `timestamp_column`, `station_column`
    #[must_use]
    pub fn from_params(params: &Value) -> Self {
        let defaults = Self::default();
        Self {
            timestamp_column: param_str(params, "timestamp_column")
                .unwrap_or(defaults.timestamp_column),
            station_column: param_str(params, "station_column").unwrap_or(defaults.station_column),
        }
    }
}

impl Analyzer for QualityAnalyzer {
    fn name(&self) -> &str {
        "quality"
    }

    fn analyze(&self, batch: &RecordBatch) -> Result<AnalysisResult> {
        let report = quality_report(batch, &self.timestamp_column, &self.station_column)?;
        Ok(AnalysisResult::new(
            self.name(),
            json!({
                "timestamp_column": self.timestamp_column,
                "station_column": self.station_column,
            }),
            serde_json::to_value(report)?,
        ))
    }

    fn validate_input(&self, batch: &RecordBatch) -> bool {
        batch.num_columns() > 0
    }
}
