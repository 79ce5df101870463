//! Common domain type definitions
//!
//! Records and result types shared by the analysis, pipeline and export
//! modules.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single climate observation from a station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateRecord {
    /// Observation time
    pub timestamp: NaiveDateTime,
    /// Station identifier
    pub station_id: String,
    /// Station latitude in degrees
    pub latitude: f64,
    /// Station longitude in degrees
    pub longitude: f64,
    /// Mean temperature (°C)
    pub temperature: Option<f64>,
    /// Minimum temperature (°C)
    pub temperature_min: Option<f64>,
    /// Maximum temperature (°C)
    pub temperature_max: Option<f64>,
    /// Precipitation (mm)
    pub precipitation: Option<f64>,
    /// Relative humidity (%)
    pub humidity: Option<f64>,
    /// Air pressure (hPa)
    pub pressure: Option<f64>,
    /// Wind speed (m/s)
    pub wind_speed: Option<f64>,
    /// Wind direction (degrees)
    pub wind_direction: Option<f64>,
}

/// Output of an analyzer run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Name of the analyzer that produced the result
    pub analyzer: String,
    /// RFC 3339 time the result was produced
    pub timestamp: String,
    /// Parameters the analyzer ran with
    pub parameters: serde_json::Value,
    /// Computed metrics
    pub metrics: serde_json::Value,
    /// Optional detailed output
    pub data: Option<serde_json::Value>,
}

impl AnalysisResult {
    /// Create a result stamped with the current time
    #[must_use]
    pub fn new(
        analyzer: impl Into<String>,
        parameters: serde_json::Value,
        metrics: serde_json::Value,
    ) -> Self {
        Self {
            analyzer: analyzer.into(),
            timestamp: Utc::now().to_rfc3339(),
            parameters,
            metrics,
            data: None,
        }
    }

    /// Attach detailed output
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Direction of a monotonic trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    /// Values tend to rise
    Increasing,
    /// Values tend to fall
    Decreasing,
    /// No monotonic tendency
    #[serde(rename = "no trend")]
    NoTrend,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increasing => write!(f, "increasing"),
            Self::Decreasing => write!(f, "decreasing"),
            Self::NoTrend => write!(f, "no trend"),
        }
    }
}

/// Summary metrics of a trend test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendMetrics {
    /// Sen's slope
    pub slope: f64,
    /// Two-sided p-value of the Mann-Kendall test
    pub p_value: f64,
    /// Direction of the trend
    pub trend_direction: TrendDirection,
    /// Whether `p_value` is below the significance level
    pub is_significant: bool,
    /// Approximate 95% confidence interval for the slope
    pub confidence_interval: (f64, f64),
}

/// Completeness and plausibility summary of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityReport {
    /// Number of rows
    pub total_records: usize,
    /// Null (or NaN) values per column
    pub null_counts: BTreeMap<String, usize>,
    /// Null share per column in percent
    pub null_percentages: BTreeMap<String, f64>,
    /// IQR outliers per numeric column
    pub outlier_counts: BTreeMap<String, usize>,
    /// Earliest and latest timestamp, when a timestamp column is present
    pub date_range: Option<(NaiveDateTime, NaiveDateTime)>,
    /// Distinct station identifiers, sorted
    pub stations: Vec<String>,
}

/// One anomaly in a table-wide scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRow {
    /// Column the value came from
    pub column: String,
    /// Row position in the scanned batch
    pub index: u64,
    pub value: f64,
    pub score: f64,
    pub method: String,
}
