//! Statistical analysis of climate series
//!
//! Anomaly detection, trend testing, data quality reporting and the analyzer
//! registry that exposes them over record batches.

pub mod anomaly;
pub mod base;
pub mod quality;
pub mod stats;
pub mod trend;

pub use anomaly::{Anomaly, AnomalyDetector, IsolationForest};
pub use base::{
    Analyzer, AnalyzerRegistry, AnalyzerRunner, ColumnAnomalyAnalyzer, ColumnTrendAnalyzer,
    QualityAnalyzer,
};
pub use quality::quality_report;
pub use trend::{MannKendall, SeasonalDecomposition, TrendAnalyzer, TrendResult};
