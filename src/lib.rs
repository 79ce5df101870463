//! A Rust toolkit for analyzing climate patterns in historical weather data:
//! trend tests, anomaly detection, data cleaning, ingestion and export over
//! Arrow record batches.

pub mod analysis;
pub mod app;
pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod types;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use app::{ClimateAnalyzer, DEFAULT_ANOMALY_THRESHOLD, create_app};
pub use config::{AnalyzerConfig, SecretsManager};
pub use error::{ClimateError, Result, climate_error};
pub use types::{AnalysisResult, AnomalyRow, ClimateRecord, DataQualityReport, TrendDirection};

// Arrow types
pub use arrow::datatypes::Schema as ArrowSchema;
pub use arrow::record_batch::RecordBatch;

// Analysis
pub use analysis::{
    Analyzer, AnalyzerRegistry, AnalyzerRunner, Anomaly, AnomalyDetector, TrendAnalyzer,
    TrendResult, quality_report,
};

// Pipeline and export
pub use export::{ExportFormat, Exporter, ExporterFactory};
pub use pipeline::{
    CsvFileAdapter, DataRecord, DataSourceAdapter, IngestionPipeline, NoaaAdapter, Pipeline,
    Transformer,
};

// Utility functions
pub use utils::io::{read_csv, read_parquet, read_table, write_parquet};
