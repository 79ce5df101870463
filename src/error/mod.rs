//! Error handling for the climate analyzer.
//!
//! Operations return [`Result`], an `anyhow` result, so that callers can attach
//! context as an error travels up. Errors whose kind matters to a caller are
//! raised as a [`ClimateError`] and can be recovered with `downcast_ref`.

pub mod util;

use std::path::PathBuf;

/// Error kinds raised by the analyzer
#[derive(Debug, thiserror::Error)]
pub enum ClimateError {
    /// A file or directory could not be accessed
    #[error("IO error at {path}: {message}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// What went wrong
        message: String,
        /// Underlying IO error, when there is one
        #[source]
        source: Option<std::io::Error>,
    },

    /// A column the operation needs is absent from the batch
    #[error("Column '{column}' not found")]
    ColumnNotFound {
        /// Name of the missing column
        column: String,
    },

    /// A column exists but has a type the operation cannot use
    #[error("Column '{column}' has unsupported type {data_type}")]
    ColumnType {
        /// Column name
        column: String,
        /// Display form of the actual Arrow type
        data_type: String,
    },

    /// Not enough observations for a statistical procedure
    #[error("Insufficient data: {operation} needs at least {required} values, got {actual}")]
    InsufficientData {
        /// Procedure that was attempted
        operation: &'static str,
        /// Minimum number of values
        required: usize,
        /// Number of values supplied
        actual: usize,
    },

    /// A parameter is outside its valid range
    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Reason it was rejected
        message: String,
    },

    /// Input failed an analyzer's validation
    #[error("Input validation failed for {analyzer}")]
    InvalidInput {
        /// Analyzer that rejected the input
        analyzer: String,
    },

    /// No analyzer is registered under the name
    #[error("Unknown analyzer: {0}")]
    UnknownAnalyzer(String),

    /// No ingestion adapter is registered under the name
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    /// Export format is not supported
    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    /// Unit conversion name is not supported
    #[error("Unknown conversion: {0}")]
    UnknownConversion(String),

    /// Input file has a suffix that cannot be loaded
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// An operation that needs loaded data ran before any was loaded
    #[error("No data loaded. Call load_data() first.")]
    NoData,

    /// An analyzer has not produced results yet
    #[error("No results available")]
    NoResults,

    /// A required secret is absent
    #[error("Required secret not found: {0}")]
    MissingSecret(String),

    /// A remote data source returned an error
    #[error("Data source error ({source_name}): {message}")]
    DataSource {
        /// Adapter name
        source_name: String,
        /// Error description
        message: String,
    },
}

impl ClimateError {
    /// Create an IO error with a message and no underlying source
    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create an IO error wrapping an underlying `std::io::Error`
    pub fn io_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    /// Create an insufficient data error
    #[must_use]
    pub const fn insufficient(operation: &'static str, required: usize, actual: usize) -> Self {
        Self::InsufficientData {
            operation,
            required,
            actual,
        }
    }
}

/// Result type for analyzer operations
pub type Result<T> = anyhow::Result<T>;

/// Returns the [`ClimateError`] carried by an `anyhow` error, if any
#[must_use]
pub fn climate_error(err: &anyhow::Error) -> Option<&ClimateError> {
    err.downcast_ref::<ClimateError>()
}
