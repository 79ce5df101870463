//! Export of record batches to files
//!
//! Each exporter owns an output directory (created on construction) and
//! writes `<filename>.<ext>` into it.

pub mod csv;
pub mod excel;
pub mod json;
pub mod parquet;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use arrow::record_batch::RecordBatch;

use crate::error::{ClimateError, Result};

pub use self::csv::CsvExporter;
pub use self::excel::ExcelExporter;
pub use self::json::{JsonExporter, JsonOrient};
pub use self::parquet::ParquetExporter;

/// Writes a batch into the exporter's output directory
pub trait Exporter: fmt::Debug + Send + Sync {
    /// File extension without the dot
    fn extension(&self) -> &'static str;

    /// Directory files are written into
    fn output_dir(&self) -> &Path;

    /// Write `batch` to `<output_dir>/<filename>.<extension>` and return the path
    fn export(&self, batch: &RecordBatch, filename: &str) -> Result<PathBuf>;

    /// Path a given filename is written to
    fn output_path(&self, filename: &str) -> PathBuf {
        self.output_dir()
            .join(format!("{filename}.{}", self.extension()))
    }
}

pub(crate) fn log_export(batch: &RecordBatch, path: &Path) {
    log::info!("Exported {} rows to {}", batch.num_rows(), path.display());
}

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Excel,
    Parquet,
    Json,
}

impl ExportFormat {
    /// All formats, in display order
    pub const ALL: [Self; 4] = [Self::Csv, Self::Excel, Self::Parquet, Self::Json];

    /// Lower-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "excel",
            Self::Parquet => "parquet",
            Self::Json => "json",
        }
    }

    /// Extension of the written file
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Excel => "xlsx",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ClimateError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| ClimateError::UnknownFormat(s.to_string()))
    }
}

/// Creates exporters by format name
pub struct ExporterFactory;

impl ExporterFactory {
    /// Exporter with default options for `format` (`csv`, `excel`, `parquet` or `json`)
    pub fn create(format: &str, output_dir: &Path) -> Result<Box<dyn Exporter>> {
        let exporter: Box<dyn Exporter> = match format.parse::<ExportFormat>()? {
            ExportFormat::Csv => Box::new(CsvExporter::new(output_dir)?),
            ExportFormat::Excel => Box::new(ExcelExporter::new(output_dir)?),
            ExportFormat::Parquet => Box::new(ParquetExporter::new(output_dir)?),
            ExportFormat::Json => Box::new(JsonExporter::new(output_dir)?),
        };
        Ok(exporter)
    }
}
