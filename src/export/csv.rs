//! CSV export

use std::path::{Path, PathBuf};

use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;

use super::{Exporter, log_export};
use crate::error::util::{ensure_directory, safe_create_file};
use crate::error::Result;

/// Writes a header row followed by one line per record
#[derive(Debug, Clone)]
pub struct CsvExporter {
    output_dir: PathBuf,
    delimiter: u8,
}

impl CsvExporter {
    /// Comma-separated exporter writing into `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        ensure_directory(&output_dir, "csv export")?;
        Ok(Self {
            output_dir,
            delimiter: b',',
        })
    }

    /// Use another field delimiter
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

impl Exporter for CsvExporter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn export(&self, batch: &RecordBatch, filename: &str) -> Result<PathBuf> {
        let path = self.output_path(filename);
        let file = safe_create_file(&path, "csv export")?;
        let mut writer = WriterBuilder::new()
            .with_header(true)
            .with_delimiter(self.delimiter)
            .build(file);
        writer
            .write(batch)
            .map_err(|e| anyhow::anyhow!("Failed to write csv to {}: {e}", path.display()))?;
        log_export(batch, &path);
        Ok(path)
    }
}
