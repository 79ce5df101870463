//! Parquet export

use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};

use super::{Exporter, log_export};
use crate::error::util::ensure_directory;
use crate::error::{ClimateError, Result};
use crate::utils::io::write_parquet;

/// Parse a compression codec name (`snappy`, `gzip`, `zstd` or `none`)
pub fn parse_compression(name: &str) -> Result<Compression> {
    match name.to_lowercase().as_str() {
        "snappy" => Ok(Compression::SNAPPY),
        "gzip" => Ok(Compression::GZIP(GzipLevel::default())),
        "zstd" => Ok(Compression::ZSTD(ZstdLevel::default())),
        "none" | "uncompressed" => Ok(Compression::UNCOMPRESSED),
        other => Err(ClimateError::invalid_parameter(
            "compression",
            format!("unsupported codec '{other}'"),
        )
        .into()),
    }
}

#[derive(Debug, Clone)]
pub struct ParquetExporter {
    output_dir: PathBuf,
    compression: Compression,
}

impl ParquetExporter {
    /// Snappy-compressed exporter writing into `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        ensure_directory(&output_dir, "parquet export")?;
        Ok(Self {
            output_dir,
            compression: Compression::SNAPPY,
        })
    }

    /// Use a named compression codec
    pub fn with_compression(mut self, name: &str) -> Result<Self> {
        self.compression = parse_compression(name)?;
        Ok(self)
    }
}

impl Exporter for ParquetExporter {
    fn extension(&self) -> &'static str {
        "parquet"
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn export(&self, batch: &RecordBatch, filename: &str) -> Result<PathBuf> {
        let path = self.output_path(filename);
        write_parquet(batch, &path, self.compression)?;
        log_export(batch, &path);
        Ok(path)
    }
}
