//! IO utilities for file operations
//!
//! Reading and writing the tabular formats the analyzer works with.

pub mod csv;
pub mod parquet;

use std::path::Path;

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;

use crate::error::{ClimateError, Result};

// Re-export commonly used functions for convenience
pub use csv::{open_csv, read_csv};
pub use parquet::{
    DEFAULT_BATCH_SIZE, find_parquet_files, load_parquet_files_parallel, read_parquet,
    write_parquet,
};

/// Load a `.csv` or `.parquet` file into a single record batch
///
/// A directory loads every `.parquet` file in it.
pub fn read_table(path: &Path) -> Result<RecordBatch> {
    if path.is_dir() {
        return combine_batches(&load_parquet_files_parallel(path)?);
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let batches = match extension.as_str() {
        "csv" => read_csv(path)?,
        "parquet" => read_parquet(path)?,
        _ => return Err(ClimateError::UnsupportedFormat(format!(".{extension}")).into()),
    };

    combine_batches(&batches)
}

/// Concatenate batches sharing a schema; an empty list yields an empty batch
pub fn combine_batches(batches: &[RecordBatch]) -> Result<RecordBatch> {
    let Some(first) = batches.first() else {
        return Ok(RecordBatch::new_empty(std::sync::Arc::new(
            arrow::datatypes::Schema::empty(),
        )));
    };
    concat_batches(&first.schema(), batches)
        .map_err(|e| anyhow::anyhow!("Failed to combine record batches: {e}"))
}
