//! Parquet file operations
//!
//! Reading Parquet files into Arrow record batches, writing batches back out
//! and locating Parquet files in a directory.

use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rayon::prelude::*;

use crate::error::util::{safe_create_file, safe_open_file, validate_directory};
use crate::error::Result;
use crate::utils::logging::{log_operation_complete, log_operation_start, log_warning};

/// Default batch size for Parquet reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Helper function to get batch size from environment
#[must_use]
pub fn get_batch_size() -> Option<usize> {
    std::env::var("PARQUET_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
}

/// Read a parquet file into Arrow record batches
pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>> {
    let start = std::time::Instant::now();
    log_operation_start("Reading parquet file", path);

    let file = safe_open_file(path, "reading parquet data")?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| anyhow::anyhow!("Failed to read parquet file {}: {}", path.display(), e))?
        .with_batch_size(get_batch_size().unwrap_or(DEFAULT_BATCH_SIZE))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build parquet reader. Error: {}", e))?;

    let batches = reader
        .map(|batch_result| {
            batch_result.map_err(|e| anyhow::anyhow!("Failed to read record batch. Error: {}", e))
        })
        .collect::<Result<Vec<_>>>()?;

    log_operation_complete("read", path, batches.len(), Some(start.elapsed()));
    Ok(batches)
}

/// Write a record batch to a parquet file with the given compression
pub fn write_parquet(batch: &RecordBatch, path: &Path, compression: Compression) -> Result<()> {
    let file = safe_create_file(path, "writing parquet data")?;
    let props = WriterProperties::builder()
        .set_compression(compression)
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .map_err(|e| anyhow::anyhow!("Failed to create parquet writer: {e}"))?;
    writer
        .write(batch)
        .map_err(|e| anyhow::anyhow!("Failed to write record batch: {e}"))?;
    writer
        .close()
        .map_err(|e| anyhow::anyhow!("Failed to finalize parquet file: {e}"))?;
    Ok(())
}

/// Find all Parquet files in a directory, newest first
pub fn find_parquet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    log_operation_start("Searching for parquet files in", dir);
    validate_directory(dir, "locating parquet files")?;

    let parquet_files = std::fs::read_dir(dir)
        .map_err(|e| anyhow::anyhow!("Failed to read directory {}: {}", dir.display(), e))?
        .par_bridge()
        .filter_map(|entry_result| match entry_result {
            Ok(entry) => {
                let path = entry.path();
                if path.is_file() && path.extension().is_some_and(|ext| ext == "parquet") {
                    Some(Ok(path))
                } else {
                    None
                }
            }
            Err(e) => Some(Err(anyhow::anyhow!("Failed to read directory entry: {e}"))),
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .sorted_by(|a, b| {
            std::fs::metadata(b)
                .and_then(|m| m.modified())
                .ok()
                .cmp(&std::fs::metadata(a).and_then(|m| m.modified()).ok())
        })
        .collect_vec();

    if parquet_files.is_empty() {
        log_warning("No Parquet files found in directory", Some(dir));
    } else {
        log_operation_complete("found", dir, parquet_files.len(), None);
    }

    Ok(parquet_files)
}

/// Load all parquet files from a directory in parallel
pub fn load_parquet_files_parallel(dir: &Path) -> Result<Vec<RecordBatch>> {
    let parquet_files = find_parquet_files(dir)?;
    if parquet_files.is_empty() {
        return Ok(Vec::new());
    }

    let all_batches: Vec<Result<Vec<RecordBatch>>> = parquet_files
        .par_iter()
        .map(|path| read_parquet(path))
        .collect();

    let mut combined_batches = Vec::new();
    for result in all_batches {
        combined_batches.extend(result?);
    }

    log::info!(
        "Successfully loaded {} batches from {} Parquet files",
        combined_batches.len(),
        parquet_files.len()
    );

    Ok(combined_batches)
}
