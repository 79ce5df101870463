//! CSV file operations
//!
//! CSV input is read with Arrow's CSV reader; the schema is inferred from the
//! leading records of the file.

use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use arrow::csv::reader::{Format, Reader, ReaderBuilder};
use arrow::record_batch::RecordBatch;

use crate::error::util::safe_open_file;
use crate::error::Result;
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Number of records used to infer a CSV schema
pub const SCHEMA_INFERENCE_RECORDS: usize = 1000;

/// Open a CSV file as an iterator of record batches of `batch_size` rows
pub fn open_csv(path: &Path, batch_size: usize) -> Result<Reader<std::fs::File>> {
    let mut file = safe_open_file(path, "reading csv data")?;
    let format = Format::default().with_header(true);
    let (schema, _) = format
        .infer_schema(&mut file, Some(SCHEMA_INFERENCE_RECORDS))
        .map_err(|e| anyhow::anyhow!("Failed to infer schema of {}: {}", path.display(), e))?;
    file.rewind()?;

    ReaderBuilder::new(Arc::new(schema))
        .with_format(format)
        .with_batch_size(batch_size)
        .build(file)
        .map_err(|e| anyhow::anyhow!("Failed to build csv reader for {}: {}", path.display(), e))
}

/// Read a whole CSV file into record batches
pub fn read_csv(path: &Path) -> Result<Vec<RecordBatch>> {
    let start = std::time::Instant::now();
    log_operation_start("Reading csv file", path);

    let batches = open_csv(path, super::parquet::DEFAULT_BATCH_SIZE)?
        .map(|batch| batch.map_err(|e| anyhow::anyhow!("Failed to read csv batch: {e}")))
        .collect::<Result<Vec<_>>>()?;

    log_operation_complete("read", path, batches.len(), Some(start.elapsed()));
    Ok(batches)
}
