//! Memory optimisation for large batches
//!
//! Narrowing of column types, chunked CSV reading and simple memory
//! accounting for record batches.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::compute::kernels::cast::cast;
use arrow::compute::{max, min};
use arrow::datatypes::{DataType, Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use serde_arrow::schema::{SchemaLike, TracingOptions};

use crate::error::Result;
use crate::utils::io::open_csv;

/// Default number of rows per chunk for [`read_chunked`]
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Share of distinct values below which a string column is dictionary-encoded
pub const DICTIONARY_UNIQUE_RATIO: f64 = 0.5;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

fn narrowed_integer_type(min: i64, max: i64) -> Option<DataType> {
    if min >= 0 {
        if max < 255 {
            Some(DataType::UInt8)
        } else if max < 65_535 {
            Some(DataType::UInt16)
        } else if max < 4_294_967_295 {
            Some(DataType::UInt32)
        } else {
            None
        }
    } else if min > -128 && max < 127 {
        Some(DataType::Int8)
    } else if min > -32_768 && max < 32_767 {
        Some(DataType::Int16)
    } else if min > -2_147_483_648 && max < 2_147_483_647 {
        Some(DataType::Int32)
    } else {
        None
    }
}

fn is_lossless_f32(values: &Float64Array) -> bool {
    values
        .iter()
        .flatten()
        .all(|v| v.is_nan() || f64::from(v as f32) == v)
}

fn should_encode_dictionary(values: &StringArray) -> bool {
    if values.is_empty() {
        return false;
    }
    let unique: HashSet<&str> = values.iter().flatten().collect();
    (unique.len() as f64 / values.len() as f64) < DICTIONARY_UNIQUE_RATIO
}

fn optimized_type(array: &ArrayRef) -> Option<DataType> {
    match array.data_type() {
        DataType::Int64 => {
            let values = array.as_any().downcast_ref::<Int64Array>()?;
            narrowed_integer_type(min(values)?, max(values)?)
        }
        DataType::Float64 => {
            let values = array.as_any().downcast_ref::<Float64Array>()?;
            is_lossless_f32(values).then_some(DataType::Float32)
        }
        DataType::Utf8 => {
            let values = array.as_any().downcast_ref::<StringArray>()?;
            should_encode_dictionary(values).then(|| {
                DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8))
            })
        }
        _ => None,
    }
}

/// Downcast columns to the narrowest type that holds their values
///
/// `Int64` columns shrink to the smallest fitting integer type, `Float64`
/// columns become `Float32` when no value changes, and low-cardinality `Utf8`
/// columns are dictionary-encoded.
pub fn optimize_dtypes(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields: Vec<Field> = Vec::with_capacity(batch.num_columns());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());

    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        match optimized_type(array) {
            Some(target) => {
                let converted = cast(array, &target).map_err(|e| {
                    anyhow::anyhow!("Failed to cast column '{}' to {target}: {e}", field.name())
                })?;
                log::debug!(
                    "Optimized column '{}': {} -> {}",
                    field.name(),
                    field.data_type(),
                    target
                );
                fields.push(field.as_ref().clone().with_data_type(target));
                columns.push(converted);
            }
            None => {
                fields.push(field.as_ref().clone());
                columns.push(Arc::clone(array));
            }
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .map_err(|e| anyhow::anyhow!("Failed to rebuild optimized batch: {e}"))
}

/// Read a CSV file in batches of `chunk_size` rows, optionally optimising each
pub fn read_chunked(
    path: &Path,
    chunk_size: usize,
    optimize: bool,
) -> Result<impl Iterator<Item = Result<RecordBatch>>> {
    let reader = open_csv(path, chunk_size.max(1))?;
    Ok(reader.map(move |batch| {
        let batch = batch.map_err(|e| anyhow::anyhow!("Failed to read csv chunk: {e}"))?;
        if optimize {
            optimize_dtypes(&batch)
        } else {
            Ok(batch)
        }
    }))
}

/// Memory held by a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub total_mb: f64,
    pub by_column_mb: BTreeMap<String, f64>,
    pub rows: usize,
    pub columns: usize,
}

/// Memory held by each column and in total
#[must_use]
pub fn get_memory_usage(batch: &RecordBatch) -> MemoryUsage {
    let by_column_mb: BTreeMap<String, f64> = batch
        .schema()
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, array)| {
            (
                field.name().clone(),
                array.get_array_memory_size() as f64 / BYTES_PER_MB,
            )
        })
        .collect();

    MemoryUsage {
        total_mb: by_column_mb.values().sum(),
        by_column_mb,
        rows: batch.num_rows(),
        columns: batch.num_columns(),
    }
}

/// A labelled measurement taken by [`MemoryProfiler`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub label: String,
    pub total_mb: f64,
    pub rows: u64,
    pub columns: u64,
}

/// Records memory usage at points of a processing run
#[derive(Debug, Default)]
pub struct MemoryProfiler {
    snapshots: Vec<MemorySnapshot>,
}

impl MemoryProfiler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Measure `batch` and remember the result under `label`
    pub fn snapshot(&mut self, label: &str, batch: &RecordBatch) -> MemoryUsage {
        let usage = get_memory_usage(batch);
        log::info!("Memory snapshot '{label}': {:.2} MB", usage.total_mb);
        self.snapshots.push(MemorySnapshot {
            label: label.to_string(),
            total_mb: usage.total_mb,
            rows: usage.rows as u64,
            columns: usage.columns as u64,
        });
        usage
    }

    /// Snapshots taken so far
    #[must_use]
    pub fn snapshots(&self) -> &[MemorySnapshot] {
        &self.snapshots
    }

    /// All snapshots as a batch with columns `label, total_mb, rows, columns`
    pub fn report(&self) -> Result<RecordBatch> {
        let fields = Vec::<FieldRef>::from_type::<MemorySnapshot>(TracingOptions::default())
            .map_err(|e| anyhow::anyhow!("Schema generation error: {e}"))?;
        serde_arrow::to_record_batch(&fields, &self.snapshots)
            .map_err(|e| anyhow::anyhow!("Serialization error: {e}"))
    }
}
