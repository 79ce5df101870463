//! Utilities for working with Arrow arrays.
//!
//! Helpers for extracting typed values from record batch columns, building
//! null masks and rebuilding batches after a column has been replaced or rows
//! have been filtered.

use std::sync::Arc;

use anyhow::Context;
use arrow::array::{
    Array, ArrayRef, BooleanArray, Float64Array, StringArray, TimestampMillisecondArray,
};
use arrow::compute::filter as arrow_filter;
use arrow::compute::kernels::cast::cast;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;

use crate::error::{ClimateError, Result};

/// Whether an Arrow type holds plain numbers
#[must_use]
pub const fn is_numeric(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64
    )
}

/// Names of all numeric columns, in schema order
#[must_use]
pub fn numeric_columns(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .filter(|f| is_numeric(f.data_type()))
        .map(|f| f.name().clone())
        .collect()
}

/// Look up a column by name
pub fn column<'a>(batch: &'a RecordBatch, column_name: &str) -> Result<&'a ArrayRef> {
    let idx = batch
        .schema()
        .index_of(column_name)
        .map_err(|_| ClimateError::ColumnNotFound {
            column: column_name.to_string(),
        })?;
    Ok(batch.column(idx))
}

/// A numeric column cast to `Float64`
pub fn column_as_f64(batch: &RecordBatch, column_name: &str) -> Result<Float64Array> {
    let array = column(batch, column_name)?;
    if !is_numeric(array.data_type()) {
        return Err(ClimateError::ColumnType {
            column: column_name.to_string(),
            data_type: array.data_type().to_string(),
        }
        .into());
    }

    let converted = cast(array, &DataType::Float64)
        .with_context(|| format!("Failed to cast column '{column_name}' to Float64"))?;
    converted
        .as_any()
        .downcast_ref::<Float64Array>()
        .cloned()
        .ok_or_else(|| {
            ClimateError::ColumnType {
                column: column_name.to_string(),
                data_type: converted.data_type().to_string(),
            }
            .into()
        })
}

/// Values of a numeric column with nulls kept as `None` (NaN counts as null)
pub fn optional_values(batch: &RecordBatch, column_name: &str) -> Result<Vec<Option<f64>>> {
    let array = column_as_f64(batch, column_name)?;
    Ok(array
        .iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Present values of a numeric column with their row positions
pub fn indexed_values(batch: &RecordBatch, column_name: &str) -> Result<Vec<(usize, f64)>> {
    Ok(optional_values(batch, column_name)?
        .into_iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|x| (i, x)))
        .collect())
}

/// Present values of a numeric column, nulls and NaN dropped
pub fn column_values(batch: &RecordBatch, column_name: &str) -> Result<Vec<f64>> {
    Ok(indexed_values(batch, column_name)?
        .into_iter()
        .map(|(_, v)| v)
        .collect())
}

/// Per-row null flags for an array; NaN in float arrays counts as null
#[must_use]
pub fn null_flags(array: &ArrayRef) -> Vec<bool> {
    let nan_aware = matches!(
        array.data_type(),
        DataType::Float16 | DataType::Float32 | DataType::Float64
    );
    if nan_aware {
        if let Ok(floats) = cast(array, &DataType::Float64) {
            if let Some(values) = floats.as_any().downcast_ref::<Float64Array>() {
                return values
                    .iter()
                    .map(|v| v.is_none_or(f64::is_nan))
                    .collect();
            }
        }
    }
    (0..array.len()).map(|i| array.is_null(i)).collect()
}

/// A column parsed as timestamps; accepts timestamp, date and string columns
pub fn timestamp_values(
    batch: &RecordBatch,
    column_name: &str,
) -> Result<Vec<Option<NaiveDateTime>>> {
    let array = column(batch, column_name)?;
    let converted = cast(array, &DataType::Timestamp(TimeUnit::Millisecond, None))
        .with_context(|| format!("Failed to read column '{column_name}' as timestamps"))?;
    let timestamps = converted
        .as_any()
        .downcast_ref::<TimestampMillisecondArray>()
        .ok_or_else(|| ClimateError::ColumnType {
            column: column_name.to_string(),
            data_type: array.data_type().to_string(),
        })?;
    Ok((0..timestamps.len())
        .map(|i| {
            if timestamps.is_null(i) {
                None
            } else {
                timestamps.value_as_datetime(i)
            }
        })
        .collect())
}

/// A column rendered as strings
pub fn string_values(batch: &RecordBatch, column_name: &str) -> Result<Vec<Option<String>>> {
    let array = column(batch, column_name)?;
    let converted = cast(array, &DataType::Utf8)
        .with_context(|| format!("Failed to read column '{column_name}' as strings"))?;
    let strings = converted
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| ClimateError::ColumnType {
            column: column_name.to_string(),
            data_type: array.data_type().to_string(),
        })?;
    Ok(strings.iter().map(|v| v.map(str::to_string)).collect())
}

/// Filter a record batch based on a boolean mask
///
/// # Returns
/// A new record batch with only rows where mask is true
pub fn filter_record_batch(batch: &RecordBatch, mask: &BooleanArray) -> Result<RecordBatch> {
    if batch.num_rows() != mask.len() {
        return Err(anyhow::anyhow!(
            "Mask length ({}) doesn't match batch row count ({})",
            mask.len(),
            batch.num_rows()
        ));
    }

    let filtered_columns: Vec<ArrayRef> = batch
        .columns()
        .iter()
        .map(|col| arrow_filter(col, mask))
        .collect::<arrow::error::Result<_>>()
        .with_context(|| "Failed to apply boolean filter to columns")?;

    RecordBatch::try_new(batch.schema(), filtered_columns)
        .with_context(|| "Failed to create filtered record batch")
}

/// Replace a column (keeping its position) with a new array
pub fn replace_column(
    batch: &RecordBatch,
    column_name: &str,
    array: ArrayRef,
) -> Result<RecordBatch> {
    let schema = batch.schema();
    let idx = schema
        .index_of(column_name)
        .map_err(|_| ClimateError::ColumnNotFound {
            column: column_name.to_string(),
        })?;

    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, f)| {
            if i == idx {
                Field::new(f.name(), array.data_type().clone(), true)
            } else {
                f.as_ref().clone()
            }
        })
        .collect();
    let mut columns = batch.columns().to_vec();
    columns[idx] = array;

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .with_context(|| format!("Failed to rebuild batch after replacing '{column_name}'"))
}
