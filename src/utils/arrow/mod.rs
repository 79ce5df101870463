//! Arrow data handling utilities
//!
//! This module contains utilities for working with Arrow arrays and record
//! batches: typed column extraction, null detection and batch rebuilding.

pub mod array_utils;

// Re-export commonly used functions for convenience
pub use array_utils::{
    column, column_as_f64, column_values, filter_record_batch, indexed_values, is_numeric,
    null_flags, numeric_columns, optional_values, replace_column, string_values,
    timestamp_values,
};
