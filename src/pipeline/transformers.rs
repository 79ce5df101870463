//! Record batch transformations
//!
//! Cleaning steps applied to station data before analysis: dropping sparse
//! rows, filling gaps and converting units. Steps are chained with a
//! [`Pipeline`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{BooleanArray, Float64Array};
use arrow::datatypes::Float64Type;
use arrow::record_batch::RecordBatch;

use crate::error::{ClimateError, Result};
use crate::utils::arrow::{
    column, column_as_f64, filter_record_batch, null_flags, numeric_columns, optional_values,
    replace_column,
};

/// Default share of null cells at which a row is dropped
pub const DEFAULT_NULL_THRESHOLD: f64 = 0.5;

/// A transformation from one record batch to another
pub trait Transformer: fmt::Debug + Send + Sync {
    /// Transform a batch
    fn transform(&self, batch: &RecordBatch) -> Result<RecordBatch>;
}

/// Drops rows whose share of null cells reaches the threshold
#[derive(Debug, Clone)]
pub struct DropNullsTransformer {
    columns: Option<Vec<String>>,
    threshold: f64,
}

impl Default for DropNullsTransformer {
    fn default() -> Self {
        Self {
            columns: None,
            threshold: DEFAULT_NULL_THRESHOLD,
        }
    }
}

impl DropNullsTransformer {
    /// Consider `columns` (all when `None` or empty); keep rows with null ratio below `threshold`
    #[must_use]
    pub const fn new(columns: Option<Vec<String>>, threshold: f64) -> Self {
        Self { columns, threshold }
    }
}

impl Transformer for DropNullsTransformer {
    fn transform(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        let columns: Vec<String> = match &self.columns {
            Some(columns) if !columns.is_empty() => columns.clone(),
            _ => batch
                .schema()
                .fields()
                .iter()
                .map(|f| f.name().clone())
                .collect(),
        };
        if columns.is_empty() {
            return Ok(batch.clone());
        }

        let mut null_counts = vec![0usize; batch.num_rows()];
        for name in &columns {
            let flags = null_flags(column(batch, name)?);
            for (count, is_null) in null_counts.iter_mut().zip(flags) {
                *count += usize::from(is_null);
            }
        }

        let width = columns.len() as f64;
        let mask: BooleanArray = null_counts
            .into_iter()
            .map(|nulls| Some((nulls as f64 / width) < self.threshold))
            .collect();

        let filtered = filter_record_batch(batch, &mask)?;
        log::debug!(
            "Dropped {} of {} rows with null ratio >= {}",
            batch.num_rows() - filtered.num_rows(),
            batch.num_rows(),
            self.threshold
        );
        Ok(filtered)
    }
}

/// How gaps are filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMethod {
    /// Linear between neighbours; trailing gaps repeat the last value
    #[default]
    Linear,
    /// Carry the previous value forward
    Forward,
    /// Carry the next value backward
    Backward,
}

impl FromStr for InterpolationMethod {
    type Err = ClimateError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "pad" | "ffill" | "forward" => Ok(Self::Forward),
            "bfill" | "backfill" | "backward" => Ok(Self::Backward),
            other => Err(ClimateError::invalid_parameter(
                "method",
                format!("unknown interpolation method '{other}'"),
            )),
        }
    }
}

impl InterpolationMethod {
    /// Fill gaps in place
    pub fn fill(self, values: &mut [Option<f64>]) {
        match self {
            Self::Linear => fill_linear(values),
            Self::Forward => {
                let mut last = None;
                for slot in values.iter_mut() {
                    match slot {
                        Some(v) => last = Some(*v),
                        None => *slot = last,
                    }
                }
            }
            Self::Backward => {
                let mut next = None;
                for slot in values.iter_mut().rev() {
                    match slot {
                        Some(v) => next = Some(*v),
                        None => *slot = next,
                    }
                }
            }
        }
    }
}

fn fill_linear(values: &mut [Option<f64>]) {
    let mut last: Option<(usize, f64)> = None;
    for i in 0..values.len() {
        let Some(v) = values[i] else { continue };
        if let Some((j, u)) = last {
            let span = (i - j) as f64;
            for (k, slot) in values.iter_mut().enumerate().take(i).skip(j + 1) {
                *slot = Some(u + (v - u) * (k - j) as f64 / span);
            }
        }
        last = Some((i, v));
    }
    if let Some((j, u)) = last {
        for slot in values.iter_mut().skip(j + 1) {
            *slot = Some(u);
        }
    }
}

/// Fills missing values in numeric columns
#[derive(Debug, Clone, Default)]
pub struct InterpolateTransformer {
    method: InterpolationMethod,
    columns: Option<Vec<String>>,
}

impl InterpolateTransformer {
    /// Fill `columns` (all numeric when `None` or empty) with `method`
    #[must_use]
    pub const fn new(method: InterpolationMethod, columns: Option<Vec<String>>) -> Self {
        Self { method, columns }
    }
}

impl Transformer for InterpolateTransformer {
    fn transform(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        let columns = match &self.columns {
            Some(columns) if !columns.is_empty() => columns.clone(),
            _ => numeric_columns(batch),
        };

        let mut result = batch.clone();
        for name in &columns {
            let mut values = optional_values(&result, name)?;
            self.method.fill(&mut values);
            result = replace_column(&result, name, Arc::new(Float64Array::from(values)))?;
        }
        Ok(result)
    }
}

/// Supported unit conversions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Degrees Fahrenheit to Celsius
    FahrenheitToCelsius,
    /// Degrees Celsius to Fahrenheit
    CelsiusToFahrenheit,
    /// Millimetres to inches
    MillimetersToInches,
    /// Inches to millimetres
    InchesToMillimeters,
}

impl Conversion {
    /// Convert a single value
    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::FahrenheitToCelsius => (x - 32.0) * 5.0 / 9.0,
            Self::CelsiusToFahrenheit => x * 9.0 / 5.0 + 32.0,
            Self::MillimetersToInches => x / 25.4,
            Self::InchesToMillimeters => x * 25.4,
        }
    }
}

impl FromStr for Conversion {
    type Err = ClimateError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "f_to_c" => Ok(Self::FahrenheitToCelsius),
            "c_to_f" => Ok(Self::CelsiusToFahrenheit),
            "mm_to_in" => Ok(Self::MillimetersToInches),
            "in_to_mm" => Ok(Self::InchesToMillimeters),
            other => Err(ClimateError::UnknownConversion(other.to_string())),
        }
    }
}

/// Converts the units of one column
#[derive(Debug, Clone)]
pub struct UnitConversionTransformer {
    column: String,
    conversion: Conversion,
}

impl UnitConversionTransformer {
    /// Convert `column` with a named conversion such as `"f_to_c"`
    pub fn new(column: impl Into<String>, conversion: &str) -> Result<Self> {
        Ok(Self {
            column: column.into(),
            conversion: conversion.parse()?,
        })
    }
}

impl Transformer for UnitConversionTransformer {
    fn transform(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        let values = column_as_f64(batch, &self.column)?;
        let conversion = self.conversion;
        let converted = values.unary::<_, Float64Type>(|x| conversion.apply(x));
        replace_column(batch, &self.column, Arc::new(converted))
    }
}

/// Ordered chain of transformers
#[derive(Debug, Default)]
pub struct Pipeline {
    transformers: Vec<Box<dyn Transformer>>,
}

impl Pipeline {
    /// Empty pipeline
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transformer
    #[must_use]
    pub fn add<T: Transformer + 'static>(mut self, transformer: T) -> Self {
        self.transformers.push(Box::new(transformer));
        self
    }

    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    /// Whether the pipeline has no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Apply every transformer in order
    pub fn transform(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        let mut result = batch.clone();
        for transformer in &self.transformers {
            result = transformer.transform(&result)?;
            log::debug!("{transformer:?} -> {} rows", result.num_rows());
        }
        Ok(result)
    }
}
