//! Data quality reporting
//!
//! Summarises completeness (null and NaN counts), plausibility (IQR outliers),
//! temporal coverage and station coverage of a batch.

use std::collections::BTreeMap;

use arrow::record_batch::RecordBatch;
use itertools::Itertools;

use crate::analysis::anomaly::{AnomalyDetector, DEFAULT_IQR_MULTIPLIER};
use crate::error::Result;
use crate::utils::arrow::{column_values, is_numeric, null_flags, string_values, timestamp_values};

/// Default name of the timestamp column
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "timestamp";
/// Default name of the station identifier column
pub const DEFAULT_STATION_COLUMN: &str = "station_id";

pub use crate::types::DataQualityReport;

/// Build a quality report; absent timestamp or station columns are skipped
pub fn quality_report(
    batch: &RecordBatch,
    timestamp_column: &str,
    station_column: &str,
) -> Result<DataQualityReport> {
    let total = batch.num_rows();
    let schema = batch.schema();
    let detector = AnomalyDetector::default();

    let mut null_counts = BTreeMap::new();
    let mut null_percentages = BTreeMap::new();
    let mut outlier_counts = BTreeMap::new();

    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        let nulls = null_flags(array).into_iter().filter(|n| *n).count();
        let pct = if total == 0 {
            0.0
        } else {
            100.0 * nulls as f64 / total as f64
        };
        null_counts.insert(field.name().clone(), nulls);
        null_percentages.insert(field.name().clone(), pct);

        if is_numeric(field.data_type()) {
            let values = column_values(batch, field.name())?;
            let outliers = detector.detect_iqr(&values, DEFAULT_IQR_MULTIPLIER).len();
            outlier_counts.insert(field.name().clone(), outliers);
        }
    }

    let date_range = if schema.index_of(timestamp_column).is_ok() {
        let timestamps = timestamp_values(batch, timestamp_column)?;
        timestamps
            .iter()
            .flatten()
            .minmax()
            .into_option()
            .map(|(first, last)| (*first, *last))
    } else {
        None
    };

    let stations = if schema.index_of(station_column).is_ok() {
        string_values(batch, station_column)?
            .into_iter()
            .flatten()
            .sorted()
            .dedup()
            .collect()
    } else {
        Vec::new()
    };

    Ok(DataQualityReport {
        total_records: total,
        null_counts,
        null_percentages,
        outlier_counts,
        date_range,
        stations,
    })
}
