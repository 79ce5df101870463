//! Console output utilities
//!
//! Human-readable rendering of batches and analysis results for the CLI.

use std::collections::BTreeMap;

use arrow::record_batch::RecordBatch;
use itertools::Itertools;

use crate::analysis::trend::TrendResult;
use crate::types::{AnomalyRow, DataQualityReport};

/// Print row and batch counts
pub fn print_batch_summary(batch: &RecordBatch, elapsed: std::time::Duration) {
    println!("Loaded {} rows in {:?}", batch.num_rows(), elapsed);
}

/// Print the column names and types of a batch
pub fn print_schema_info(batch: &RecordBatch) {
    println!("Schema:");
    for field in batch.schema().fields() {
        println!("  - {} ({})", field.name(), field.data_type());
    }
}

/// Print one line per analysed column
pub fn print_trend_table(trends: &BTreeMap<String, TrendResult>) {
    if trends.is_empty() {
        println!("No numeric columns with enough values for trend analysis");
        return;
    }
    println!(
        "{:<20} {:>12} {:>12} {:<12} {:>6}",
        "column", "slope", "p-value", "direction", "sig."
    );
    for (column, trend) in trends {
        println!(
            "{:<20} {:>12.5} {:>12.5} {:<12} {:>6}",
            column,
            trend.slope,
            trend.p_value,
            trend.trend_direction.to_string(),
            if trend.is_significant { "yes" } else { "no" }
        );
    }
}

/// Print anomaly counts per column and the first few hits of each
pub fn print_anomaly_summary(rows: &[AnomalyRow], limit: usize) {
    if rows.is_empty() {
        println!("No anomalies found");
        return;
    }
    for (column, hits) in &rows.iter().chunk_by(|row| row.column.as_str()) {
        let hits: Vec<&AnomalyRow> = hits.collect();
        println!("Anomalies in '{column}': {} found", hits.len());
        for row in hits.iter().take(limit) {
            println!(
                "    row {:>6}  value {:>10.3}  score {:>8.3}  ({})",
                row.index, row.value, row.score, row.method
            );
        }
    }
}

/// Print a data quality report
pub fn print_quality_report(report: &DataQualityReport) {
    println!("Total records: {}", report.total_records);
    if let Some((first, last)) = report.date_range {
        println!("Date range: {first} .. {last}");
    }
    if !report.stations.is_empty() {
        println!("Stations ({}): {}", report.stations.len(), report.stations.join(", "));
    }
    println!("{:<20} {:>8} {:>8} {:>9}", "column", "nulls", "null %", "outliers");
    for (column, nulls) in &report.null_counts {
        let pct = report.null_percentages.get(column).copied().unwrap_or(0.0);
        let outliers = report
            .outlier_counts
            .get(column)
            .map_or_else(|| "-".to_string(), ToString::to_string);
        println!("{column:<20} {nulls:>8} {pct:>7.1}% {outliers:>9}");
    }
}
