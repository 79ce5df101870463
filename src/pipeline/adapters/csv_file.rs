//! Local CSV station files

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::Result;
use crate::pipeline::ingestion::{DataRecord, DataSourceAdapter, FetchFuture};
use crate::utils::arrow::{optional_values, string_values, timestamp_values};
use crate::utils::date_parser::DateParser;
use crate::utils::io::read_table;
use crate::utils::logging::log_warning;

const SOURCE: &str = "csv";

/// Reads records from a CSV file with `timestamp` and `station_id` columns
///
/// Timestamps Arrow cannot cast (day-first or month-name dates) go through
/// [`DateParser`] with the most common format among them. `temperature`, `precipitation`, `humidity` and `pressure` are read when
/// present.
#[derive(Debug, Clone)]
pub struct CsvFileAdapter {
    path: PathBuf,
}

impl CsvFileAdapter {
    /// Adapter over a single file
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DataRecord>> {
        let batch = read_table(&self.path)?;
        let schema = batch.schema();
        let timestamps = fill_unparsed_timestamps(
            timestamp_values(&batch, "timestamp")?,
            &string_values(&batch, "timestamp")?,
            &self.path,
        );
        let stations = string_values(&batch, "station_id")?;
        let optional = |name: &str| -> Result<Vec<Option<f64>>> {
            if schema.index_of(name).is_ok() {
                optional_values(&batch, name)
            } else {
                Ok(vec![None; batch.num_rows()])
            }
        };
        let temperature = optional("temperature")?;
        let precipitation = optional("precipitation")?;
        let humidity = optional("humidity")?;
        let pressure = optional("pressure")?;

        let records = (0..batch.num_rows())
            .filter_map(|i| {
                let timestamp = timestamps[i]?;
                let date = timestamp.date();
                if date < start || date > end {
                    return None;
                }
                Some(DataRecord {
                    timestamp,
                    station_id: stations[i].clone().unwrap_or_default(),
                    temperature: temperature[i],
                    precipitation: precipitation[i],
                    humidity: humidity[i],
                    pressure: pressure[i],
                    source: SOURCE.to_string(),
                })
            })
            .collect();
        Ok(records)
    }
}

fn fill_unparsed_timestamps(
    cast: Vec<Option<NaiveDateTime>>,
    raw: &[Option<String>],
    path: &Path,
) -> Vec<Option<NaiveDateTime>> {
    let unparsed: Vec<&str> = cast
        .iter()
        .zip(raw)
        .filter_map(|(ts, s)| if ts.is_none() { s.as_deref() } else { None })
        .collect();
    if unparsed.is_empty() {
        return cast;
    }

    let mut parser = DateParser::new(DateParser::detect_format(&unparsed));
    let mut skipped = 0usize;
    let resolved = cast
        .into_iter()
        .zip(raw)
        .map(|(ts, s)| {
            ts.or_else(|| {
                let parsed = s
                    .as_deref()
                    .and_then(|s| parser.parse(s, true))
                    .and_then(|d| d.and_hms_opt(0, 0, 0));
                if parsed.is_none() {
                    skipped += 1;
                }
                parsed
            })
        })
        .collect();

    if skipped > 0 {
        log_warning(
            &format!("Skipped {skipped} rows with unreadable timestamps"),
            Some(path),
        );
    }
    resolved
}

impl DataSourceAdapter for CsvFileAdapter {
    fn fetch<'a>(&'a self, start: NaiveDate, end: NaiveDate) -> FetchFuture<'a> {
        Box::pin(async move {
            let adapter = self.clone();
            tokio::task::spawn_blocking(move || adapter.load(start, end)).await?
        })
    }

    fn validate(&self, record: &DataRecord) -> bool {
        !record.station_id.is_empty()
            && DateParser::validate(record.timestamp.date())
            && record.has_plausible_temperature()
    }
}
