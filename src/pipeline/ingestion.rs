//! Data ingestion
//!
//! Adapters fetch [`DataRecord`]s from a source for a date range; the
//! [`IngestionPipeline`] validates them, converts them to a record batch and
//! persists batches as Parquet.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Context;
use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{NaiveDate, NaiveDateTime};
use futures::future::join_all;
use parquet::basic::Compression;
use serde::{Deserialize, Serialize};

use crate::error::util::ensure_directory;
use crate::error::{ClimateError, Result};
use crate::utils::io::write_parquet;

/// Lowest plausible air temperature in °C
pub const MIN_TEMPERATURE_C: f64 = -100.0;
/// Highest plausible air temperature in °C
pub const MAX_TEMPERATURE_C: f64 = 60.0;

/// A single station observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRecord {
    pub timestamp: NaiveDateTime,
    pub station_id: String,
    pub temperature: Option<f64>,
    pub precipitation: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub source: String,
}

impl DataRecord {
    /// Whether the temperature, if present, lies in the plausible range
    #[must_use]
    pub fn has_plausible_temperature(&self) -> bool {
        self.temperature
            .is_none_or(|t| (MIN_TEMPERATURE_C..=MAX_TEMPERATURE_C).contains(&t))
    }
}

/// Future returned by [`DataSourceAdapter::fetch`]
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<DataRecord>>> + Send + 'a>>;

/// A source of station records
pub trait DataSourceAdapter: Send + Sync {
    /// Fetch all records between `start` and `end` (inclusive)
    fn fetch<'a>(&'a self, start: NaiveDate, end: NaiveDate) -> FetchFuture<'a>;

    /// Whether a record is acceptable
    fn validate(&self, record: &DataRecord) -> bool;
}

/// Arrow schema of an ingested batch
#[must_use]
pub fn record_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            false,
        ),
        Field::new("station_id", DataType::Utf8, false),
        Field::new("temperature", DataType::Float64, true),
        Field::new("precipitation", DataType::Float64, true),
        Field::new("humidity", DataType::Float64, true),
        Field::new("pressure", DataType::Float64, true),
        Field::new("source", DataType::Utf8, false),
    ]))
}

/// Convert records to a record batch with [`record_schema`]
pub fn records_to_batch(records: &[DataRecord]) -> Result<RecordBatch> {
    let timestamps: TimestampMillisecondArray = records
        .iter()
        .map(|r| Some(r.timestamp.and_utc().timestamp_millis()))
        .collect();
    let stations: StringArray = records.iter().map(|r| Some(r.station_id.as_str())).collect();
    let numeric = |get: fn(&DataRecord) -> Option<f64>| -> ArrayRef {
        Arc::new(records.iter().map(get).collect::<Float64Array>())
    };
    let sources: StringArray = records.iter().map(|r| Some(r.source.as_str())).collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(timestamps),
        Arc::new(stations),
        numeric(|r| r.temperature),
        numeric(|r| r.precipitation),
        numeric(|r| r.humidity),
        numeric(|r| r.pressure),
        Arc::new(sources),
    ];

    RecordBatch::try_new(record_schema(), columns)
        .map_err(|e| anyhow::anyhow!("Failed to build ingestion batch: {e}"))
}

/// Runs registered adapters and stores their output
pub struct IngestionPipeline {
    output_dir: PathBuf,
    adapters: BTreeMap<String, Box<dyn DataSourceAdapter>>,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("output_dir", &self.output_dir)
            .field("adapters", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl IngestionPipeline {
    /// Create a pipeline writing into `output_dir`, creating it if needed
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        ensure_directory(&output_dir, "ingestion output")?;
        Ok(Self {
            output_dir,
            adapters: BTreeMap::new(),
        })
    }

    /// Output directory
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Register an adapter under `name`, replacing any previous one
    pub fn register_adapter(
        &mut self,
        name: impl Into<String>,
        adapter: impl DataSourceAdapter + 'static,
    ) {
        self.adapters.insert(name.into(), Box::new(adapter));
    }

    /// Names of the registered sources
    #[must_use]
    pub fn sources(&self) -> Vec<&str> {
        self.adapters.keys().map(String::as_str).collect()
    }

    /// Fetch from `source`, dropping records that fail validation
    pub async fn ingest(&self, source: &str, start: NaiveDate, end: NaiveDate) -> Result<RecordBatch> {
        let adapter = self
            .adapters
            .get(source)
            .ok_or_else(|| ClimateError::UnknownSource(source.to_string()))?;

        log::info!("Ingesting {source} data: {start} to {end}");
        let fetched = adapter.fetch(start, end).await?;
        let total = fetched.len();

        let records: Vec<DataRecord> = fetched
            .into_iter()
            .filter(|record| {
                let valid = adapter.validate(record);
                if !valid {
                    log::warn!("Invalid record: {record:?}");
                }
                valid
            })
            .collect();

        log::info!("Accepted {} of {} records from {source}", records.len(), total);
        records_to_batch(&records)
    }

    /// Fetch every registered source concurrently
    ///
    /// Fails with the first source error, naming the source.
    pub async fn ingest_all(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<String, RecordBatch>> {
        let futures = self
            .adapters
            .keys()
            .map(|name| async move { (name, self.ingest(name, start, end).await) });
        let results = join_all(futures).await;

        let mut batches = BTreeMap::new();
        for (name, result) in results {
            let batch = result.with_context(|| format!("Failed to ingest source '{name}'"))?;
            batches.insert(name.clone(), batch);
        }
        Ok(batches)
    }

    /// Write a batch as Parquet under the output directory
    pub fn save(&self, batch: &RecordBatch, filename: &str) -> Result<PathBuf> {
        let output_path = self.output_dir.join(filename);
        write_parquet(batch, &output_path, Compression::SNAPPY)?;
        log::info!(
            "Saved {} records to {}",
            batch.num_rows(),
            output_path.display()
        );
        Ok(output_path)
    }
}
