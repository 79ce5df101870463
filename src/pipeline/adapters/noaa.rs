//! NOAA Climate Data Online adapter
//!
//! Queries the CDO v2 `/data` endpoint for GHCN-Daily observations and folds
//! the per-datatype rows into one [`DataRecord`] per station and day.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::error::{ClimateError, Result};
use crate::pipeline::ingestion::{DataRecord, DataSourceAdapter, FetchFuture};

/// Public CDO v2 endpoint
pub const DEFAULT_BASE_URL: &str = "https://www.ncei.noaa.gov/cdo-web/api/v2";
/// GHCN-Daily dataset
pub const DEFAULT_DATASET_ID: &str = "GHCND";
/// Largest page the API serves
pub const DEFAULT_PAGE_LIMIT: usize = 1000;

const SOURCE: &str = "noaa";
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Deserialize)]
struct DataResponse {
    #[serde(default)]
    metadata: Option<Metadata>,
    #[serde(default)]
    results: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    resultset: ResultSet,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    offset: usize,
    count: usize,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    datatype: String,
    station: String,
    value: f64,
}

#[derive(Debug, Default)]
struct DailyValues {
    tavg: Option<f64>,
    tmax: Option<f64>,
    tmin: Option<f64>,
    prcp: Option<f64>,
}

impl DailyValues {
    fn temperature(&self) -> Option<f64> {
        self.tavg.or_else(|| match (self.tmax, self.tmin) {
            (Some(max), Some(min)) => Some((max + min) / 2.0),
            _ => None,
        })
    }
}

/// Adapter for NOAA GHCN-Daily data
#[derive(Debug, Clone)]
pub struct NoaaAdapter {
    client: reqwest::Client,
    api_token: Option<String>,
    base_url: String,
    dataset_id: String,
    station_ids: Vec<String>,
    page_limit: usize,
}

impl NoaaAdapter {
    /// Create an adapter for the public endpoint
    pub fn new(api_token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("climate-analyzer/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_token,
            base_url: DEFAULT_BASE_URL.to_string(),
            dataset_id: DEFAULT_DATASET_ID.to_string(),
            station_ids: Vec::new(),
            page_limit: DEFAULT_PAGE_LIMIT,
        })
    }

    /// Use another endpoint root
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Restrict the query to these stations (e.g. `GHCND:USW00094728`)
    #[must_use]
    pub fn with_stations(mut self, station_ids: Vec<String>) -> Self {
        self.station_ids = station_ids;
        self
    }

    /// Query another dataset
    #[must_use]
    pub fn with_dataset(mut self, dataset_id: impl Into<String>) -> Self {
        self.dataset_id = dataset_id.into();
        self
    }

    /// Rows requested per page
    #[must_use]
    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    async fn fetch_page(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        offset: usize,
    ) -> Result<DataResponse> {
        let url = format!("{}/data", self.base_url);
        let mut query = vec![
            ("datasetid", self.dataset_id.clone()),
            ("startdate", start.format("%Y-%m-%d").to_string()),
            ("enddate", end.format("%Y-%m-%d").to_string()),
            ("units", "metric".to_string()),
            ("limit", self.page_limit.to_string()),
            ("offset", offset.to_string()),
        ];
        for station in &self.station_ids {
            query.push(("stationid", station.clone()));
        }

        let mut request = self.client.get(&url).query(&query);
        if let Some(token) = &self.api_token {
            request = request.header("token", token);
        }

        let response = request
            .send()
            .await
            .context("Failed to send request to NOAA API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClimateError::DataSource {
                source_name: SOURCE.to_string(),
                message: format!("HTTP {status}: {body}"),
            }
            .into());
        }

        response
            .json::<DataResponse>()
            .await
            .context("Failed to parse NOAA API response")
    }

    async fn fetch_all(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DataRecord>> {
        log::info!("Fetching NOAA data: {start} to {end}");

        let mut observations = Vec::new();
        let mut offset = 1;
        loop {
            let page = self.fetch_page(start, end, offset).await?;
            let received = page.results.len();
            observations.extend(page.results);

            let Some(resultset) = page.metadata.map(|m| m.resultset) else {
                break;
            };
            let next = resultset.offset + resultset.limit;
            if received == 0 || next > resultset.count {
                break;
            }
            log::debug!("NOAA page at offset {offset}: {received} of {}", resultset.count);
            offset = next;
        }

        let records = fold_observations(observations);
        log::info!("Fetched {} daily records from NOAA", records.len());
        Ok(records)
    }
}

fn fold_observations(observations: Vec<Observation>) -> Vec<DataRecord> {
    let mut days: BTreeMap<(String, NaiveDateTime), DailyValues> = BTreeMap::new();
    for obs in observations {
        let Ok(timestamp) = NaiveDateTime::parse_from_str(&obs.date, DATE_FORMAT) else {
            log::warn!("Skipping NOAA observation with bad date '{}'", obs.date);
            continue;
        };
        let entry = days.entry((obs.station, timestamp)).or_default();
        match obs.datatype.as_str() {
            "TAVG" => entry.tavg = Some(obs.value),
            "TMAX" => entry.tmax = Some(obs.value),
            "TMIN" => entry.tmin = Some(obs.value),
            "PRCP" => entry.prcp = Some(obs.value),
            _ => {}
        }
    }

    days.into_iter()
        .map(|((station_id, timestamp), values)| DataRecord {
            timestamp,
            station_id,
            temperature: values.temperature(),
            precipitation: values.prcp,
            humidity: None,
            pressure: None,
            source: SOURCE.to_string(),
        })
        .collect()
}

impl DataSourceAdapter for NoaaAdapter {
    fn fetch<'a>(&'a self, start: NaiveDate, end: NaiveDate) -> FetchFuture<'a> {
        Box::pin(self.fetch_all(start, end))
    }

    fn validate(&self, record: &DataRecord) -> bool {
        record.has_plausible_temperature()
    }
}
