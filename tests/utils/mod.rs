use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Standard normal samples from a seeded generator (Box-Muller)
#[must_use]
pub fn normal_data(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let u1: f64 = 1.0 - rng.random::<f64>();
            let u2: f64 = rng.random::<f64>();
            (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
        })
        .collect()
}

/// 100 normal samples with outliers planted at rows 10 (+10) and 50 (-10)
#[must_use]
pub fn data_with_outliers() -> Vec<f64> {
    let mut data = normal_data(100, 42);
    data[10] = 10.0;
    data[50] = -10.0;
    data
}

/// Build a batch from named nullable float columns
#[must_use]
pub fn float_batch(columns: &[(&str, Vec<Option<f64>>)]) -> RecordBatch {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, _)| Field::new(*name, DataType::Float64, true))
        .collect();
    let arrays: Vec<ArrayRef> = columns
        .iter()
        .map(|(_, values)| Arc::new(Float64Array::from(values.clone())) as ArrayRef)
        .collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).expect("valid test batch")
}

/// Twelve daily observations for two stations with a warming trend
#[must_use]
pub fn station_batch() -> RecordBatch {
    let n = 12;
    let stations: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "A" } else { "B" }).collect();
    let temperature: Vec<f64> = (0..n).map(|i| 10.0 + i as f64 * 0.5).collect();
    let precipitation: Vec<Option<f64>> = (0..n)
        .map(|i| if i == 3 { None } else { Some((i % 4) as f64) })
        .collect();
    let day: Vec<i64> = (1..=n as i64).collect();

    let schema = Schema::new(vec![
        Field::new("station_id", DataType::Utf8, false),
        Field::new("day", DataType::Int64, false),
        Field::new("temperature", DataType::Float64, true),
        Field::new("precipitation", DataType::Float64, true),
    ]);
    RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(StringArray::from(stations)),
            Arc::new(Int64Array::from(day)),
            Arc::new(Float64Array::from(temperature)),
            Arc::new(Float64Array::from(precipitation)),
        ],
    )
    .expect("valid station batch")
}

/// Write `content` to `dir/name` and return the path
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write test file");
    path
}

/// CSV with a timestamp column, two stations and one temperature spike
#[must_use]
pub fn station_csv() -> String {
    let mut csv = String::from("timestamp,station_id,temperature,precipitation\n");
    for day in 1..=20 {
        let temperature = if day == 15 { 45.0 } else { 5.0 + f64::from(day) * 0.1 };
        let station = if day % 2 == 0 { "A" } else { "B" };
        csv.push_str(&format!(
            "2020-01-{day:02}T00:00:00,{station},{temperature:.1},{}\n",
            day % 3
        ));
    }
    csv
}
