use serde_json::json;
use tempfile::TempDir;

use climate_analyzer::analysis::anomaly::METHOD_ZSCORE;
use climate_analyzer::{
    AnalyzerConfig, ClimateAnalyzer, ClimateError, TrendDirection, climate_error, read_table,
};

use crate::utils::{float_batch, station_batch, station_csv, write_file};

fn analyzer(dir: &TempDir) -> ClimateAnalyzer {
    ClimateAnalyzer::new(AnalyzerConfig {
        data_dir: dir.path().to_path_buf(),
        output_dir: dir.path().join("output"),
        ..AnalyzerConfig::default()
    })
}

fn loaded(dir: &TempDir) -> ClimateAnalyzer {
    let file = write_file(dir.path(), "stations.csv", &station_csv());
    let mut app = analyzer(dir);
    app.load_data(&file).unwrap();
    app
}

#[test]
fn test_operations_need_data() {
    let dir = TempDir::new().unwrap();
    let mut app = analyzer(&dir);

    let no_data = |err: &anyhow::Error| matches!(climate_error(err), Some(ClimateError::NoData));
    assert!(no_data(&app.analyze_trends().unwrap_err()));
    assert!(no_data(&app.detect_anomalies(2.0).unwrap_err()));
    assert!(no_data(&app.quality_report().unwrap_err()));
    assert!(no_data(&app.export_results("out", "csv").unwrap_err()));
}

#[test]
fn test_unsupported_input_format() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "stations.txt", "a,b\n1,2\n");
    let err = analyzer(&dir).load_data(&file).unwrap_err();
    assert!(matches!(
        climate_error(&err),
        Some(ClimateError::UnsupportedFormat(ext)) if ext == ".txt"
    ));
}

#[test]
fn test_analyze_trends_per_numeric_column() {
    let dir = TempDir::new().unwrap();
    let app = loaded(&dir);
    assert_eq!(app.data().unwrap().num_rows(), 20);

    let trends = app.analyze_trends().unwrap();
    let columns: Vec<&str> = trends.keys().map(String::as_str).collect();
    assert_eq!(columns, vec!["precipitation", "temperature"]);
    assert!(trends["temperature"].slope > 0.0);
    assert_eq!(trends["temperature"].trend_direction, TrendDirection::Increasing);
}

#[test]
fn test_detect_anomalies_finds_spike() {
    let dir = TempDir::new().unwrap();
    let mut app = loaded(&dir);

    let batch = app.detect_anomalies(2.0).unwrap();
    assert_eq!(batch.num_rows(), 1);
    assert_eq!(batch.num_columns(), 5);

    let rows = app.anomaly_rows();
    assert_eq!(rows[0].column, "temperature");
    assert_eq!(rows[0].index, 14);
    assert!((rows[0].value - 45.0).abs() < 1e-12);
    assert_eq!(rows[0].method, METHOD_ZSCORE);
}

#[test]
fn test_anomaly_index_skips_nulls() {
    let dir = TempDir::new().unwrap();
    let mut app = analyzer(&dir);
    let values: Vec<Option<f64>> = (0..30)
        .map(|i| match i {
            2 => None,
            25 => Some(90.0),
            _ => Some(f64::from(i % 3)),
        })
        .collect();
    app.set_data(float_batch(&[("temperature", values)]));

    app.detect_anomalies(3.0).unwrap();
    let rows = app.anomaly_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].index, 25);
}

#[test]
fn test_loading_clears_anomalies() {
    let dir = TempDir::new().unwrap();
    let mut app = loaded(&dir);
    app.detect_anomalies(2.0).unwrap();
    assert!(app.anomalies().is_some());

    app.set_data(station_batch());
    assert!(app.anomalies().is_none());
    assert!(app.anomaly_rows().is_empty());
}

#[test]
fn test_export_results_formats() {
    let dir = TempDir::new().unwrap();
    let mut app = loaded(&dir);

    // Without anomalies the loaded data is exported
    let data_path = app.export_results("data", "parquet").unwrap();
    assert_eq!(read_table(&data_path).unwrap().num_rows(), 20);

    app.detect_anomalies(2.0).unwrap();
    let csv_path = app.export_results("anomalies", "csv").unwrap();
    assert_eq!(csv_path, dir.path().join("output").join("anomalies.csv"));
    let content = std::fs::read_to_string(&csv_path).unwrap();
    assert!(content.starts_with("column,index,value,score,method"));

    let json_path = app.export_results("anomalies", "json").unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
    assert_eq!(parsed[0]["column"], "temperature");
    assert_eq!(parsed[0]["index"], 14);

    let xlsx_path = app.export_results("anomalies", "excel").unwrap();
    assert_eq!(xlsx_path, dir.path().join("output").join("anomalies.xlsx"));

    let err = app.export_results("anomalies", "xls").unwrap_err();
    assert!(matches!(
        climate_error(&err),
        Some(ClimateError::UnknownFormat(name)) if name == "xls"
    ));
}

#[test]
fn test_quality_report() {
    let dir = TempDir::new().unwrap();
    let app = loaded(&dir);
    let report = app.quality_report().unwrap();

    assert_eq!(report.total_records, 20);
    assert_eq!(report.stations, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(report.null_counts["temperature"], 0);
    assert_eq!(report.outlier_counts["temperature"], 1);
    let (first, last) = report.date_range.unwrap();
    assert_eq!(first.format("%Y-%m-%d").to_string(), "2020-01-01");
    assert_eq!(last.format("%Y-%m-%d").to_string(), "2020-01-20");
}

#[test]
fn test_run_registered_analyzer() {
    let dir = TempDir::new().unwrap();
    let app = loaded(&dir);
    assert_eq!(app.analyzers(), vec!["anomaly", "quality", "trend"]);

    let result = app
        .run_analyzer("trend", &json!({ "column": "temperature" }))
        .unwrap();
    assert_eq!(result.analyzer, "trend");
    assert_eq!(result.metrics["observations"], 20);
}

#[test]
fn test_run_analyzer_uses_configured_settings() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "stations.csv", &station_csv());
    let mut app = ClimateAnalyzer::new(AnalyzerConfig {
        output_dir: dir.path().join("output"),
        significance_level: 0.01,
        ..AnalyzerConfig::default()
    });
    app.load_data(&file).unwrap();

    let configured = app
        .run_analyzer("trend", &json!({ "column": "temperature" }))
        .unwrap();
    assert_eq!(configured.parameters["significance_level"], 0.01);

    let explicit = app
        .run_analyzer(
            "trend",
            &json!({ "column": "temperature", "significance_level": 0.1 }),
        )
        .unwrap();
    assert_eq!(explicit.parameters["significance_level"], 0.1);
}
