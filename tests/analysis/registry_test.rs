use serde_json::json;

use climate_analyzer::analysis::base::{AnalyzerRunner, QualityAnalyzer};
use climate_analyzer::{Analyzer, AnalyzerRegistry, ClimateError, climate_error};

use crate::utils::{float_batch, station_batch};

#[test]
fn test_default_analyzers_listed() {
    let registry = AnalyzerRegistry::with_defaults();
    assert_eq!(registry.list_analyzers(), vec!["anomaly", "quality", "trend"]);
}

#[test]
fn test_unknown_analyzer() {
    let registry = AnalyzerRegistry::with_defaults();
    let err = registry.get("fourier", &json!({})).err().expect("unknown name");
    assert!(matches!(
        climate_error(&err),
        Some(ClimateError::UnknownAnalyzer(name)) if name == "fourier"
    ));
}

#[test]
fn test_trend_analyzer_metrics() {
    let registry = AnalyzerRegistry::with_defaults();
    let analyzer = registry
        .get("trend", &json!({ "column": "temperature" }))
        .unwrap();
    let result = analyzer.run(&station_batch()).unwrap();

    assert_eq!(result.analyzer, "trend");
    assert_eq!(result.parameters["column"], "temperature");
    assert_eq!(result.metrics["trend_direction"], "increasing");
    assert_eq!(result.metrics["is_significant"], true);
    assert!((result.metrics["slope"].as_f64().unwrap() - 0.5).abs() < 1e-12);
    assert_eq!(result.metrics["observations"], 12);
}

#[test]
fn test_trend_analyzer_requires_column_parameter() {
    let registry = AnalyzerRegistry::with_defaults();
    assert!(registry.get("trend", &json!({})).is_err());
}

#[test]
fn test_validation_failure_is_reported() {
    let registry = AnalyzerRegistry::with_defaults();
    let analyzer = registry.get("trend", &json!({ "column": "missing" })).unwrap();
    let err = analyzer.run(&station_batch()).unwrap_err();
    assert!(matches!(
        climate_error(&err),
        Some(ClimateError::InvalidInput { analyzer }) if analyzer == "trend"
    ));
}

#[test]
fn test_anomaly_analyzer_maps_rows() {
    let mut values: Vec<Option<f64>> = (0..40).map(|i| Some(f64::from(i % 5))).collect();
    values[3] = None;
    values[20] = Some(500.0);
    let batch = float_batch(&[("temperature", values)]);

    let registry = AnalyzerRegistry::with_defaults();
    let analyzer = registry
        .get("anomaly", &json!({ "column": "temperature", "zscore_threshold": 3.0 }))
        .unwrap();
    let result = analyzer.run(&batch).unwrap();

    let data = result.data.expect("anomaly details");
    let zscore_rows: Vec<u64> = data["zscore"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["index"].as_u64().unwrap())
        .collect();
    assert_eq!(zscore_rows, vec![20]);
    assert_eq!(result.metrics["observations"], 39);
}

#[test]
fn test_custom_analyzer_registration() {
    let mut registry = AnalyzerRegistry::with_defaults();
    registry.register("summary", |_| {
        Ok(Box::new(QualityAnalyzer::default()) as Box<dyn Analyzer>)
    });
    assert!(registry.list_analyzers().contains(&"summary".to_string()));
    assert!(registry.get("summary", &json!({})).is_ok());
}

#[test]
fn test_runner_keeps_results() {
    let registry = AnalyzerRegistry::with_defaults();
    let mut runner = AnalyzerRunner::new(registry.get("quality", &json!({})).unwrap());

    let err = runner.to_record_batch().unwrap_err();
    assert!(matches!(climate_error(&err), Some(ClimateError::NoResults)));

    let result = runner.run(&station_batch()).unwrap();
    assert_eq!(result.metrics["total_records"], 12);
    assert_eq!(result.metrics["stations"], json!(["A", "B"]));

    let batch = runner.to_record_batch().unwrap();
    assert_eq!(batch.num_rows(), 1);
    let schema = batch.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, ["analyzer", "timestamp", "parameters", "metrics", "data"]);
    assert!(schema.field_with_name("data").unwrap().is_nullable());
    assert_eq!(batch.column(4).null_count(), 1);
    assert!(runner.results().is_some());
}

#[test]
fn test_anomaly_analyzer_rejects_infinite_values() {
    let registry = AnalyzerRegistry::with_defaults();
    let analyzer = registry
        .get("anomaly", &json!({ "column": "temperature" }))
        .unwrap();
    let batch = float_batch(&[(
        "temperature",
        vec![Some(1.0), Some(2.0), Some(f64::INFINITY), Some(4.0), None],
    )]);

    let err = analyzer.run(&batch).unwrap_err();
    assert!(matches!(
        climate_error(&err),
        Some(ClimateError::InvalidParameter { name: "data", .. })
    ));
}
