use climate_analyzer::analysis::anomaly::{
    DEFAULT_IQR_MULTIPLIER, METHOD_IQR, METHOD_ISOLATION_FOREST, METHOD_ZSCORE,
};
use climate_analyzer::{AnomalyDetector, ClimateError, climate_error};

use crate::utils::{data_with_outliers, normal_data};

fn detector() -> AnomalyDetector {
    AnomalyDetector::new(0.1).expect("valid contamination")
}

fn indices(anomalies: &[climate_analyzer::Anomaly]) -> Vec<usize> {
    anomalies.iter().map(|a| a.index).collect()
}

#[test]
fn test_iqr_detects_outliers() {
    let anomalies = detector().detect_iqr(&data_with_outliers(), DEFAULT_IQR_MULTIPLIER);
    let found = indices(&anomalies);
    assert!(found.contains(&10));
    assert!(found.contains(&50));
    assert!(anomalies.iter().all(|a| a.method == METHOD_IQR));
}

#[test]
fn test_zscore_detects_outliers() {
    let anomalies = detector().detect_zscore(&data_with_outliers(), 3.0);
    let found = indices(&anomalies);
    assert!(found.contains(&10));
    assert!(found.contains(&50));
    assert!(anomalies.iter().all(|a| a.method == METHOD_ZSCORE && a.score > 3.0));
}

#[test]
fn test_isolation_forest_detects_outliers() {
    let anomalies = detector()
        .detect_isolation_forest(&data_with_outliers())
        .unwrap();
    assert!(!anomalies.is_empty());
    assert!(anomalies.len() <= 11);
    assert!(anomalies.iter().all(|a| a.method == METHOD_ISOLATION_FOREST));
    let found = indices(&anomalies);
    assert!(found.contains(&10));
    assert!(found.contains(&50));
}

#[test]
fn test_isolation_forest_is_deterministic() {
    let data = data_with_outliers();
    let first = detector().detect_isolation_forest(&data).unwrap();
    let second = detector().detect_isolation_forest(&data).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_normal_data_few_anomalies() {
    let anomalies = detector().detect_zscore(&normal_data(100, 42), 3.0);
    assert!(anomalies.len() < 5);
}

#[test]
fn test_anomaly_has_required_fields() {
    let anomalies = detector().detect_iqr(&data_with_outliers(), DEFAULT_IQR_MULTIPLIER);
    let first = anomalies.first().expect("at least one anomaly");
    let data = data_with_outliers();
    assert_eq!(first.value, data[first.index]);
    assert!(first.score > 0.0);
    assert!(first.timestamp.is_none());
}

#[test]
fn test_constant_series() {
    let data = vec![4.0; 20];
    let detector = detector();
    assert!(detector.detect_zscore(&data, 3.0).is_empty());
    assert!(detector.detect_iqr(&data, DEFAULT_IQR_MULTIPLIER).is_empty());
}

#[test]
fn test_empty_and_tiny_input() {
    let detector = detector();
    assert!(detector.detect_iqr(&[], DEFAULT_IQR_MULTIPLIER).is_empty());
    assert!(detector.detect_zscore(&[], 3.0).is_empty());
    assert!(detector.detect_isolation_forest(&[1.0]).unwrap().is_empty());
}

#[test]
fn test_detect_all_keys() {
    let results = detector().detect_all(&data_with_outliers()).unwrap();
    let keys: Vec<&str> = results.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["iqr", "isolation_forest", "zscore"]);
}

#[test]
fn test_invalid_contamination() {
    for contamination in [0.0, 0.51, -1.0] {
        let err = AnomalyDetector::new(contamination).unwrap_err();
        assert!(matches!(
            climate_error(&err),
            Some(ClimateError::InvalidParameter { name: "contamination", .. })
        ));
    }
    assert!(AnomalyDetector::new(0.5).is_ok());
}

#[test]
fn test_isolation_forest_rejects_non_finite_values() {
    let detector = detector();
    for data in [
        vec![1.0, 2.0, 3.0, f64::INFINITY, 4.0],
        vec![1.0, f64::NAN, 3.0],
    ] {
        let err = detector.detect_isolation_forest(&data).unwrap_err();
        assert!(matches!(
            climate_error(&err),
            Some(ClimateError::InvalidParameter { name: "data", .. })
        ));
        assert!(detector.detect_all(&data).is_err());
    }
}

#[test]
fn test_isolation_forest_handles_extreme_finite_range() {
    let anomalies = detector()
        .detect_isolation_forest(&[-1.0e308, 1.0e308, 0.0, 1.0])
        .unwrap();
    assert!(anomalies.len() <= 4);
}

#[test]
fn test_iqr_with_nan_flags_nothing() {
    let mut data = data_with_outliers();
    data[3] = f64::NAN;
    assert!(detector().detect_iqr(&data, DEFAULT_IQR_MULTIPLIER).is_empty());
}
