use climate_analyzer::analysis::trend::{DEFAULT_PERIOD, MIN_TREND_POINTS};
use climate_analyzer::{ClimateError, TrendAnalyzer, TrendDirection, climate_error};

use crate::utils::normal_data;

#[test]
fn test_linear_increase() {
    let data: Vec<f64> = (1..=10).map(f64::from).collect();
    let result = TrendAnalyzer::default().analyze(&data).unwrap();

    assert!((result.slope - 1.0).abs() < 1e-12);
    assert!((result.intercept - 1.0).abs() < 1e-12);
    assert_eq!(result.trend_direction, TrendDirection::Increasing);
    assert!(result.is_significant);
    assert!(result.p_value < 0.001);
    let (lo, hi) = result.confidence_interval;
    assert!(lo <= result.slope && result.slope <= hi);
}

#[test]
fn test_linear_decrease() {
    let data: Vec<f64> = (0..30).map(|i| 100.0 - 0.5 * f64::from(i)).collect();
    let result = TrendAnalyzer::default().analyze(&data).unwrap();

    assert!((result.slope + 0.5).abs() < 1e-12);
    assert_eq!(result.trend_direction, TrendDirection::Decreasing);
    assert!(result.is_significant);
    let (lo, hi) = result.confidence_interval;
    assert!(lo <= hi);
}

#[test]
fn test_noise_is_not_significant_at_strict_level() {
    let analyzer = TrendAnalyzer::new(0.001).unwrap();
    let result = analyzer.analyze(&normal_data(60, 7)).unwrap();
    assert!(result.p_value > 0.0 && result.p_value <= 1.0);
    assert_eq!(result.is_significant, result.p_value < 0.001);
}

#[test]
fn test_mann_kendall_statistic() {
    // S = 45 for a strictly increasing series of ten values
    let data: Vec<f64> = (0..10).map(f64::from).collect();
    let mk = TrendAnalyzer::default().mann_kendall_test(&data).unwrap();
    let var_s: f64 = 10.0 * 9.0 * 25.0 / 18.0;
    assert!((mk.z - 44.0 / var_s.sqrt()).abs() < 1e-12);
    assert_eq!(mk.direction, TrendDirection::Increasing);
}

#[test]
fn test_short_series_rejected() {
    let err = TrendAnalyzer::default().analyze(&[1.0, 2.0]).unwrap_err();
    assert!(matches!(
        climate_error(&err),
        Some(ClimateError::InsufficientData { required, actual: 2, .. }) if *required == MIN_TREND_POINTS
    ));
}

#[test]
fn test_invalid_significance_level() {
    assert!(TrendAnalyzer::new(0.0).is_err());
    assert!(TrendAnalyzer::new(1.0).is_err());
    assert!(TrendAnalyzer::new(0.1).is_ok());
}

#[test]
fn test_seasonal_decompose_components_sum() {
    let data: Vec<f64> = (0..48)
        .map(|i| {
            let month = f64::from(i % 12);
            0.1 * f64::from(i) + (month * std::f64::consts::PI / 6.0).sin()
        })
        .collect();
    let parts = TrendAnalyzer::default()
        .seasonal_decompose(&data, DEFAULT_PERIOD)
        .unwrap();

    assert_eq!(parts.trend.len(), data.len());
    assert_eq!(parts.seasonal.len(), data.len());
    for i in 0..data.len() {
        let total = parts.trend[i] + parts.seasonal[i] + parts.residual[i];
        assert!((total - data[i]).abs() < 1e-9);
    }
    // Seasonal component repeats with the period
    for i in DEFAULT_PERIOD..data.len() {
        assert!((parts.seasonal[i] - parts.seasonal[i - DEFAULT_PERIOD]).abs() < 1e-12);
    }
}

#[test]
fn test_seasonal_decompose_rejects_short_input() {
    let analyzer = TrendAnalyzer::default();
    assert!(analyzer.seasonal_decompose(&[1.0; 5], 12).is_err());
    assert!(analyzer.seasonal_decompose(&[1.0; 5], 0).is_err());
}

#[test]
fn test_nan_values_do_not_panic() {
    let data: Vec<f64> = (0..200)
        .map(|i| if i % 7 == 0 { f64::NAN } else { 0.1 * f64::from(i) })
        .collect();
    let analyzer = TrendAnalyzer::default();
    assert!(analyzer.sens_slope(&data).unwrap().is_nan());
    let result = analyzer.analyze(&data).unwrap();
    assert!(result.slope.is_nan());
    assert!(result.intercept.is_nan());
}
