use arrow::array::{Array, Float64Array};
use arrow::datatypes::DataType;

use climate_analyzer::pipeline::{
    DropNullsTransformer, InterpolateTransformer, InterpolationMethod, Pipeline, Transformer,
    UnitConversionTransformer,
};
use climate_analyzer::utils::arrow::optional_values;
use climate_analyzer::{ClimateError, climate_error};

use crate::utils::{float_batch, station_batch};

#[test]
fn test_drop_nulls_threshold() {
    let batch = float_batch(&[
        ("a", vec![Some(1.0), None, None, Some(4.0)]),
        ("b", vec![Some(1.0), Some(2.0), None, Some(f64::NAN)]),
    ]);

    // Row 1 and 3 have one null in two columns (ratio 0.5), row 2 has two
    let strict = DropNullsTransformer::default().transform(&batch).unwrap();
    assert_eq!(strict.num_rows(), 1);

    let lenient = DropNullsTransformer::new(None, 0.75).transform(&batch).unwrap();
    assert_eq!(lenient.num_rows(), 3);
}

#[test]
fn test_drop_nulls_selected_columns() {
    let batch = float_batch(&[
        ("a", vec![Some(1.0), None, Some(3.0)]),
        ("b", vec![None, None, None]),
    ]);
    let result = DropNullsTransformer::new(Some(vec!["a".to_string()]), 0.5)
        .transform(&batch)
        .unwrap();
    assert_eq!(result.num_rows(), 2);

    let missing = DropNullsTransformer::new(Some(vec!["zzz".to_string()]), 0.5);
    let err = missing.transform(&batch).unwrap_err();
    assert!(matches!(
        climate_error(&err),
        Some(ClimateError::ColumnNotFound { column }) if column == "zzz"
    ));
}

#[test]
fn test_empty_column_list_means_all_columns() {
    let batch = float_batch(&[
        ("a", vec![Some(1.0), None, None]),
        ("b", vec![Some(1.0), Some(2.0), None]),
    ]);
    let result = DropNullsTransformer::new(Some(vec![]), 0.5)
        .transform(&batch)
        .unwrap();
    assert_eq!(result.num_rows(), 1);

    let filled = InterpolateTransformer::new(InterpolationMethod::Forward, Some(vec![]))
        .transform(&batch)
        .unwrap();
    assert_eq!(
        optional_values(&filled, "a").unwrap(),
        vec![Some(1.0), Some(1.0), Some(1.0)]
    );
}

#[test]
fn test_interpolate_linear() {
    let batch = float_batch(&[(
        "temperature",
        vec![None, Some(2.0), None, Some(6.0), None],
    )]);
    let result = InterpolateTransformer::default().transform(&batch).unwrap();
    assert_eq!(
        optional_values(&result, "temperature").unwrap(),
        vec![None, Some(2.0), Some(4.0), Some(6.0), Some(6.0)]
    );
}

#[test]
fn test_interpolate_integer_column_becomes_float() {
    let batch = station_batch();
    let result = InterpolateTransformer::new(
        InterpolationMethod::Forward,
        Some(vec!["day".to_string(), "precipitation".to_string()]),
    )
    .transform(&batch)
    .unwrap();

    let schema = result.schema();
    assert_eq!(schema.field_with_name("day").unwrap().data_type(), &DataType::Float64);
    let precipitation = optional_values(&result, "precipitation").unwrap();
    assert_eq!(precipitation[3], precipitation[2]);
    assert!(precipitation.iter().all(Option::is_some));
}

#[test]
fn test_unit_conversion_keeps_nulls() {
    let batch = float_batch(&[("temperature", vec![Some(32.0), None, Some(212.0)])]);
    let converted = UnitConversionTransformer::new("temperature", "f_to_c")
        .unwrap()
        .transform(&batch)
        .unwrap();
    let values = converted
        .column(0)
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert!(values.value(0).abs() < 1e-12);
    assert!(values.is_null(1));
    assert!((values.value(2) - 100.0).abs() < 1e-12);
}

#[test]
fn test_unit_conversion_errors() {
    let err = UnitConversionTransformer::new("temperature", "kelvin").unwrap_err();
    assert!(matches!(
        climate_error(&err),
        Some(ClimateError::UnknownConversion(name)) if name == "kelvin"
    ));

    let batch = float_batch(&[("temperature", vec![Some(1.0)])]);
    let transformer = UnitConversionTransformer::new("rainfall", "mm_to_in").unwrap();
    assert!(transformer.transform(&batch).is_err());
}

#[test]
fn test_pipeline_chains_in_order() {
    let batch = float_batch(&[
        ("temperature", vec![Some(50.0), None, Some(68.0), None]),
        ("humidity", vec![Some(80.0), None, Some(70.0), Some(60.0)]),
    ]);
    let pipeline = Pipeline::new()
        .add(DropNullsTransformer::new(None, 0.75))
        .add(InterpolateTransformer::default())
        .add(UnitConversionTransformer::new("temperature", "f_to_c").unwrap());
    assert_eq!(pipeline.len(), 3);

    let result = pipeline.transform(&batch).unwrap();
    assert_eq!(result.num_rows(), 3);
    let temperature = optional_values(&result, "temperature").unwrap();
    assert!((temperature[0].unwrap() - 10.0).abs() < 1e-9);
    assert!((temperature[1].unwrap() - 20.0).abs() < 1e-9);
    assert!((temperature[2].unwrap() - 20.0).abs() < 1e-9);
}

#[test]
fn test_empty_pipeline_is_identity() {
    let batch = station_batch();
    let pipeline = Pipeline::new();
    assert!(pipeline.is_empty());
    assert_eq!(pipeline.transform(&batch).unwrap(), batch);
}
