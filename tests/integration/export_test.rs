use tempfile::TempDir;

use climate_analyzer::export::parquet::parse_compression;
use climate_analyzer::export::{
    CsvExporter, ExcelExporter, ExportFormat, Exporter, ExporterFactory, JsonExporter,
    JsonOrient, ParquetExporter,
};
use climate_analyzer::{ClimateError, climate_error, read_table};
use parquet::basic::Compression;

use crate::utils::station_batch;

#[test]
fn test_csv_export_with_delimiter() {
    let dir = TempDir::new().unwrap();
    let exporter = CsvExporter::new(dir.path().join("csv"))
        .unwrap()
        .with_delimiter(b';');
    let path = exporter.export(&station_batch(), "stations").unwrap();

    assert_eq!(path, dir.path().join("csv").join("stations.csv"));
    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("station_id;day;temperature;precipitation")
    );
    assert_eq!(lines.count(), 12);
}

#[test]
fn test_parquet_export_reads_back() {
    let dir = TempDir::new().unwrap();
    let exporter = ParquetExporter::new(dir.path())
        .unwrap()
        .with_compression("zstd")
        .unwrap();
    let batch = station_batch();
    let path = exporter.export(&batch, "stations").unwrap();

    assert_eq!(path.extension().unwrap(), "parquet");
    let reloaded = read_table(&path).unwrap();
    assert_eq!(reloaded.num_rows(), batch.num_rows());
    assert_eq!(reloaded.column(2), batch.column(2));
}

#[test]
fn test_json_records_and_lines() {
    let dir = TempDir::new().unwrap();
    let batch = station_batch();

    let records = JsonExporter::new(dir.path()).unwrap();
    let path = records.export(&batch, "records").unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    let rows = parsed.as_array().unwrap();
    assert_eq!(rows.len(), 12);
    assert_eq!(rows[0]["station_id"], "A");
    // Null cells are left out of the row object
    assert!(rows[3].get("precipitation").is_none());

    let lines = JsonExporter::new(dir.path())
        .unwrap()
        .with_orient("lines".parse::<JsonOrient>().unwrap());
    let path = lines.export(&batch, "lines").unwrap();
    let content = std::fs::read_to_string(path).unwrap();
    assert_eq!(content.lines().count(), 12);
    for line in content.lines() {
        let row: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(row.is_object());
    }
}

#[test]
fn test_factory_formats() {
    let dir = TempDir::new().unwrap();
    for format in ExportFormat::ALL {
        let exporter = ExporterFactory::create(format.as_str(), dir.path()).unwrap();
        assert_eq!(exporter.extension(), format.extension());
        let path = exporter.export(&station_batch(), "all").unwrap();
        assert!(path.exists());
    }

    let err = ExporterFactory::create("xlsx", dir.path()).unwrap_err();
    assert!(matches!(
        climate_error(&err),
        Some(ClimateError::UnknownFormat(name)) if name == "xlsx"
    ));
}

#[test]
fn test_compression_names() {
    assert_eq!(parse_compression("snappy").unwrap(), Compression::SNAPPY);
    assert_eq!(parse_compression("none").unwrap(), Compression::UNCOMPRESSED);
    assert!(matches!(
        parse_compression("gzip").unwrap(),
        Compression::GZIP(_)
    ));
    assert!(parse_compression("lz4-raw-ish").is_err());
    assert!("xml".parse::<JsonOrient>().is_err());
}

#[test]
fn test_parquet_directory_reads_as_one_table() {
    let dir = TempDir::new().unwrap();
    let exporter = ParquetExporter::new(dir.path().join("parts")).unwrap();
    exporter.export(&station_batch(), "part-0").unwrap();
    exporter.export(&station_batch(), "part-1").unwrap();

    let combined = read_table(&dir.path().join("parts")).unwrap();
    assert_eq!(combined.num_rows(), 24);
}

#[test]
fn test_excel_export_writes_workbook() {
    let dir = TempDir::new().unwrap();
    let exporter = ExcelExporter::new(dir.path().join("xlsx")).unwrap();
    let path = exporter.export(&station_batch(), "stations").unwrap();

    assert_eq!(path, dir.path().join("xlsx").join("stations.xlsx"));
    // xlsx workbooks are zip archives
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..2], b"PK");

    let renamed = ExcelExporter::new(dir.path())
        .unwrap()
        .with_sheet_name("Stations");
    assert!(renamed.export(&station_batch(), "named").unwrap().exists());

    let invalid = ExcelExporter::new(dir.path())
        .unwrap()
        .with_sheet_name("bad/name");
    assert!(invalid.export(&station_batch(), "invalid").is_err());
}

#[test]
fn test_json_lines_has_one_object_per_row() {
    let dir = TempDir::new().unwrap();
    let exporter = JsonExporter::new(dir.path()).unwrap().with_orient(JsonOrient::Lines);
    let path = exporter.export(&station_batch(), "ndjson").unwrap();

    let content = std::fs::read_to_string(path).unwrap();
    assert!(!content.trim_start().starts_with('['));
    let rows: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(rows.len(), 12);
    assert_eq!(rows[1]["station_id"], "B");
    assert_eq!(rows[1]["day"], 2);
    assert!(rows[3].get("precipitation").is_none());
}
