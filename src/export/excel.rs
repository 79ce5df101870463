//! Excel workbook export

use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use rust_xlsxwriter::{Workbook, Worksheet};

use super::{Exporter, log_export};
use crate::error::util::ensure_directory;
use crate::error::{ClimateError, Result};
use crate::utils::arrow::is_numeric;

/// Default worksheet name
pub const DEFAULT_SHEET_NAME: &str = "Data";
/// Rows available in a worksheet, header included
pub const MAX_SHEET_ROWS: usize = 1_048_576;
/// Columns available in a worksheet
pub const MAX_SHEET_COLUMNS: usize = 16_384;

/// Writes a single worksheet with a header row; null cells stay empty
#[derive(Debug, Clone)]
pub struct ExcelExporter {
    output_dir: PathBuf,
    sheet_name: String,
}

impl ExcelExporter {
    /// Exporter writing sheet `Data` into `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        ensure_directory(&output_dir, "excel export")?;
        Ok(Self {
            output_dir,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
        })
    }

    #[must_use]
    pub fn with_sheet_name(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = sheet_name.into();
        self
    }
}

fn write_column(sheet: &mut Worksheet, col: u16, array: &ArrayRef) -> Result<()> {
    match array.data_type() {
        DataType::Boolean => {
            if let Some(values) = array.as_any().downcast_ref::<BooleanArray>() {
                for (row, value) in (1u32..).zip(values.iter()) {
                    if let Some(value) = value {
                        sheet.write_boolean(row, col, value)?;
                    }
                }
            }
        }
        data_type if is_numeric(data_type) => {
            let converted = cast(array, &DataType::Float64)?;
            if let Some(values) = converted.as_any().downcast_ref::<Float64Array>() {
                for (row, value) in (1u32..).zip(values.iter()) {
                    if let Some(value) = value {
                        sheet.write_number(row, col, value)?;
                    }
                }
            }
        }
        _ => {
            let converted = cast(array, &DataType::Utf8)?;
            if let Some(values) = converted.as_any().downcast_ref::<StringArray>() {
                for (row, value) in (1u32..).zip(values.iter()) {
                    if let Some(value) = value {
                        sheet.write_string(row, col, value)?;
                    }
                }
            }
        }
    }
    Ok(())
}

impl Exporter for ExcelExporter {
    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn export(&self, batch: &RecordBatch, filename: &str) -> Result<PathBuf> {
        if batch.num_rows() >= MAX_SHEET_ROWS || batch.num_columns() > MAX_SHEET_COLUMNS {
            return Err(ClimateError::invalid_parameter(
                "batch",
                format!(
                    "{} rows by {} columns do not fit in one worksheet",
                    batch.num_rows(),
                    batch.num_columns()
                ),
            )
            .into());
        }

        let path = self.output_path(filename);
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(&self.sheet_name)?;

        let schema = batch.schema();
        for (col, (field, array)) in (0u16..).zip(schema.fields().iter().zip(batch.columns())) {
            sheet.write_string(0, col, field.name())?;
            write_column(sheet, col, array)?;
        }

        workbook
            .save(&path)
            .map_err(|e| anyhow::anyhow!("Failed to write workbook {}: {e}", path.display()))?;
        log_export(batch, &path);
        Ok(path)
    }
}
