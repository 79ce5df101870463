//! JSON export

use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use arrow::json::{ArrayWriter, LineDelimitedWriter};
use arrow::record_batch::RecordBatch;

use super::{Exporter, log_export};
use crate::error::util::{ensure_directory, safe_create_file};
use crate::error::{ClimateError, Result};

/// Layout of the written JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonOrient {
    /// One array of row objects
    #[default]
    Records,
    /// One row object per line
    Lines,
}

impl FromStr for JsonOrient {
    type Err = ClimateError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "records" => Ok(Self::Records),
            "lines" => Ok(Self::Lines),
            other => Err(ClimateError::invalid_parameter(
                "orient",
                format!("unsupported orient '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsonExporter {
    output_dir: PathBuf,
    orient: JsonOrient,
}

impl JsonExporter {
    /// Record-oriented exporter writing into `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        ensure_directory(&output_dir, "json export")?;
        Ok(Self {
            output_dir,
            orient: JsonOrient::Records,
        })
    }

    #[must_use]
    pub const fn with_orient(mut self, orient: JsonOrient) -> Self {
        self.orient = orient;
        self
    }

    fn write(&self, file: File, batch: &RecordBatch) -> arrow::error::Result<()> {
        match self.orient {
            JsonOrient::Records => {
                let mut writer = ArrayWriter::new(file);
                writer.write(batch)?;
                writer.finish()
            }
            JsonOrient::Lines => {
                let mut writer = LineDelimitedWriter::new(file);
                writer.write(batch)?;
                writer.finish()
            }
        }
    }
}

impl Exporter for JsonExporter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn export(&self, batch: &RecordBatch, filename: &str) -> Result<PathBuf> {
        let path = self.output_path(filename);
        let file = safe_create_file(&path, "json export")?;
        self.write(file, batch)
            .map_err(|e| anyhow::anyhow!("Failed to write json to {}: {e}", path.display()))?;
        log_export(batch, &path);
        Ok(path)
    }
}
