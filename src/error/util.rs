//! Utility functions for error handling
//!
//! Filesystem helpers that fail with path-rich [`ClimateError::Io`] values.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{ClimateError, Result};

/// Safely open a file with rich error information
///
/// # Arguments
/// * `path` - The path to the file to open
/// * `purpose` - Why the file is being opened (for error context)
pub fn safe_open_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if !path.exists() {
        return Err(ClimateError::io(path, format!("File not found (needed for: {purpose})")).into());
    }

    if !path.is_file() {
        return Err(
            ClimateError::io(path, format!("Path is not a file (expected a file for: {purpose})"))
                .into(),
        );
    }

    fs::File::open(path).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::PermissionDenied => "Permission denied - check file permissions".to_string(),
            io::ErrorKind::NotFound => {
                "File not found - it may have been deleted during operation".to_string()
            }
            _ => format!("Failed to open file for: {purpose}"),
        };
        ClimateError::io_with_source(path, context, e).into()
    })
}

/// Check that a directory exists and is readable
pub fn validate_directory(path: &Path, purpose: &str) -> Result<()> {
    if !path.exists() {
        return Err(
            ClimateError::io(path, format!("Directory not found (needed for: {purpose})")).into(),
        );
    }

    if !path.is_dir() {
        return Err(ClimateError::io(
            path,
            format!("Path is not a directory (expected a directory for: {purpose})"),
        )
        .into());
    }

    match fs::read_dir(path) {
        Ok(_) => Ok(()),
        Err(e) => {
            let context = match e.kind() {
                io::ErrorKind::PermissionDenied => {
                    "Permission denied - check directory permissions".to_string()
                }
                _ => format!("Failed to access directory for: {purpose}"),
            };
            Err(ClimateError::io_with_source(path, context, e).into())
        }
    }
}

/// Create a directory (and its parents) if it does not exist yet
pub fn ensure_directory(path: &Path, purpose: &str) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| {
        ClimateError::io_with_source(path, format!("Failed to create directory for: {purpose}"), e)
    })?;
    Ok(())
}

/// Create (or truncate) a file for writing
pub fn safe_create_file(path: &Path, purpose: &str) -> Result<fs::File> {
    fs::File::create(path).map_err(|e| {
        ClimateError::io_with_source(path, format!("Failed to create file for: {purpose}"), e)
            .into()
    })
}
