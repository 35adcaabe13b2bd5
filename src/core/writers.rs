//! Data writers for the extraction cache and CSV exports.
//!
//! This module provides functions for writing extracted data:
//! - The binary cache holding every sweep family and the field grid
//! - CSV tables with one field column and one resistivity column per temperature

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use super::model::{ExtractedData, SweepFamily};

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Cache encoding error.
    #[error("failed to encode cache '{path}': {source}")]
    Encode {
        path: String,
        #[source]
        source: bincode::Error,
    },

    /// A resistivity row does not match the field grid.
    #[error("row {row} has {row_len} values but the field grid has {fields_len}")]
    LengthMismatch {
        row: usize,
        row_len: usize,
        fields_len: usize,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Creates a buffered writer for the given path.
fn create_buffered_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(BufWriter::new(file))
}

/// Write the extraction result as a single binary cache file.
///
/// The file is read back with [`crate::core::loaders::load_extracted`].
/// NaN entries survive the round trip.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_extracted(path: &Path, data: &ExtractedData) -> Result<()> {
    ensure_parent_dirs(path)?;
    let mut writer = create_buffered_writer(path)?;
    let path_str = path.display().to_string();

    bincode::serialize_into(&mut writer, data).map_err(|e| WriteError::Encode {
        path: path_str.clone(),
        source: e,
    })?;

    writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}

/// Write one sweep family as a CSV table.
///
/// The header is `B (T)` followed by `T=<temperature> K` per sweep; each row
/// holds one field point. NaN is written as an empty cell.
///
/// # Errors
///
/// Returns an error if a row length differs from the field grid or the file
/// cannot be written.
pub fn write_family_csv(path: &Path, fields: &[f64], family: &SweepFamily) -> Result<()> {
    if let Some((row, values)) = family
        .resistivities
        .iter()
        .enumerate()
        .find(|(_, values)| values.len() != fields.len())
    {
        return Err(WriteError::LengthMismatch {
            row,
            row_len: values.len(),
            fields_len: fields.len(),
        });
    }

    ensure_parent_dirs(path)?;
    let writer = create_buffered_writer(path)?;
    let mut csv_writer = csv::Writer::from_writer(writer);
    let path_str = path.display().to_string();

    let mut header = Vec::with_capacity(family.len() + 1);
    header.push("B (T)".to_string());
    header.extend(family.temperatures.iter().map(|t| format!("T={} K", t)));

    csv_writer
        .write_record(&header)
        .map_err(|e| WriteError::CsvError {
            path: path_str.clone(),
            source: e,
        })?;

    for (i, b) in fields.iter().enumerate() {
        let mut record = Vec::with_capacity(family.len() + 1);
        record.push(format!("{:.6}", b));
        record.extend(family.resistivities.iter().map(|row| {
            let v = row[i];
            if v.is_nan() {
                String::new()
            } else {
                format!("{:e}", v)
            }
        }));

        csv_writer
            .write_record(&record)
            .map_err(|e| WriteError::CsvError {
                path: path_str.clone(),
                source: e,
            })?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}
