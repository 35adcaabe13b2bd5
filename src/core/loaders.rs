//! Data loaders for depth profiles, PPMS sweeps, sample dimensions and the extraction cache.
//!
//! This module provides parsers for:
//! - Two-column depth-profile CSV files (no header)
//! - PPMS resistance CSV files, with or without a Quantum Design `[Header]` block
//! - `dimension.csv` files holding sample thickness, width and length
//! - The binary cache written by [`crate::core::writers::write_extracted`]

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use regex::Regex;
use thiserror::Error;

use super::model::{DepthProfile, ExtractedData, Measurement, SampleDimensions};

/// Temperature column of a PPMS sweep.
pub const TEMPERATURE_COLUMN: &str = "Temperature (K)";

/// Field column of a PPMS sweep.
pub const FIELD_COLUMN: &str = "Field (Oe)";

/// Line separating the Quantum Design header from the data table.
const DATA_MARKER: &str = "[Data]";

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Cache decoding error: {0}")]
    Decode(#[from] bincode::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("Missing required columns in {path}: {columns}")]
    MissingColumns { path: PathBuf, columns: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Parses a cell as `f64`, yielding NaN for empty or non-numeric content.
#[inline]
fn parse_or_nan(field: Option<&str>) -> f64 {
    field
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Load a depth profile from a comma-delimited file with depth and concentration columns.
///
/// There is no header row. Lines starting with `#` are comments, non-numeric
/// cells become NaN and rows with fewer than two cells are skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds no rows.
pub fn load_depth_profile<P: AsRef<Path>>(path: P, label: &str) -> Result<DepthProfile> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_reader(BufReader::new(file));

    let mut depth = Vec::with_capacity(256);
    let mut concentration = Vec::with_capacity(256);

    for result in reader.records() {
        let record = result?;
        if record.len() < 2 {
            continue;
        }
        depth.push(parse_or_nan(record.get(0)));
        concentration.push(parse_or_nan(record.get(1)));
    }

    if depth.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    Ok(DepthProfile {
        label: label.to_string(),
        depth,
        concentration,
    })
}

/// Load sample dimensions from the first data row of a `dimension.csv`.
///
/// The file needs `T` (thickness), `W` (width) and `L` (length) columns.
pub fn load_dimensions<P: AsRef<Path>>(path: P) -> Result<SampleDimensions> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(BufReader::new(file));

    let headers = reader.headers()?.clone();
    let col_map: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name, i))
        .collect();

    let missing: Vec<&str> = ["T", "W", "L"]
        .into_iter()
        .filter(|c| !col_map.contains_key(c))
        .collect();
    if !missing.is_empty() {
        return Err(LoaderError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing.join(", "),
        });
    }

    let record = reader
        .records()
        .next()
        .ok_or_else(|| LoaderError::EmptyFile(path.to_path_buf()))??;

    let value = |name: &str| -> Result<f64> {
        let raw = record.get(col_map[name]).unwrap_or_default();
        raw.parse::<f64>().map_err(|_| {
            LoaderError::ParseError(format!(
                "invalid {} value '{}' in {}",
                name,
                raw,
                path.display()
            ))
        })
    };

    Ok(SampleDimensions {
        thickness: value("T")?,
        width: value("W")?,
        length: value("L")?,
    })
}

/// Pattern matching the resistance column of one bridge channel.
fn resistance_column_pattern(channel: u32) -> Result<Regex> {
    Regex::new(&format!(r"^Resistance\s+Ch{}\s*\(Ohms?\)$", channel))
        .map_err(|e| LoaderError::ParseError(e.to_string()))
}

/// Returns the part of a PPMS file after the `[Data]` marker, or the whole text.
fn strip_instrument_header(content: &str) -> &str {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        offset += line.len();
        if line.trim() == DATA_MARKER {
            return &content[offset..];
        }
    }
    content
}

/// Locates a required column, trimming header whitespace.
fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

/// Load one PPMS sweep, keeping temperature, field and the channel's resistance.
///
/// Files exported by the instrument software start with a `[Header]` block;
/// everything up to the `[Data]` line is skipped. Plain CSV exports are read
/// as they are. Other columns are ignored and non-numeric cells become NaN.
///
/// # Errors
///
/// Returns an error if the file cannot be read, lacks one of the three
/// columns, or holds no data rows.
pub fn load_measurement<P: AsRef<Path>>(path: P, channel: u32) -> Result<Measurement> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let table = strip_instrument_header(&content);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(table.as_bytes());

    let headers = reader.headers()?.clone();
    let resistance_pattern = resistance_column_pattern(channel)?;

    let t_idx = find_column(&headers, TEMPERATURE_COLUMN);
    let b_idx = find_column(&headers, FIELD_COLUMN);
    let r_idx = headers
        .iter()
        .position(|h| resistance_pattern.is_match(h.trim()));

    let (t_idx, b_idx, r_idx) = match (t_idx, b_idx, r_idx) {
        (Some(t), Some(b), Some(r)) => (t, b, r),
        _ => {
            let mut missing = Vec::new();
            if t_idx.is_none() {
                missing.push(TEMPERATURE_COLUMN.to_string());
            }
            if b_idx.is_none() {
                missing.push(FIELD_COLUMN.to_string());
            }
            if r_idx.is_none() {
                missing.push(format!("Resistance Ch{} (Ohms)", channel));
            }
            return Err(LoaderError::MissingColumns {
                path: path.to_path_buf(),
                columns: missing.join(", "),
            });
        }
    };

    let mut measurement = Measurement {
        source_path: Some(path.to_path_buf()),
        ..Measurement::default()
    };

    for result in reader.records() {
        let record = result?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        measurement.push(
            parse_or_nan(record.get(t_idx)),
            parse_or_nan(record.get(b_idx)),
            parse_or_nan(record.get(r_idx)),
        );
    }

    if measurement.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    Ok(measurement)
}

/// List the sweep files of one experiment directory, sorted by name.
///
/// Both `.csv` exports and raw `.dat` files are accepted.
pub fn list_measurement_files(directory: &Path) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(LoaderError::DirectoryNotFound(directory.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(directory)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv") || ext.eq_ignore_ascii_case("dat"))
                    .unwrap_or(false)
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Load the extraction cache written by `extract`.
pub fn load_extracted<P: AsRef<Path>>(path: P) -> Result<ExtractedData> {
    let file = File::open(path.as_ref())?;
    let data = bincode::deserialize_from(BufReader::new(file))?;
    Ok(data)
}
