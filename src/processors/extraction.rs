//! Extraction of symmetrized resistivity families from PPMS sweeps.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;
use thiserror::Error;

use crate::config::ExtractionConfig;
use crate::core::loaders::{list_measurement_files, load_dimensions, load_measurement};
use crate::core::model::{Experiment, ExtractedData, Measurement, SampleDimensions, SweepFamily};
use crate::core::transforms::{linspace, symmetrize, zero_field_resistivity};

/// Oersted per tesla.
pub const OERSTED_PER_TESLA: f64 = 10_000.0;

/// Name of the per-sample geometry file.
pub const DIMENSION_FILE: &str = "dimension.csv";

/// Errors that can occur during extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Sample directory not found: {0}")]
    SampleNotFound(PathBuf),

    #[error("Invalid field grid: {0}")]
    InvalidGrid(String),

    #[error("Sweep has no temperature reading: {path}")]
    MissingTemperature { path: PathBuf },
}

/// The common field grid described by the config.
pub fn field_grid(config: &ExtractionConfig) -> Result<Vec<f64>> {
    if config.field_points < 2 {
        return Err(ExtractionError::InvalidGrid(format!(
            "need at least 2 points, got {}",
            config.field_points
        ))
        .into());
    }
    if !(config.field_max > config.field_min) {
        return Err(ExtractionError::InvalidGrid(format!(
            "field_max ({}) must exceed field_min ({})",
            config.field_max, config.field_min
        ))
        .into());
    }
    Ok(linspace(config.field_min, config.field_max, config.field_points))
}

/// Resistivity in ohm metres for every row of a sweep.
pub fn resistivity(measurement: &Measurement, experiment: Experiment, dims: &SampleDimensions) -> Vec<f64> {
    let factor = experiment.geometry_factor(dims);
    measurement.resistance.iter().map(|r| r * factor).collect()
}

/// Process one sweep file into `(temperature, resistivity on the grid)`.
///
/// Temperatures are rounded to whole kelvin (half to even) and the sweep is
/// labelled with the temperature of its first row. Fields are converted from
/// oersted to tesla before the branches are interpolated and symmetrized.
pub fn process_sweep(
    path: &Path,
    experiment: Experiment,
    dims: &SampleDimensions,
    grid: &[f64],
    config: &ExtractionConfig,
) -> Result<(f64, Vec<f64>)> {
    let measurement = load_measurement(path, config.channel)
        .with_context(|| format!("Failed to load sweep: {}", path.display()))?;

    let temperature = measurement
        .temperature
        .first()
        .map(|t| t.round_ties_even())
        .filter(|t| !t.is_nan())
        .ok_or_else(|| ExtractionError::MissingTemperature {
            path: path.to_path_buf(),
        })?;

    let field: Vec<f64> = measurement
        .field
        .iter()
        .map(|b| b / OERSTED_PER_TESLA)
        .collect();
    let rho = resistivity(&measurement, experiment, dims);

    let rho0 = zero_field_resistivity(&field, &rho, config.zero_field_points)
        .with_context(|| format!("Zero-field resistivity failed for {}", path.display()))?;
    if rho0.is_nan() {
        warn!("{}: no finite resistivity near zero field", path.display());
    }

    let curve = symmetrize(&field, &rho, rho0, grid, experiment.parity())
        .with_context(|| format!("Symmetrization failed for {}", path.display()))?;

    debug!(
        "{}: T = {} K, {} rows, rho0 = {:e}",
        path.display(),
        temperature,
        measurement.len(),
        rho0
    );

    Ok((temperature, curve))
}

/// Extract every sweep of one geometry below `sample_dir`.
///
/// Sweeps are processed in parallel; the family comes back sorted by
/// temperature. A missing experiment directory yields an empty family.
pub fn extract_experiment(
    sample_dir: &Path,
    experiment: Experiment,
    dims: &SampleDimensions,
    grid: &[f64],
    config: &ExtractionConfig,
) -> Result<SweepFamily> {
    let exp_dir = sample_dir.join(experiment.dir_name());
    if !exp_dir.is_dir() {
        warn!("No {} directory in {}", experiment, sample_dir.display());
        return Ok(SweepFamily::default());
    }

    let files = list_measurement_files(&exp_dir)?;
    info!("{}: {} {} sweeps", sample_dir.display(), files.len(), experiment);

    let rows = files
        .par_iter()
        .map(|path| process_sweep(path, experiment, dims, grid, config))
        .collect::<Result<Vec<_>>>()?;

    Ok(SweepFamily::from_rows(rows))
}

/// Extract all configured geometries of one sample.
pub fn extract_sample(
    sample_dir: &Path,
    grid: &[f64],
    config: &ExtractionConfig,
) -> Result<BTreeMap<Experiment, SweepFamily>> {
    if !sample_dir.is_dir() {
        return Err(ExtractionError::SampleNotFound(sample_dir.to_path_buf()).into());
    }

    let dims_path = sample_dir.join(DIMENSION_FILE);
    let dims = load_dimensions(&dims_path)
        .with_context(|| format!("Failed to load dimensions: {}", dims_path.display()))?;

    let mut families = BTreeMap::new();
    for &experiment in &config.experiments {
        let family = extract_experiment(sample_dir, experiment, &dims, grid, config)?;
        families.insert(experiment, family);
    }

    Ok(families)
}

/// Run the whole extraction described by `config`.
pub fn extract_all(config: &ExtractionConfig) -> Result<ExtractedData> {
    let grid = field_grid(config)?;
    let mut data = ExtractedData {
        fields: grid,
        ..ExtractedData::default()
    };

    for sample in &config.samples {
        let sample_dir = config.base_dir.join(sample);
        let families = extract_sample(&sample_dir, &data.fields, config)?;
        data.samples.insert(sample.clone(), families);
        data.sample_order.push(sample.clone());
    }

    Ok(data)
}
