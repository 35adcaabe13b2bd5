//! Plain data containers shared by the loaders, transforms and figures.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Implanted-ion concentration versus depth.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthProfile {
    /// Legend label (usually the ion energy).
    pub label: String,
    /// Depth below the surface in angstrom.
    pub depth: Vec<f64>,
    /// Concentration in atoms/cm^3.
    pub concentration: Vec<f64>,
}

impl DepthProfile {
    #[inline]
    pub fn len(&self) -> usize {
        self.depth.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }
}

/// Raw columns of one PPMS sweep. Unparseable cells are NaN.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurement {
    /// Temperature in kelvin.
    pub temperature: Vec<f64>,
    /// Applied field in oersted.
    pub field: Vec<f64>,
    /// Bridge resistance in ohms.
    pub resistance: Vec<f64>,
    /// Source file path.
    pub source_path: Option<PathBuf>,
}

impl Measurement {
    #[inline]
    pub fn len(&self) -> usize {
        self.field.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.field.is_empty()
    }

    /// Adds one row.
    #[inline]
    pub fn push(&mut self, temperature: f64, field: f64, resistance: f64) {
        self.temperature.push(temperature);
        self.field.push(field);
        self.resistance.push(resistance);
    }
}

/// Sample geometry from `dimension.csv`, in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleDimensions {
    pub thickness: f64,
    pub width: f64,
    pub length: f64,
}

/// Whether a sweep is averaged or half-differenced across field polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    /// Longitudinal resistivity, symmetric in B.
    Even,
    /// Hall resistivity, antisymmetric in B.
    Odd,
}

/// Measurement geometry; also the name of the directory holding its sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Experiment {
    Hall,
    Para,
    Perp,
}

impl Experiment {
    pub const ALL: [Experiment; 3] = [Experiment::Hall, Experiment::Para, Experiment::Perp];

    /// Directory name under a sample directory.
    pub fn dir_name(self) -> &'static str {
        match self {
            Experiment::Hall => "Hall",
            Experiment::Para => "Para",
            Experiment::Perp => "Perp",
        }
    }

    pub fn parity(self) -> Parity {
        match self {
            Experiment::Hall => Parity::Odd,
            Experiment::Para | Experiment::Perp => Parity::Even,
        }
    }

    /// Factor converting resistance (ohm) into resistivity (ohm m).
    ///
    /// Hall resistivity only scales with thickness; the longitudinal
    /// geometries use thickness * width / length.
    pub fn geometry_factor(self, dims: &SampleDimensions) -> f64 {
        match self {
            Experiment::Hall => dims.thickness,
            Experiment::Para | Experiment::Perp => dims.thickness * dims.width / dims.length,
        }
    }
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Resistivity curves of one sample and geometry on the common field grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepFamily {
    /// Rounded temperature of each sweep, ascending.
    pub temperatures: Vec<f64>,
    /// One row per temperature; NaN outside the measured field range.
    pub resistivities: Vec<Vec<f64>>,
}

impl SweepFamily {
    #[inline]
    pub fn len(&self) -> usize {
        self.temperatures.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.temperatures.is_empty()
    }

    /// Builds a family from unordered `(temperature, row)` pairs, sorting by temperature.
    pub fn from_rows(mut rows: Vec<(f64, Vec<f64>)>) -> Self {
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (temperatures, resistivities) = rows.into_iter().unzip();
        Self {
            temperatures,
            resistivities,
        }
    }
}

/// Everything `extract` produces: per sample, per geometry, on one field grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedData {
    pub samples: BTreeMap<String, BTreeMap<Experiment, SweepFamily>>,
    /// Field grid in tesla shared by every row.
    pub fields: Vec<f64>,
    /// Sample names in processing order (map keys are sorted).
    pub sample_order: Vec<String>,
}

impl ExtractedData {
    /// Iterates samples in the order they were extracted.
    pub fn ordered_samples(&self) -> impl Iterator<Item = (&str, &BTreeMap<Experiment, SweepFamily>)> {
        self.sample_order
            .iter()
            .filter_map(|name| self.samples.get(name).map(|fam| (name.as_str(), fam)))
    }
}
