//! Configuration types for the figure pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::color::PaletteKind;
use crate::core::model::Experiment;

/// Column width of the target journal in points.
pub const COLUMN_WIDTH_PT: f64 = 246.0;

/// Points per inch, as used by TeX.
pub const POINTS_PER_INCH: f64 = 72.27;

/// One depth-profile input file and its legend label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSource {
    pub path: PathBuf,
    pub label: String,
}

/// Configuration for the implantation depth-profile figure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthProfileConfig {
    /// Profiles drawn in order, each with its ion energy label
    #[serde(default = "default_profiles")]
    pub profiles: Vec<ProfileSource>,

    /// Output image path (extension selects PNG or SVG)
    #[serde(default = "default_profile_output")]
    pub output: PathBuf,

    /// Raster resolution in dots per inch
    #[serde(default = "default_profile_dpi")]
    pub dpi: u32,

    /// Figure width in points
    #[serde(default = "default_width_pt")]
    pub width_pt: f64,

    /// Upper depth limit in angstrom
    #[serde(default = "default_depth_max")]
    pub depth_max: f64,

    /// Upper concentration limit in atoms/cm^3
    #[serde(default = "default_concentration_max")]
    pub concentration_max: f64,

    /// Legend title
    #[serde(default = "default_legend_title")]
    pub legend_title: String,

    /// Font size in points
    #[serde(default = "default_font_size")]
    pub font_size: f64,
}

fn default_profiles() -> Vec<ProfileSource> {
    vec![
        ProfileSource {
            path: PathBuf::from("data/beam/surf_beam.csv"),
            label: "25 keV".to_string(),
        },
        ProfileSource {
            path: PathBuf::from("data/beam/bulk_beam.csv"),
            label: "200 keV".to_string(),
        },
    ]
}

fn default_profile_output() -> PathBuf {
    PathBuf::from("test.png")
}

fn default_profile_dpi() -> u32 {
    300
}

fn default_width_pt() -> f64 {
    COLUMN_WIDTH_PT
}

fn default_depth_max() -> f64 {
    1000.0
}

fn default_concentration_max() -> f64 {
    5e20
}

fn default_legend_title() -> String {
    "Ion Energy".to_string()
}

impl Default for DepthProfileConfig {
    fn default() -> Self {
        Self {
            profiles: default_profiles(),
            output: default_profile_output(),
            dpi: default_profile_dpi(),
            width_pt: default_width_pt(),
            depth_max: default_depth_max(),
            concentration_max: default_concentration_max(),
            legend_title: default_legend_title(),
            font_size: default_font_size(),
        }
    }
}

/// Configuration for extracting resistivity families from PPMS sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Directory holding one subdirectory per sample
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Sample subdirectories to process, in order
    #[serde(default = "default_samples")]
    pub samples: Vec<String>,

    /// Measurement geometries to process for each sample
    #[serde(default = "default_experiments")]
    pub experiments: Vec<Experiment>,

    /// Bridge channel whose resistance column is read
    #[serde(default = "default_channel")]
    pub channel: u32,

    /// Lower end of the common field grid in tesla
    #[serde(default)]
    pub field_min: f64,

    /// Upper end of the common field grid in tesla
    #[serde(default = "default_field_max")]
    pub field_max: f64,

    /// Number of points on the common field grid
    #[serde(default = "default_field_points")]
    pub field_points: usize,

    /// Rows closest to zero field averaged into the zero-field resistivity
    #[serde(default = "default_zero_field_points")]
    pub zero_field_points: usize,

    /// Binary cache written by `extract` and read by `plot`
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("data/ppms")
}

fn default_samples() -> Vec<String> {
    vec!["pris".to_string(), "surf".to_string(), "bulk".to_string()]
}

fn default_experiments() -> Vec<Experiment> {
    Experiment::ALL.to_vec()
}

fn default_channel() -> u32 {
    1
}

fn default_field_max() -> f64 {
    9.0
}

fn default_field_points() -> usize {
    1000
}

fn default_zero_field_points() -> usize {
    10
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("extracted.bin")
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            samples: default_samples(),
            experiments: default_experiments(),
            channel: default_channel(),
            field_min: 0.0,
            field_max: default_field_max(),
            field_points: default_field_points(),
            zero_field_points: default_zero_field_points(),
            cache_path: default_cache_path(),
        }
    }
}

/// Configuration for the resistivity, MR and colorbar figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Directory the figures are written into
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// File extension of the figures ("svg" or "png")
    #[serde(default = "default_format")]
    pub format: String,

    /// Raster resolution in dots per inch
    #[serde(default = "default_plot_dpi")]
    pub dpi: u32,

    /// Figure width unit in points
    #[serde(default = "default_width_pt")]
    pub width_pt: f64,

    /// Window of the moving-mean smoothing applied before drawing
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,

    /// Curves above this temperature (K) are skipped
    #[serde(default = "default_max_temperature")]
    pub max_temperature: f64,

    /// Number of discrete line colours, one per kelvin starting at 0 K
    #[serde(default = "default_palette_size")]
    pub palette_size: usize,

    /// Colour map the line colours are sampled from
    #[serde(default)]
    pub palette: PaletteKind,

    /// Upper limit of the field axis in tesla
    #[serde(default = "default_field_max")]
    pub field_max: f64,

    /// Font size in points
    #[serde(default = "default_font_size")]
    pub font_size: f64,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_format() -> String {
    "svg".to_string()
}

fn default_plot_dpi() -> u32 {
    100
}

fn default_smoothing_window() -> usize {
    10
}

fn default_max_temperature() -> f64 {
    25.0
}

fn default_palette_size() -> usize {
    26
}

fn default_font_size() -> f64 {
    9.0
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            format: default_format(),
            dpi: default_plot_dpi(),
            width_pt: default_width_pt(),
            smoothing_window: default_smoothing_window(),
            max_temperature: default_max_temperature(),
            palette_size: default_palette_size(),
            palette: PaletteKind::default(),
            field_max: default_field_max(),
            font_size: default_font_size(),
        }
    }
}

impl PlotConfig {
    /// Figure width unit in inches.
    pub fn width_in(&self) -> f64 {
        self.width_pt / POINTS_PER_INCH
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub depth_profile: DepthProfileConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub plot: PlotConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_extraction_config() {
        let config = ExtractionConfig::default();
        assert_eq!(config.samples, vec!["pris", "surf", "bulk"]);
        assert_eq!(config.experiments, vec![Experiment::Hall, Experiment::Para, Experiment::Perp]);
        assert_eq!(config.channel, 1);
        assert_eq!(config.field_points, 1000);
        assert_eq!(config.field_max, 9.0);
    }

    #[test]
    fn test_default_pipeline_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.depth_profile.profiles.len(), 2);
        assert_eq!(config.depth_profile.profiles[0].label, "25 keV");
        assert_eq!(config.plot.smoothing_window, 10);
        assert_eq!(config.plot.palette, PaletteKind::Gnuplot);
        assert!((config.plot.width_in() - 246.0 / 72.27).abs() < 1e-12);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "extraction:\n  channel: 2\n  samples: [pris]\nplot:\n  palette: multi-step\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.extraction.channel, 2);
        assert_eq!(config.extraction.samples, vec!["pris"]);
        assert_eq!(config.extraction.field_points, 1000);
        assert_eq!(config.plot.palette, PaletteKind::MultiStep);
        assert_eq!(config.depth_profile.dpi, 300);
        assert_eq!(config.depth_profile.font_size, 9.0);
    }

    #[test]
    fn test_yaml_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        let mut config = PipelineConfig::default();
        config.plot.format = "png".to_string();
        config.to_yaml(&path).unwrap();

        let loaded = PipelineConfig::from_yaml(&path).unwrap();
        assert_eq!(loaded.plot.format, "png");
        assert_eq!(loaded.extraction.experiments, config.extraction.experiments);
    }
}
