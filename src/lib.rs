//! Figure pipeline for ion-implantation depth profiles and PPMS magnetotransport data.
//!
//! This crate provides tools for:
//! - Loading depth-profile CSVs, PPMS resistance sweeps and sample dimensions
//! - Resolving, interpolating (PCHIP) and symmetrizing field sweeps on a common grid
//! - Caching the extracted resistivity families as a single binary file
//! - Rendering depth-profile, resistivity, magnetoresistance and colorbar figures
//!
//! # Example
//!
//! ```no_run
//! use ppms_pipeline::{config::ExtractionConfig, processors::extraction::extract_all};
//!
//! let data = extract_all(&ExtractionConfig::default()).unwrap();
//! println!("{} samples on {} field points", data.samples.len(), data.fields.len());
//! ```

pub mod cli;
pub mod color;
pub mod config;
pub mod core;
pub mod processors;
pub mod visualization;

pub use config::{DepthProfileConfig, ExtractionConfig, PipelineConfig, PlotConfig};
pub use core::model::{Experiment, ExtractedData, Measurement, SweepFamily};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
