//! Core data types and I/O operations.

pub mod loaders;
pub mod model;
pub mod transforms;
pub mod writers;

pub use loaders::{load_depth_profile, load_dimensions, load_extracted, load_measurement};
pub use model::{DepthProfile, Experiment, ExtractedData, Measurement, SampleDimensions, SweepFamily};
pub use writers::{write_extracted, write_family_csv, WriteError};
