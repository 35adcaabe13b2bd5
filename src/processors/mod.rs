//! Data processing modules.

pub mod extraction;
pub mod figures;
pub mod layout;

// Re-export key types for convenience
pub use extraction::{extract_all, extract_experiment, extract_sample, field_grid, ExtractionError};
pub use figures::{render_colorbar, render_depth_profile, render_transport_figures, Quantity};
pub use layout::{plot_arg, FigureLayout, PixelMargins};
