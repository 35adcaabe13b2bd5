//! Visualization tools for depth profiles and magnetotransport curves.
//!
//! This module renders the publication figures with the plotters library.
//! Each figure type implements [`Figure`]; [`render`] picks a bitmap or SVG
//! backend from the output file extension.

use std::fs;
use std::path::Path;

use palette::Srgb;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::color::Colormap;
use crate::core::model::DepthProfile;
use crate::processors::layout::PixelMargins;

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Plotting error: {0}")]
    PlottingError(String),

    #[error("Nothing to plot")]
    EmptySeries,

    #[error("Unsupported output format '{0}' (expected png or svg)")]
    UnsupportedFormat(String),
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Font family used for every label.
const FONT_FAMILY: &str = "serif";

/// Default property-cycle colours (tab:blue, tab:orange, tab:green, tab:red).
const CYCLE_COLORS: &[(u8, u8, u8)] = &[
    (31, 119, 180),
    (255, 127, 14),
    (44, 160, 44),
    (214, 39, 40),
];

fn plot_err<E: std::fmt::Display>(e: E) -> VisualizationError {
    VisualizationError::PlottingError(e.to_string())
}

fn blank_label(_: &f64) -> String {
    String::new()
}

fn scientific_label(v: &f64) -> String {
    if *v == 0.0 {
        "0".to_string()
    } else {
        format!("{:.0e}", v)
    }
}

fn rgb(c: Srgb<u8>) -> RGBColor {
    RGBColor(c.red, c.green, c.blue)
}

/// Points to pixels at the given resolution.
pub fn pt_to_px(points: f64, dpi: u32) -> u32 {
    ((points * dpi as f64 / 72.0).round() as u32).max(1)
}

/// Image format selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Svg,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => Ok(OutputFormat::Png),
            "svg" => Ok(OutputFormat::Svg),
            _ => Err(VisualizationError::UnsupportedFormat(ext)),
        }
    }
}

/// A figure that can be drawn onto any plotters backend.
pub trait Figure {
    /// Canvas size in pixels.
    fn size_px(&self) -> (u32, u32);

    /// Draw the figure onto the root drawing area.
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>;
}

/// Render a figure to `output_path`, creating parent directories.
pub fn render<F: Figure>(figure: &F, output_path: &Path) -> Result<()> {
    let format = OutputFormat::from_path(output_path)?;
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let size = figure.size_px();
    match format {
        OutputFormat::Png => {
            let root = BitMapBackend::new(output_path, size).into_drawing_area();
            figure.draw(&root)?;
            root.present().map_err(plot_err)?;
        }
        OutputFormat::Svg => {
            let root = SVGBackend::new(output_path, size).into_drawing_area();
            figure.draw(&root)?;
            root.present().map_err(plot_err)?;
        }
    }
    Ok(())
}

/// Split a curve at non-finite samples into drawable runs.
pub fn finite_segments(xs: &[f64], ys: &[f64]) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();

    for (&x, &y) in xs.iter().zip(ys) {
        if x.is_finite() && y.is_finite() {
            current.push((x, y));
        } else if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }

    segments
}

/// Padded (min, max) over the finite values, or `None` when there are none.
pub fn compute_bounds<'a>(values: impl IntoIterator<Item = &'a f64>) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;

    for &v in values {
        if v.is_finite() {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }

    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    if (hi - lo).abs() < f64::EPSILON * lo.abs().max(1.0) {
        lo -= lo.abs().max(1.0) * 0.05;
        hi += hi.abs().max(1.0) * 0.05;
        return Some((lo, hi));
    }

    let padding = (hi - lo) * 0.05;
    Some((lo - padding, hi + padding))
}

/// Concentration versus depth, one line with markers per profile.
#[derive(Debug, Clone)]
pub struct DepthProfileFigure {
    pub profiles: Vec<DepthProfile>,
    pub size_px: (u32, u32),
    pub depth_max: f64,
    pub concentration_max: f64,
    pub legend_title: String,
    pub font_px: u32,
    pub line_px: u32,
}

impl Figure for DepthProfileFigure {
    fn size_px(&self) -> (u32, u32) {
        self.size_px
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        if self.profiles.iter().all(|p| p.is_empty()) {
            return Err(VisualizationError::EmptySeries);
        }
        root.fill(&WHITE).map_err(plot_err)?;

        let font = (FONT_FAMILY, self.font_px);
        let mut chart = ChartBuilder::on(root)
            .margin(self.font_px)
            .x_label_area_size(self.font_px * 3)
            .y_label_area_size(self.font_px * 4)
            .build_cartesian_2d(0.0..self.depth_max, 0.0..self.concentration_max)
            .map_err(plot_err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .label_style(font)
            .axis_desc_style(font)
            .x_desc("Sample Depth [Å]")
            .y_desc("Nb Concentration [atoms/cm³]")
            .y_label_formatter(&scientific_label)
            .draw()
            .map_err(plot_err)?;

        // Title row of the legend.
        chart
            .draw_series(std::iter::empty::<Circle<(f64, f64), u32>>())
            .map_err(plot_err)?
            .label(self.legend_title.as_str())
            .legend(|(x, y)| EmptyElement::at((x, y)));

        let marker_px = (self.line_px + 1).max(2);
        for (i, profile) in self.profiles.iter().enumerate() {
            let (r, g, b) = CYCLE_COLORS[i % CYCLE_COLORS.len()];
            let color = RGBColor(r, g, b);
            let points: Vec<(f64, f64)> = finite_segments(&profile.depth, &profile.concentration)
                .into_iter()
                .flatten()
                .collect();

            chart
                .draw_series(
                    LineSeries::new(points, color.stroke_width(self.line_px)).point_size(marker_px),
                )
                .map_err(plot_err)?
                .label(profile.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .label_font(font)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(plot_err)?;

        Ok(())
    }
}

/// Horizontal colour bar over a value range.
#[derive(Debug, Clone)]
pub struct ColorbarFigure {
    pub colormap: Colormap,
    pub range: (f64, f64),
    pub label: String,
    pub size_px: (u32, u32),
    pub margins: PixelMargins,
    pub font_px: u32,
}

impl Figure for ColorbarFigure {
    fn size_px(&self) -> (u32, u32) {
        self.size_px
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        if self.colormap.is_empty() {
            return Err(VisualizationError::EmptySeries);
        }
        root.fill(&WHITE).map_err(plot_err)?;

        let (vmin, vmax) = self.range;
        let font = (FONT_FAMILY, self.font_px);
        let mut chart = ChartBuilder::on(root)
            .margin_top(self.margins.top)
            .margin_right(self.margins.right)
            .x_label_area_size(self.margins.bottom)
            .y_label_area_size(self.margins.left)
            .build_cartesian_2d(vmin..vmax, 0.0..1.0)
            .map_err(plot_err)?;

        let steps = self.colormap.len();
        let width = (vmax - vmin) / steps as f64;
        chart
            .draw_series((0..steps).map(|i| {
                let x0 = vmin + width * i as f64;
                let color: Srgb<u8> = self
                    .colormap
                    .sample((i as f64 + 0.5) / steps as f64)
                    .into_format();
                Rectangle::new([(x0, 0.0), (x0 + width, 1.0)], rgb(color).filled())
            }))
            .map_err(plot_err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .disable_y_axis()
            .y_labels(0)
            .label_style(font)
            .axis_desc_style(font)
            .x_desc(self.label.as_str())
            .draw()
            .map_err(plot_err)?;

        Ok(())
    }
}

/// One temperature's curve and its colour.
#[derive(Debug, Clone)]
pub struct Curve {
    pub values: Vec<f64>,
    pub color: Srgb<u8>,
}

/// A family of curves over the field axis, laid out as one publication panel.
#[derive(Debug, Clone)]
pub struct CurveFamilyFigure<'a> {
    pub fields: &'a [f64],
    pub curves: Vec<Curve>,
    pub x_max: f64,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub show_x_ticks: bool,
    pub size_px: (u32, u32),
    pub margins: PixelMargins,
    pub font_px: u32,
    pub line_px: u32,
}

impl Figure for CurveFamilyFigure<'_> {
    fn size_px(&self) -> (u32, u32) {
        self.size_px
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        let segments: Vec<(RGBColor, Vec<Vec<(f64, f64)>>)> = self
            .curves
            .iter()
            .map(|c| (rgb(c.color), finite_segments(self.fields, &c.values)))
            .collect();

        let (y_min, y_max) = compute_bounds(
            segments
                .iter()
                .flat_map(|(_, segs)| segs.iter().flatten())
                .filter(|(x, _)| *x <= self.x_max)
                .map(|(_, y)| y),
        )
        .unwrap_or((0.0, 1.0));

        root.fill(&WHITE).map_err(plot_err)?;

        let font = (FONT_FAMILY, self.font_px);
        let mut chart = ChartBuilder::on(root)
            .margin_top(self.margins.top)
            .margin_right(self.margins.right)
            .x_label_area_size(self.margins.bottom)
            .y_label_area_size(self.margins.left)
            .build_cartesian_2d(0.0..self.x_max, y_min..y_max)
            .map_err(plot_err)?;

        let mut mesh = chart.configure_mesh();
        mesh.disable_x_mesh()
            .disable_y_mesh()
            .x_labels(4)
            .y_labels(4)
            .label_style(font)
            .axis_desc_style(font);
        if let Some(label) = &self.x_label {
            mesh.x_desc(label.as_str());
        }
        if let Some(label) = &self.y_label {
            mesh.y_desc(label.as_str());
        }
        if !self.show_x_ticks {
            mesh.x_label_formatter(&blank_label);
        }
        mesh.draw().map_err(plot_err)?;

        for (color, segs) in segments {
            for seg in segs {
                chart
                    .draw_series(LineSeries::new(seg, color.stroke_width(self.line_px)))
                    .map_err(plot_err)?;
            }
        }

        Ok(())
    }
}
