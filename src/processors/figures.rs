//! Assembly of the publication figures from extracted and depth-profile data.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use palette::Srgb;

use crate::color::{Colormap, DEFAULT_LUT_SIZE};
use crate::config::{DepthProfileConfig, PlotConfig, POINTS_PER_INCH};
use crate::core::loaders::load_depth_profile;
use crate::core::model::{Experiment, ExtractedData, SweepFamily};
use crate::core::transforms::{magnetoresistance, smooth};
use crate::processors::layout::{plot_arg, FigureLayout};
use crate::visualization::{
    pt_to_px, render, ColorbarFigure, Curve, CurveFamilyFigure, DepthProfileFigure,
};

/// Line width of every curve in points.
const LINE_WIDTH_PT: f64 = 1.5;

const FIELD_LABEL: &str = "B [T]";
const RHO_LABEL: &str = "ρ [µΩ·m]";
const MR_LABEL: &str = "MR [%]";
const TEMPERATURE_LABEL: &str = "T [K]";

/// Which quantity a family panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    /// Resistivity in µΩ·m.
    Resistivity,
    /// Magnetoresistance in percent.
    Magnetoresistance,
}

impl Quantity {
    fn file_prefix(self) -> &'static str {
        match self {
            Quantity::Resistivity => "Rho",
            Quantity::Magnetoresistance => "MR",
        }
    }

    fn y_label(self) -> &'static str {
        match self {
            Quantity::Resistivity => RHO_LABEL,
            Quantity::Magnetoresistance => MR_LABEL,
        }
    }

    /// The experiment whose panel sits at the bottom of the column and
    /// therefore carries the field axis.
    fn labelled_experiment(self) -> Experiment {
        match self {
            Quantity::Resistivity => Experiment::Hall,
            Quantity::Magnetoresistance => Experiment::Perp,
        }
    }
}

/// Layout of one family panel.
pub fn panel_layout(width_in: f64, y_labelled: bool, x_labelled: bool) -> FigureLayout {
    plot_arg(
        [0.5, 0.5],
        width_in,
        [0.03, 0.04],
        [y_labelled, x_labelled],
        [true, x_labelled],
        [0.05, 0.05],
        [0.08, 0.05],
    )
}

/// Layout of the horizontal colorbar strip.
pub fn colorbar_layout(width_in: f64) -> FigureLayout {
    plot_arg(
        [1.78, 0.05],
        width_in,
        [0.03, 0.02],
        [true, true],
        [true, true],
        [0.05, 0.05],
        [0.08, 0.05],
    )
}

/// Pick the curves to draw, hottest first.
///
/// Each row is smoothed and coloured by its whole-kelvin temperature.
/// Rows above `max_temperature`, or without a colour, are skipped.
pub fn select_curves(
    temperatures: &[f64],
    rows: &[Vec<f64>],
    colors: &[Srgb<u8>],
    max_temperature: f64,
    window: usize,
) -> Vec<Curve> {
    temperatures
        .iter()
        .zip(rows)
        .rev()
        .filter(|(t, _)| **t <= max_temperature)
        .filter_map(|(&t, row)| {
            if t < 0.0 {
                return None;
            }
            let color = *colors.get(t.trunc() as usize)?;
            Some(Curve {
                values: smooth(row, window),
                color,
            })
        })
        .collect()
}

/// Scaled rows of a family for the given quantity.
fn family_rows(family: &SweepFamily, quantity: Quantity) -> Vec<Vec<f64>> {
    match quantity {
        Quantity::Resistivity => family
            .resistivities
            .iter()
            .map(|row| row.iter().map(|rho| rho * 1e6).collect())
            .collect(),
        Quantity::Magnetoresistance => magnetoresistance(&family.resistivities),
    }
}

/// Output path of one family panel.
pub fn panel_path(config: &PlotConfig, quantity: Quantity, experiment: Experiment, sample: &str) -> PathBuf {
    config.output_dir.join(format!(
        "{}_{}_{}.{}",
        quantity.file_prefix(),
        experiment,
        sample,
        config.format
    ))
}

#[allow(clippy::too_many_arguments)]
fn render_panel(
    fields: &[f64],
    family: &SweepFamily,
    experiment: Experiment,
    quantity: Quantity,
    first_sample: bool,
    colors: &[Srgb<u8>],
    config: &PlotConfig,
    path: &Path,
) -> Result<()> {
    let x_labelled = experiment == quantity.labelled_experiment();
    let layout = panel_layout(config.width_in(), first_sample, x_labelled);

    let rows = family_rows(family, quantity);
    let curves = select_curves(
        &family.temperatures,
        &rows,
        colors,
        config.max_temperature,
        config.smoothing_window,
    );
    debug!("{}: {} of {} curves", path.display(), curves.len(), family.len());

    let figure = CurveFamilyFigure {
        fields,
        curves,
        x_max: config.field_max,
        x_label: x_labelled.then(|| FIELD_LABEL.to_string()),
        y_label: first_sample.then(|| quantity.y_label().to_string()),
        show_x_ticks: x_labelled,
        size_px: layout.pixel_size(config.dpi),
        margins: layout.pixel_margins(config.dpi),
        font_px: pt_to_px(config.font_size, config.dpi),
        line_px: pt_to_px(LINE_WIDTH_PT, config.dpi),
    };

    render(&figure, path).with_context(|| format!("Failed to render {}", path.display()))
}

/// Continuous colour map through the line colours, for the colorbar.
pub fn colorbar_colormap(colors: &[Srgb<u8>]) -> Result<Colormap> {
    let stops: Vec<Srgb<f32>> = colors.iter().map(|c| c.into_format()).collect();
    Ok(Colormap::from_list("colorbar", &stops, DEFAULT_LUT_SIZE)?)
}

/// Render the temperature colorbar shared by all panels.
pub fn render_colorbar(colors: &[Srgb<u8>], config: &PlotConfig) -> Result<PathBuf> {
    let colormap = colorbar_colormap(colors)?;

    let layout = colorbar_layout(config.width_in());
    let figure = ColorbarFigure {
        colormap,
        range: (0.0, config.max_temperature),
        label: TEMPERATURE_LABEL.to_string(),
        size_px: layout.pixel_size(config.dpi),
        margins: layout.pixel_margins(config.dpi),
        font_px: pt_to_px(config.font_size, config.dpi),
    };

    let path = config.output_dir.join(format!("colorbar.{}", config.format));
    render(&figure, &path).with_context(|| format!("Failed to render {}", path.display()))?;
    Ok(path)
}

/// Render the colorbar plus every ρ(B) and MR(B) panel.
///
/// Returns the paths written, colorbar first.
pub fn render_transport_figures(data: &ExtractedData, config: &PlotConfig) -> Result<Vec<PathBuf>> {
    let colors = config.palette.line_colors(config.palette_size)?;
    let mut written = vec![render_colorbar(&colors, config)?];

    let first = data.sample_order.first().map(String::as_str);
    for (sample, families) in data.ordered_samples() {
        let first_sample = Some(sample) == first;

        for (&experiment, family) in families {
            if family.is_empty() {
                warn!("{} {}: no sweeps, skipping", sample, experiment);
                continue;
            }

            let mut quantities = vec![Quantity::Resistivity];
            if experiment != Experiment::Hall {
                quantities.push(Quantity::Magnetoresistance);
            }

            for quantity in quantities {
                let path = panel_path(config, quantity, experiment, sample);
                render_panel(
                    &data.fields,
                    family,
                    experiment,
                    quantity,
                    first_sample,
                    &colors,
                    config,
                    &path,
                )?;
                info!("Wrote {}", path.display());
                written.push(path);
            }
        }
    }

    Ok(written)
}

/// Depth-profile canvas: one column wide, three quarters as tall.
pub fn depth_profile_size_px(config: &DepthProfileConfig) -> (u32, u32) {
    let width_in = config.width_pt / POINTS_PER_INCH;
    let to_px = |inches: f64| ((inches * config.dpi as f64).round() as u32).max(1);
    (to_px(width_in), to_px(width_in * 0.75))
}

/// Render the implantation depth-profile figure.
pub fn render_depth_profile(config: &DepthProfileConfig) -> Result<PathBuf> {
    let profiles = config
        .profiles
        .iter()
        .map(|source| {
            load_depth_profile(&source.path, &source.label)
                .with_context(|| format!("Failed to load profile: {}", source.path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let figure = DepthProfileFigure {
        profiles,
        size_px: depth_profile_size_px(config),
        depth_max: config.depth_max,
        concentration_max: config.concentration_max,
        legend_title: config.legend_title.clone(),
        font_px: pt_to_px(config.font_size, config.dpi),
        line_px: pt_to_px(LINE_WIDTH_PT, config.dpi),
    };

    render(&figure, &config.output)
        .with_context(|| format!("Failed to render {}", config.output.display()))?;
    Ok(config.output.clone())
}
