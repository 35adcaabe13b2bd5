//! Figure geometry for panels assembled side by side in a publication.
//!
//! Every panel is sized so that its axes box has a fixed size in units of
//! the column width, independent of whether the panel carries axis labels
//! or tick labels. Panels can then be placed next to each other and their
//! axes line up.

/// One figure's size and the placement of its axes box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FigureLayout {
    /// Figure width and height in inches.
    pub fig_size: [f64; 2],
    /// Axes `[left, bottom, width, height]` as fractions of the figure.
    pub axes: [f64; 4],
}

/// Axes box margins in pixels, measured from the figure edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelMargins {
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
    pub top: u32,
}

#[inline]
fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Compute the figure size and axes placement for one panel.
///
/// All sizes are fractions of `width_in`, given per axis as `[x, y]`:
///
/// * `axis_size` - size of the axes box
/// * `axis_margin` - padding around the axes box
/// * `have_label` - whether the axis carries a label
/// * `have_tick_label` - whether the axis carries tick labels
/// * `label_size` - room reserved for a label
/// * `tick_label_size` - room reserved for tick labels
///
/// A labelled axis without tick labels gets one extra margin so the label
/// does not touch the axes box.
pub fn plot_arg(
    axis_size: [f64; 2],
    width_in: f64,
    axis_margin: [f64; 2],
    have_label: [bool; 2],
    have_tick_label: [bool; 2],
    label_size: [f64; 2],
    tick_label_size: [f64; 2],
) -> FigureLayout {
    let mut fig_size = [0.0; 2];
    let mut offset = [0.0; 2];

    for i in 0..2 {
        let label = flag(have_label[i]);
        let ticks = flag(have_tick_label[i]);
        let decorations = label_size[i] * label + tick_label_size[i] * ticks;

        fig_size[i] = (axis_size[i] + (2.0 + label * (1.0 - ticks)) * axis_margin[i] + decorations) * width_in;
        offset[i] = ((1.0 + label * (1.0 - ticks)) * axis_margin[i] + decorations) * width_in;
    }

    FigureLayout {
        fig_size,
        axes: [
            offset[0] / fig_size[0],
            offset[1] / fig_size[1],
            axis_size[0] * width_in / fig_size[0],
            axis_size[1] * width_in / fig_size[1],
        ],
    }
}

impl FigureLayout {
    /// Figure size in pixels at `dpi`, at least one pixel per side.
    pub fn pixel_size(&self, dpi: u32) -> (u32, u32) {
        let px = |inches: f64| ((inches * dpi as f64).round() as u32).max(1);
        (px(self.fig_size[0]), px(self.fig_size[1]))
    }

    /// Distances between the axes box and the figure edges in pixels.
    pub fn pixel_margins(&self, dpi: u32) -> PixelMargins {
        let (w, h) = self.pixel_size(dpi);
        let (w, h) = (w as f64, h as f64);
        let [left, bottom, width, height] = self.axes;

        PixelMargins {
            left: (left * w).round() as u32,
            bottom: (bottom * h).round() as u32,
            right: ((1.0 - left - width) * w).round().max(0.0) as u32,
            top: ((1.0 - bottom - height) * h).round().max(0.0) as u32,
        }
    }
}
