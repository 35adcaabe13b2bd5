//! Colour blending and colour maps for the figure line palettes.

use std::fmt;

use palette::Srgb;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of entries in a colour map lookup table.
pub const DEFAULT_LUT_SIZE: usize = 256;

/// Errors raised while building colours and colour maps.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ColorError {
    #[error("colours must be 6-digit hex strings, got '{0}'")]
    InvalidHex(String),

    #[error("need at least two colours for a colour map, got {0}")]
    TooFewColors(usize),

    #[error("positions must have the same length as colours ({positions} vs {colors})")]
    PositionCount { positions: usize, colors: usize },

    #[error("first position must be 0 and last must be 1")]
    PositionBounds,

    #[error("positions must be strictly increasing")]
    PositionOrder,
}

/// Result type for colour operations.
pub type Result<T> = std::result::Result<T, ColorError>;

/// Parses `#RRGGBB` or `RRGGBB`.
pub fn parse_hex(hex: &str) -> Result<Srgb<u8>> {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidHex(hex.to_string()));
    }
    digits
        .parse::<Srgb<u8>>()
        .map_err(|_| ColorError::InvalidHex(hex.to_string()))
}

/// Formats a colour as uppercase `#RRGGBB`.
pub fn to_hex(color: Srgb<u8>) -> String {
    format!("#{:02X}{:02X}{:02X}", color.red, color.green, color.blue)
}

/// Linearly interpolate or extrapolate between two hex colours.
///
/// `ratio` 0 gives `color1`, 1 gives `color2`; values outside [0, 1]
/// extrapolate past either end. Channels are rounded half to even and
/// clamped to 0..=255.
pub fn blend_hex(color1: &str, color2: &str, ratio: f64) -> Result<String> {
    let c1 = parse_hex(color1)?;
    let c2 = parse_hex(color2)?;

    let channel = |a: u8, b: u8| -> u8 {
        let (a, b) = (a as f64, b as f64);
        (a + ratio * (b - a)).round_ties_even().clamp(0.0, 255.0) as u8
    };

    Ok(to_hex(Srgb::new(
        channel(c1.red, c2.red),
        channel(c1.green, c2.green),
        channel(c1.blue, c2.blue),
    )))
}

fn hex_to_float(hex: &str) -> Result<Srgb<f32>> {
    Ok(parse_hex(hex)?.into_format())
}

fn lerp(a: Srgb<f32>, b: Srgb<f32>, t: f32) -> Srgb<f32> {
    Srgb::new(
        a.red + (b.red - a.red) * t,
        a.green + (b.green - a.green) * t,
        a.blue + (b.blue - a.blue) * t,
    )
}

/// A sampled colour map: a lookup table plus out-of-range colours.
///
/// Sampling `x` in [0, 1] picks entry `min(trunc(x * n), n - 1)`. Values
/// below 0 (and NaN) map to the `under` colour, values above 1 to `over`;
/// both default to the end entries of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct Colormap {
    name: String,
    lut: Vec<Srgb<f32>>,
    under: Option<Srgb<f32>>,
    over: Option<Srgb<f32>>,
}

impl Colormap {
    /// Builds a map passing through `anchors` at the given positions.
    ///
    /// Positions must start at 0, end at 1 and increase; callers validate.
    fn from_anchors(name: &str, anchors: &[(f64, Srgb<f32>)], n: usize) -> Self {
        let n = n.max(1);
        let lut = (0..n)
            .map(|i| {
                let x = if n == 1 { 0.0 } else { i as f64 / (n - 1) as f64 };
                let k = anchors
                    .windows(2)
                    .position(|w| x <= w[1].0)
                    .unwrap_or(anchors.len() - 2);
                let (x0, c0) = anchors[k];
                let (x1, c1) = anchors[k + 1];
                let t = ((x - x0) / (x1 - x0)).clamp(0.0, 1.0);
                lerp(c0, c1, t as f32)
            })
            .collect();

        Self {
            name: name.to_string(),
            lut,
            under: None,
            over: None,
        }
    }

    /// Builds a map through evenly spaced colours.
    pub fn from_list(name: &str, colors: &[Srgb<f32>], n: usize) -> Result<Self> {
        if colors.len() < 2 {
            return Err(ColorError::TooFewColors(colors.len()));
        }
        let last = (colors.len() - 1) as f64;
        let anchors: Vec<(f64, Srgb<f32>)> = colors
            .iter()
            .enumerate()
            .map(|(i, &c)| (i as f64 / last, c))
            .collect();
        Ok(Self::from_anchors(name, &anchors, n))
    }

    /// Builds a map by evaluating `f` on `n` evenly spaced points, clipped to [0, 1].
    pub fn from_fn(name: &str, n: usize, f: impl Fn(f64) -> [f64; 3]) -> Self {
        let n = n.max(1);
        let lut = (0..n)
            .map(|i| {
                let x = if n == 1 { 0.0 } else { i as f64 / (n - 1) as f64 };
                let [r, g, b] = f(x).map(|v| v.clamp(0.0, 1.0) as f32);
                Srgb::new(r, g, b)
            })
            .collect();

        Self {
            name: name.to_string(),
            lut,
            under: None,
            over: None,
        }
    }

    /// The gnuplot map: red sqrt(x), green x^3, blue sin(2 pi x).
    pub fn gnuplot(n: usize) -> Self {
        Self::from_fn("gnuplot", n, |x| {
            [x.sqrt(), x.powi(3), (2.0 * std::f64::consts::PI * x).sin()]
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of lookup-table entries.
    pub fn len(&self) -> usize {
        self.lut.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lut.is_empty()
    }

    /// Colour used for values below 0.
    pub fn set_under(&mut self, color: Srgb<f32>) {
        self.under = Some(color);
    }

    /// Colour used for values above 1.
    pub fn set_over(&mut self, color: Srgb<f32>) {
        self.over = Some(color);
    }

    /// Colour for a normalized value.
    pub fn sample(&self, x: f64) -> Srgb<f32> {
        let n = self.lut.len();
        let first = self.lut[0];
        let last = self.lut[n - 1];

        if x.is_nan() || x < 0.0 {
            return self.under.unwrap_or(first);
        }
        if x > 1.0 {
            return self.over.unwrap_or(last);
        }
        self.lut[((x * n as f64) as usize).min(n - 1)]
    }

    /// `count` colours sampled at evenly spaced points of [0, 1].
    pub fn sample_evenly(&self, count: usize) -> Vec<Srgb<f32>> {
        match count {
            0 => Vec::new(),
            1 => vec![self.sample(0.0)],
            _ => (0..count)
                .map(|i| self.sample(i as f64 / (count - 1) as f64))
                .collect(),
        }
    }
}

/// Build a map going `color1 -> color2 -> color3`, with `color2` at `midpoint`.
pub fn three_color_cmap(
    color1: &str,
    color2: &str,
    color3: &str,
    midpoint: f64,
    name: &str,
    n: usize,
) -> Result<Colormap> {
    multi_color_cmap(&[color1, color2, color3], Some(&[0.0, midpoint, 1.0]), name, n)
}

/// Build a map through an arbitrary sequence of hex colours.
///
/// Without `positions` the colours are evenly spaced. With them, there must
/// be one per colour, starting at 0, ending at 1 and strictly increasing.
pub fn multi_color_cmap(
    colors: &[&str],
    positions: Option<&[f64]>,
    name: &str,
    n: usize,
) -> Result<Colormap> {
    if colors.len() < 2 {
        return Err(ColorError::TooFewColors(colors.len()));
    }
    let parsed = colors
        .iter()
        .map(|c| hex_to_float(c))
        .collect::<Result<Vec<_>>>()?;

    let Some(positions) = positions else {
        return Colormap::from_list(name, &parsed, n);
    };

    if positions.len() != colors.len() {
        return Err(ColorError::PositionCount {
            positions: positions.len(),
            colors: colors.len(),
        });
    }
    if positions[0] != 0.0 || positions[positions.len() - 1] != 1.0 {
        return Err(ColorError::PositionBounds);
    }
    if positions.windows(2).any(|w| w[1] <= w[0]) {
        return Err(ColorError::PositionOrder);
    }

    let anchors: Vec<(f64, Srgb<f32>)> = positions.iter().copied().zip(parsed).collect();
    Ok(Colormap::from_anchors(name, &anchors, n))
}

/// Named colour maps available for the temperature line palette.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PaletteKind {
    /// gnuplot colour map
    #[default]
    Gnuplot,
    /// Two-colour purple to yellow ramp with a dark purple under colour
    Custom,
    /// Dark purple, purple-pink, yellow-green with the middle at 30 %
    ThreeStep,
    /// Five-stop purple to light yellow map
    MultiStep,
}

const PURPLE: &str = "#AA3377";
const YELLOW: &str = "#CCBB44";
const RED: &str = "#EE6677";
const DARK_PURPLE: &str = "#210b21";
const UNDER_PURPLE: &str = "#552255";

impl PaletteKind {
    pub const ALL: [PaletteKind; 4] = [
        PaletteKind::Gnuplot,
        PaletteKind::Custom,
        PaletteKind::ThreeStep,
        PaletteKind::MultiStep,
    ];

    /// Builds the colour map behind this palette.
    pub fn colormap(self) -> Result<Colormap> {
        self.colormap_with_size(DEFAULT_LUT_SIZE)
    }

    /// Builds the colour map with an `n`-entry lookup table.
    pub fn colormap_with_size(self, n: usize) -> Result<Colormap> {
        let low = blend_hex(PURPLE, YELLOW, -0.3)?;
        let high = blend_hex(PURPLE, YELLOW, 1.4)?;

        match self {
            PaletteKind::Gnuplot => Ok(Colormap::gnuplot(n)),
            PaletteKind::Custom => {
                let mut cmap = multi_color_cmap(&[low.as_str(), high.as_str()], None, "color_custom", n)?;
                cmap.set_under(hex_to_float(UNDER_PURPLE)?);
                Ok(cmap)
            }
            PaletteKind::ThreeStep => {
                three_color_cmap(DARK_PURPLE, &low, &high, 0.3, "three_step", n)
            }
            PaletteKind::MultiStep => {
                let light = blend_hex(RED, YELLOW, 1.4)?;
                multi_color_cmap(
                    &[DARK_PURPLE, PURPLE, RED, YELLOW, light.as_str()],
                    Some(&[0.0, 0.3, 0.5, 0.7, 1.0]),
                    "purple_yellow_light",
                    n,
                )
            }
        }
    }

    /// `count` evenly spaced colours of this palette as 8-bit RGB.
    pub fn line_colors(self, count: usize) -> Result<Vec<Srgb<u8>>> {
        Ok(self
            .colormap()?
            .sample_evenly(count)
            .into_iter()
            .map(|c| c.into_format())
            .collect())
    }
}

impl fmt::Display for PaletteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaletteKind::Gnuplot => "gnuplot",
            PaletteKind::Custom => "custom",
            PaletteKind::ThreeStep => "three-step",
            PaletteKind::MultiStep => "multi-step",
        };
        f.write_str(name)
    }
}

/// The blends printed by the `colors` subcommand: `(description, hex)`.
pub fn demo_blends() -> Result<Vec<(String, String)>> {
    let mut out = Vec::with_capacity(8);
    for ratio in [-1.0, -0.3, 0.0, 0.5, 1.0, 1.4] {
        out.push((
            format!("{}+{} ({:.1})", PURPLE, YELLOW, ratio),
            blend_hex(PURPLE, YELLOW, ratio)?,
        ));
    }
    out.push((format!("{}+{} (-0.9)", PURPLE, RED), blend_hex(PURPLE, RED, -0.9)?));
    out.push((format!("{}+{} (1.7)", RED, YELLOW), blend_hex(RED, YELLOW, 1.7)?));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb8(c: Srgb<f32>) -> (u8, u8, u8) {
        let c: Srgb<u8> = c.into_format();
        (c.red, c.green, c.blue)
    }

    #[test]
    fn test_blend_hex_endpoints_and_midpoint() {
        assert_eq!(blend_hex("#AA3377", "#CCBB44", 0.0).unwrap(), "#AA3377");
        assert_eq!(blend_hex("AA3377", "CCBB44", 1.0).unwrap(), "#CCBB44");
        // 0xAA + 0.5 * (0xCC - 0xAA) = 187, 0x33 + 0.5 * 0x88 = 119, 0x77 - 0.5 * 0x33 = 93.5 -> 94
        assert_eq!(blend_hex("#AA3377", "#CCBB44", 0.5).unwrap(), "#BB775E");
    }

    #[test]
    fn test_blend_hex_extrapolates_and_clamps() {
        // 0xAA - 0.3 * 34 = 159.8 -> 160, 0x33 - 0.3 * 136 = 10.2 -> 10, 0x77 + 0.3 * 51 = 134.3 -> 134
        assert_eq!(blend_hex("#AA3377", "#CCBB44", -0.3).unwrap(), "#A00A86");
        // Green channel goes negative and is clamped.
        assert_eq!(blend_hex("#AA3377", "#CCBB44", -1.0).unwrap(), "#8800AA");
        assert_eq!(blend_hex("#000000", "#FFFFFF", 2.0).unwrap(), "#FFFFFF");
    }

    #[test]
    fn test_blend_hex_rounds_half_to_even() {
        // 0 + 0.5 * 1 = 0.5 -> 0; 0 + 0.5 * 3 = 1.5 -> 2
        assert_eq!(blend_hex("#000000", "#010301", 0.5).unwrap(), "#000200");
    }

    #[test]
    fn test_blend_hex_rejects_short_colours() {
        assert_eq!(
            blend_hex("#ABC", "#CCBB44", 0.5),
            Err(ColorError::InvalidHex("#ABC".to_string()))
        );
        assert!(blend_hex("#GGGGGG", "#CCBB44", 0.5).is_err());
    }

    #[test]
    fn test_colormap_sampling() {
        let cmap = Colormap::from_list(
            "bw",
            &[Srgb::new(0.0, 0.0, 0.0), Srgb::new(1.0, 1.0, 1.0)],
            256,
        )
        .unwrap();
        assert_eq!(cmap.len(), 256);
        assert_eq!(rgb8(cmap.sample(0.0)), (0, 0, 0));
        assert_eq!(rgb8(cmap.sample(1.0)), (255, 255, 255));
        // 0.5 * 256 = 128 -> entry 128 of 0..=255
        let mid = cmap.sample(0.5).red;
        assert!((mid - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_colormap_under_and_over() {
        let mut cmap = PaletteKind::Custom.colormap().unwrap();
        assert_eq!(rgb8(cmap.sample(-0.1)), (0x55, 0x22, 0x55));
        assert_eq!(cmap.sample(1.5), cmap.sample(1.0));

        cmap.set_over(Srgb::new(1.0, 1.0, 1.0));
        assert_eq!(rgb8(cmap.sample(1.5)), (255, 255, 255));
        assert_ne!(rgb8(cmap.sample(1.0)), (255, 255, 255));
    }

    #[test]
    fn test_gnuplot_colormap() {
        let cmap = Colormap::gnuplot(256);
        assert_eq!(cmap.name(), "gnuplot");
        assert_eq!(rgb8(cmap.sample(0.0)), (0, 0, 0));
        // x = 1: sqrt = 1, cube = 1, sin(2 pi) ~ 0
        assert_eq!(rgb8(cmap.sample(1.0)), (255, 255, 0));
        // Blue is clipped to zero in the upper half.
        assert_eq!(cmap.sample(0.75).blue, 0.0);
    }

    #[test]
    fn test_multi_color_cmap_validation() {
        assert_eq!(
            multi_color_cmap(&["#000000"], None, "one", 256),
            Err(ColorError::TooFewColors(1))
        );
        assert_eq!(
            multi_color_cmap(&["#000000", "#FFFFFF"], Some(&[0.0, 0.5, 1.0]), "n", 256),
            Err(ColorError::PositionCount {
                positions: 3,
                colors: 2
            })
        );
        assert_eq!(
            multi_color_cmap(&["#000000", "#FFFFFF"], Some(&[0.1, 1.0]), "n", 256),
            Err(ColorError::PositionBounds)
        );
        assert_eq!(
            multi_color_cmap(
                &["#000000", "#777777", "#FFFFFF"],
                Some(&[0.0, 0.0, 1.0]),
                "n",
                256
            ),
            Err(ColorError::PositionOrder)
        );
    }

    #[test]
    fn test_three_color_cmap_midpoint() {
        let cmap = three_color_cmap("#000000", "#FF0000", "#FFFFFF", 0.25, "t", 5).unwrap();
        // Entries at x = 0, 0.25, 0.5, 0.75, 1
        assert_eq!(rgb8(cmap.lut[1]), (255, 0, 0));
        assert_eq!(rgb8(cmap.lut[4]), (255, 255, 255));
        assert_eq!(rgb8(cmap.lut[0]), (0, 0, 0));
    }

    #[test]
    fn test_palettes_build() {
        for kind in PaletteKind::ALL {
            let colors = kind.line_colors(26).unwrap();
            assert_eq!(colors.len(), 26, "{}", kind);
        }
    }

    #[test]
    fn test_palette_anchor_entries() {
        // With 11 entries the table is sampled at x = 0, 0.1, ..., 1.
        let entry = |kind: PaletteKind, i: usize| rgb8(kind.colormap_with_size(11).unwrap().lut[i]);

        assert_eq!(entry(PaletteKind::MultiStep, 0), (0x21, 0x0B, 0x21));
        assert_eq!(entry(PaletteKind::MultiStep, 3), (0xAA, 0x33, 0x77));
        assert_eq!(entry(PaletteKind::MultiStep, 5), (0xEE, 0x66, 0x77));
        assert_eq!(entry(PaletteKind::MultiStep, 7), (0xCC, 0xBB, 0x44));

        // Middle colour of three-step sits at 0.3: blend(-0.3) = #A00A86.
        assert_eq!(entry(PaletteKind::ThreeStep, 0), (0x21, 0x0B, 0x21));
        assert_eq!(entry(PaletteKind::ThreeStep, 3), (0xA0, 0x0A, 0x86));
        // blend(1.4) = #DAF130
        assert_eq!(entry(PaletteKind::ThreeStep, 10), (0xDA, 0xF1, 0x30));

        assert_eq!(entry(PaletteKind::Custom, 0), (0xA0, 0x0A, 0x86));
        assert_eq!(entry(PaletteKind::Custom, 10), (0xDA, 0xF1, 0x30));

        // sqrt(0.5) * 255 = 180.3, 0.125 * 255 = 31.9, sin(pi) = 0
        assert_eq!(entry(PaletteKind::Gnuplot, 5), (180, 32, 0));
    }

    #[test]
    fn test_demo_blends() {
        let blends = demo_blends().unwrap();
        assert_eq!(blends.len(), 8);
        assert_eq!(blends[2], ("#AA3377+#CCBB44 (0.0)".to_string(), "#AA3377".to_string()));
    }
}
