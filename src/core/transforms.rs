//! Numerical post-processing of sweeps.
//!
//! This module provides the small numerical toolbox the extraction and the
//! figures rely on: monotone resolution of scattered samples, moving-mean
//! smoothing, shape-preserving (PCHIP) interpolation and the symmetrization
//! of positive and negative field branches onto a common grid.

use thiserror::Error;

use super::model::Parity;

/// Errors that can occur during numerical transforms.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("array length mismatch: xs has {xs_len} elements, ys has {ys_len} elements")]
    LengthMismatch { xs_len: usize, ys_len: usize },

    #[error("interpolation needs at least {required} points, got {actual}")]
    TooFewPoints { required: usize, actual: usize },

    #[error("x values must be finite and strictly increasing (violated at index {index})")]
    NotIncreasing { index: usize },
}

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;

fn check_lengths(xs: &[f64], ys: &[f64]) -> Result<()> {
    if xs.len() != ys.len() {
        return Err(TransformError::LengthMismatch {
            xs_len: xs.len(),
            ys_len: ys.len(),
        });
    }
    Ok(())
}

/// `n` evenly spaced values from `start` to `stop`, both included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            // Pin the end point against accumulated rounding.
            out[n - 1] = stop;
            out
        }
    }
}

/// Sort samples by x and merge runs of equal x into their mean y.
///
/// The returned xs are strictly increasing, which is what [`Pchip`] needs.
///
/// # Errors
///
/// Returns [`TransformError::LengthMismatch`] if `xs` and `ys` differ in length.
pub fn resolve_monotone(xs: &[f64], ys: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
    check_lengths(xs, ys)?;

    let mut order: Vec<usize> = (0..xs.len()).collect();
    order.sort_by(|&a, &b| xs[a].total_cmp(&xs[b]));

    let mut xs_out = Vec::with_capacity(xs.len());
    let mut ys_out = Vec::with_capacity(ys.len());

    let mut run_x = f64::NAN;
    let mut run_sum = 0.0;
    let mut run_len = 0usize;

    for idx in order {
        let (x, y) = (xs[idx], ys[idx]);
        if run_len > 0 && x == run_x {
            run_sum += y;
            run_len += 1;
            continue;
        }
        if run_len > 0 {
            xs_out.push(run_x);
            ys_out.push(run_sum / run_len as f64);
        }
        run_x = x;
        run_sum = y;
        run_len = 1;
    }

    if run_len > 0 {
        xs_out.push(run_x);
        ys_out.push(run_sum / run_len as f64);
    }

    Ok((xs_out, ys_out))
}

/// Moving mean of both coordinates over windows of `w` consecutive samples.
///
/// Produces `len - w + 1` points; empty when `w` is zero or exceeds the length.
pub fn running_average(xs: &[f64], ys: &[f64], w: usize) -> Result<(Vec<f64>, Vec<f64>)> {
    check_lengths(xs, ys)?;

    if w == 0 || w > xs.len() {
        return Ok((Vec::new(), Vec::new()));
    }

    let (xs_out, ys_out) = xs
        .windows(w)
        .zip(ys.windows(w))
        .map(|(wx, wy)| (mean(wx), mean(wy)))
        .unzip();

    Ok((xs_out, ys_out))
}

/// Arithmetic mean; NaN for an empty slice, NaN-propagating.
#[inline]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Arithmetic mean over the non-NaN entries; NaN when none remain.
pub fn nan_mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Centred moving mean used before drawing the curves.
///
/// Sample `i` becomes the mean of `seq[lo..hi]` with
/// `lo = max(0, trunc(i - window / 2))` and `hi = min(len - 1, trunc(i + window / 2))`.
/// The upper bound stops one short of the end, so the last sample never
/// enters a window. Empty windows give NaN and NaN inside a window propagates.
pub fn smooth(seq: &[f64], window: usize) -> Vec<f64> {
    let len = seq.len();
    if len == 0 {
        return Vec::new();
    }

    let half = window as f64 / 2.0;
    let last = (len - 1) as f64;

    (0..len)
        .map(|i| {
            let lo = (i as f64 - half).trunc().max(0.0) as usize;
            let hi = (i as f64 + half).trunc().min(last) as usize;
            if lo >= hi {
                f64::NAN
            } else {
                mean(&seq[lo..hi])
            }
        })
        .collect()
}

/// Sign as -1, 0 or 1 (zero maps to zero, unlike `f64::signum`).
#[inline]
fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// End-point derivative: non-centred three-point estimate, kept shape preserving.
fn edge_slope(h0: f64, h1: f64, m0: f64, m1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * m0 - h0 * m1) / (h0 + h1);
    if sign(d) != sign(m0) {
        0.0
    } else if sign(m0) != sign(m1) && d.abs() > 3.0 * m0.abs() {
        3.0 * m0
    } else {
        d
    }
}

/// Piecewise cubic Hermite interpolant with Fritsch–Carlson slopes.
///
/// Monotone data yields a monotone interpolant and no overshoot appears
/// between samples. Evaluation outside the sampled range yields NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct Pchip {
    xs: Vec<f64>,
    ys: Vec<f64>,
    slopes: Vec<f64>,
}

impl Pchip {
    /// Builds the interpolant.
    ///
    /// # Errors
    ///
    /// Fails with fewer than two points, mismatched lengths, or xs that are
    /// not finite and strictly increasing.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self> {
        check_lengths(&xs, &ys)?;

        let n = xs.len();
        if n < 2 {
            return Err(TransformError::TooFewPoints {
                required: 2,
                actual: n,
            });
        }
        if let Some(index) = xs.iter().position(|x| !x.is_finite()) {
            return Err(TransformError::NotIncreasing { index });
        }
        if let Some(index) = xs.windows(2).position(|w| w[1] <= w[0]) {
            return Err(TransformError::NotIncreasing { index: index + 1 });
        }

        let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
        let m: Vec<f64> = ys
            .windows(2)
            .zip(&h)
            .map(|(w, &hk)| (w[1] - w[0]) / hk)
            .collect();

        let slopes = if n == 2 {
            vec![m[0], m[0]]
        } else {
            let mut d = vec![0.0; n];
            for k in 1..n - 1 {
                let (m_prev, m_next) = (m[k - 1], m[k]);
                if sign(m_prev) != sign(m_next) || m_prev == 0.0 || m_next == 0.0 {
                    d[k] = 0.0;
                } else {
                    let w1 = 2.0 * h[k] + h[k - 1];
                    let w2 = h[k] + 2.0 * h[k - 1];
                    d[k] = (w1 + w2) / (w1 / m_prev + w2 / m_next);
                }
            }
            d[0] = edge_slope(h[0], h[1], m[0], m[1]);
            d[n - 1] = edge_slope(h[n - 2], h[n - 3], m[n - 2], m[n - 3]);
            d
        };

        Ok(Self { xs, ys, slopes })
    }

    /// Lower and upper end of the sampled range.
    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Value at `x`; NaN outside the sampled range.
    pub fn evaluate(&self, x: f64) -> f64 {
        let (lo, hi) = self.domain();
        if x.is_nan() || x < lo || x > hi {
            return f64::NAN;
        }

        // Interval k with xs[k] <= x <= xs[k + 1].
        let k = self
            .xs
            .partition_point(|&xi| xi <= x)
            .saturating_sub(1)
            .min(self.xs.len() - 2);

        let h = self.xs[k + 1] - self.xs[k];
        let s = (x - self.xs[k]) / h;
        let s2 = s * s;
        let s3 = s2 * s;

        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;

        h00 * self.ys[k] + h10 * h * self.slopes[k] + h01 * self.ys[k + 1] + h11 * h * self.slopes[k + 1]
    }

    /// Evaluates on every grid point.
    pub fn evaluate_all(&self, grid: &[f64]) -> Vec<f64> {
        grid.iter().map(|&x| self.evaluate(x)).collect()
    }
}

/// Mean resistivity of the `k` rows nearest zero field, ignoring NaN.
pub fn zero_field_resistivity(field: &[f64], rho: &[f64], k: usize) -> Result<f64> {
    check_lengths(field, rho)?;

    let mut order: Vec<usize> = (0..field.len()).collect();
    order.sort_by(|&a, &b| field[a].abs().total_cmp(&field[b].abs()));

    Ok(nan_mean(order.into_iter().take(k).map(|i| rho[i])))
}

/// Interpolates one field branch, anchored at `(anchor, rho0)`, on the grid.
///
/// A branch without a single usable sample comes back as all NaN.
fn interpolate_branch(
    field: &[f64],
    rho: &[f64],
    rho0: f64,
    anchor: f64,
    grid: &[f64],
    keep: impl Fn(f64) -> bool,
) -> Result<Vec<f64>> {
    let mut bs = vec![anchor];
    let mut rhos = vec![rho0];
    for (&b, &r) in field.iter().zip(rho) {
        if keep(b) && !r.is_nan() {
            bs.push(b.abs());
            rhos.push(r);
        }
    }

    let (bs, rhos) = resolve_monotone(&bs, &rhos)?;
    match Pchip::new(bs, rhos) {
        Ok(interp) => Ok(interp.evaluate_all(grid)),
        Err(TransformError::TooFewPoints { .. }) => Ok(vec![f64::NAN; grid.len()]),
        Err(e) => Err(e),
    }
}

/// Resample a full ±B sweep onto `grid` (|B|, ascending) and symmetrize it.
///
/// The positive and negative branches are interpolated separately, both
/// starting from `(grid[0], rho0)`. Even parity returns their mean; odd
/// parity returns half their difference. Grid points outside a branch's
/// measured range are NaN.
pub fn symmetrize(
    field: &[f64],
    rho: &[f64],
    rho0: f64,
    grid: &[f64],
    parity: Parity,
) -> Result<Vec<f64>> {
    check_lengths(field, rho)?;
    let anchor = grid.first().copied().unwrap_or(0.0);

    let pos = interpolate_branch(field, rho, rho0, anchor, grid, |b| b > 0.0)?;
    let neg = interpolate_branch(field, rho, rho0, anchor, grid, |b| b < 0.0)?;

    Ok(pos
        .iter()
        .zip(&neg)
        .map(|(&p, &n)| match parity {
            Parity::Even => (p + n) / 2.0,
            Parity::Odd => (p - n) / 2.0,
        })
        .collect())
}

/// Magnetoresistance in percent of each row relative to its first entry.
pub fn magnetoresistance(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|row| match row.first() {
            Some(&rho0) => row.iter().map(|&rho| (rho / rho0 - 1.0) * 100.0).collect(),
            None => Vec::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_linspace() {
        let grid = linspace(0.0, 9.0, 1000);
        assert_eq!(grid.len(), 1000);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[999], 9.0);
        assert!((grid[1] - 9.0 / 999.0).abs() < EPS);

        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_resolve_monotone_merges_duplicates() {
        let xs = [3.0, 1.0, 2.0, 1.0, 3.0, 3.0];
        let ys = [6.0, 1.0, 5.0, 3.0, 9.0, 0.0];
        let (x, y) = resolve_monotone(&xs, &ys).unwrap();
        assert_eq!(x, vec![1.0, 2.0, 3.0]);
        assert_eq!(y, vec![2.0, 5.0, 5.0]);
    }

    #[test]
    fn test_resolve_monotone_empty_and_mismatch() {
        let (x, y) = resolve_monotone(&[], &[]).unwrap();
        assert!(x.is_empty() && y.is_empty());

        assert_eq!(
            resolve_monotone(&[1.0], &[]),
            Err(TransformError::LengthMismatch { xs_len: 1, ys_len: 0 })
        );
    }

    #[test]
    fn test_running_average() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [4.0, 2.0, 0.0, 2.0];
        let (x, y) = running_average(&xs, &ys, 2).unwrap();
        assert_eq!(x, vec![0.5, 1.5, 2.5]);
        assert_eq!(y, vec![3.0, 1.0, 1.0]);

        let (x, _) = running_average(&xs, &ys, 5).unwrap();
        assert!(x.is_empty());
        let (x, _) = running_average(&xs, &ys, 0).unwrap();
        assert!(x.is_empty());
    }

    #[test]
    fn test_smooth_window_bounds() {
        let seq = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let out = smooth(&seq, 2);
        // i = 0: seq[0..1]; i = 5: seq[4..5], the last sample is excluded.
        assert_eq!(out[0], 1.0);
        assert_eq!(out[1], 1.5);
        assert_eq!(out[4], 4.5);
        assert_eq!(out[5], 5.0);
    }

    #[test]
    fn test_smooth_empty_window_is_nan() {
        let out = smooth(&[1.0, 2.0, 3.0], 0);
        assert!(out.iter().all(|v| v.is_nan()));
        assert!(smooth(&[], 10).is_empty());
    }

    #[test]
    fn test_smooth_propagates_nan() {
        let out = smooth(&[1.0, f64::NAN, 3.0, 4.0, 5.0, 6.0, 7.0], 2);
        assert!(out[1].is_nan());
        assert!(out[2].is_nan());
        assert_eq!(out[3], 3.5);
    }

    #[test]
    fn test_pchip_reproduces_linear_data() {
        let xs = vec![0.0, 1.0, 2.5, 4.0];
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x + 1.0).collect();
        let interp = Pchip::new(xs, ys).unwrap();
        for x in [0.0, 0.3, 1.0, 1.7, 3.2, 4.0] {
            assert!(close(interp.evaluate(x), 2.0 * x + 1.0), "x = {}", x);
        }
    }

    #[test]
    fn test_pchip_no_extrapolation() {
        let interp = Pchip::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 4.0]).unwrap();
        assert!(interp.evaluate(-0.01).is_nan());
        assert!(interp.evaluate(2.01).is_nan());
        assert!(interp.evaluate(f64::NAN).is_nan());
        assert!(close(interp.evaluate(2.0), 4.0));
        assert_eq!(interp.domain(), (0.0, 2.0));
    }

    #[test]
    fn test_pchip_preserves_monotonicity_and_flat_extrema() {
        let xs = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let ys = vec![0.0, 0.1, 0.2, 5.0, 5.1];
        let interp = Pchip::new(xs, ys).unwrap();
        let grid = linspace(0.0, 4.0, 401);
        let values = interp.evaluate_all(&grid);
        assert!(values.windows(2).all(|w| w[1] >= w[0] - EPS));

        // A local maximum gets a zero slope and is not overshot.
        let peak = Pchip::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 0.0]).unwrap();
        let peak_values = peak.evaluate_all(&linspace(0.0, 2.0, 201));
        assert!(peak_values.iter().all(|&v| v <= 1.0 + EPS));
    }

    #[test]
    fn test_pchip_known_values() {
        // x = [0, 1, 2], y = [0, 1, 4]: interior slope is the harmonic mean 2*1*3/(1+3) = 1.5,
        // end slopes are (3*1 - 3)/2 = 0 and (3*3 - 1)/2 = 4.
        let interp = Pchip::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 4.0]).unwrap();
        assert!(close(interp.slopes[0], 0.0));
        assert!(close(interp.slopes[1], 1.5));
        assert!(close(interp.slopes[2], 4.0));
        // At s = 0.5 in [1, 2]: 0.5*1 + 0.125*1.5 + 0.5*4 - 0.125*4
        assert!(close(interp.evaluate(1.5), 2.1875));
    }

    #[test]
    fn test_pchip_rejects_bad_input() {
        assert_eq!(
            Pchip::new(vec![1.0], vec![1.0]),
            Err(TransformError::TooFewPoints { required: 2, actual: 1 })
        );
        assert_eq!(
            Pchip::new(vec![0.0, 1.0, 1.0], vec![0.0, 1.0, 2.0]),
            Err(TransformError::NotIncreasing { index: 2 })
        );
        assert!(Pchip::new(vec![0.0, f64::NAN], vec![0.0, 1.0]).is_err());
    }

    #[test]
    fn test_zero_field_resistivity() {
        let field = [-3.0, -0.1, 0.0, 0.2, 5.0];
        let rho = [9.0, 2.0, f64::NAN, 4.0, 9.0];
        // Three nearest |B|: 0.0 (NaN, skipped), -0.1, 0.2.
        assert!(close(zero_field_resistivity(&field, &rho, 3).unwrap(), 3.0));
        assert!(zero_field_resistivity(&[0.0], &[f64::NAN], 10).unwrap().is_nan());
    }

    #[test]
    fn test_symmetrize_even_and_odd() {
        let grid = linspace(0.0, 2.0, 5);
        let field = [-2.0, -1.0, 1.0, 2.0];
        // rho(B) = 1 + B^2 + 0.5 B: even part 1 + B^2, odd part 0.5 B
        let rho: Vec<f64> = field.iter().map(|b| 1.0 + b * b + 0.5 * b).collect();

        let even = symmetrize(&field, &rho, 1.0, &grid, Parity::Even).unwrap();
        let odd = symmetrize(&field, &rho, 1.0, &grid, Parity::Odd).unwrap();

        assert!(close(even[0], 1.0));
        assert!(close(even[2], 2.0));
        assert!(close(even[4], 5.0));
        assert!(close(odd[0], 0.0));
        assert!(close(odd[2], 0.5));
        assert!(close(odd[4], 1.0));
    }

    #[test]
    fn test_symmetrize_nan_outside_measured_range() {
        let grid = linspace(0.0, 4.0, 5);
        let field = [-4.0, -1.0, 1.0, 2.0];
        let rho = [1.0, 1.0, 1.0, 1.0];
        let even = symmetrize(&field, &rho, 1.0, &grid, Parity::Even).unwrap();
        assert!(close(even[2], 1.0));
        assert!(even[3].is_nan());
        assert!(even[4].is_nan());
    }

    #[test]
    fn test_symmetrize_drops_nan_rows_and_missing_branch() {
        let grid = linspace(0.0, 1.0, 3);
        let field = [0.5, 1.0, -0.5];
        let rho = [2.0, f64::NAN, f64::NAN];
        let out = symmetrize(&field, &rho, 1.0, &grid, Parity::Even).unwrap();
        // Negative branch has only the anchor, so every point is NaN.
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_magnetoresistance() {
        let mr = magnetoresistance(&[vec![2.0, 3.0, 1.0], vec![]]);
        assert_eq!(mr[0], vec![0.0, 50.0, -50.0]);
        assert!(mr[1].is_empty());
    }
}
