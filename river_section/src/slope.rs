//! Longitudinal slope estimation and Ramer-Douglas-Peucker simplification.
//!
//! A profile is a pair of parallel arrays: chainage (`pk`) and elevation.
//! Derived series are returned as `(pk, value)` pairs, one per sample.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RiverSectionError};

/// Samples on each side of the regression window.
const HALF_WINDOW: usize = 3;

fn check_lengths(pk: &[f64], elevation: &[f64]) -> Result<()> {
    if pk.len() != elevation.len() {
        return Err(RiverSectionError::invalid_input(format!(
            "{} PK values for {} elevations",
            pk.len(),
            elevation.len()
        )));
    }
    Ok(())
}

/// Ordinary least-squares slope of `y` against `x`.
fn regression_slope(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        sxy += (xi - mean_x) * (yi - mean_y);
        sxx += (xi - mean_x) * (xi - mean_x);
    }
    sxy / sxx
}

/// Local slope at every sample from a 7-sample linear regression.
///
/// The first and last three samples have no full window and get `NaN`.
pub fn baseline_slope(pk: &[f64], elevation: &[f64]) -> Result<Vec<(f64, f64)>> {
    check_lengths(pk, elevation)?;
    let n = pk.len();
    let slopes = (0..n)
        .map(|i| {
            if i < HALF_WINDOW || i + HALF_WINDOW >= n {
                return (pk[i], f64::NAN);
            }
            let window = i - HALF_WINDOW..=i + HALF_WINDOW;
            (pk[i], regression_slope(&pk[window.clone()], &elevation[window]))
        })
        .collect();
    Ok(slopes)
}

/// Perpendicular distance from `p` to the line through `a` and `b`.
///
/// Falls back to the distance to `a` when `a` and `b` coincide.
fn perpendicular_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 {
        return ((p.0 - a.0).powi(2) + (p.1 - a.1).powi(2)).sqrt();
    }
    (dx * (a.1 - p.1) - dy * (a.0 - p.0)).abs() / length
}

fn rdp_recurse(points: &[(f64, f64)], start: usize, end: usize, epsilon: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }
    let mut max_dist = 0.0;
    let mut max_idx = start;
    for i in start + 1..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }
    if max_dist > epsilon {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, epsilon, kept);
        rdp_recurse(points, max_idx, end, epsilon, kept);
    }
}

/// Simplifies the (PK, elevation) curve with the recursive RDP algorithm.
///
/// A point survives only if its deviation strictly exceeds `epsilon`. The
/// first and last samples are always kept.
pub fn simplify(pk: &[f64], elevation: &[f64], epsilon: f64) -> Result<Vec<(f64, f64)>> {
    check_lengths(pk, elevation)?;
    if !(epsilon >= 0.0) {
        return Err(RiverSectionError::invalid_input(format!(
            "epsilon must be a non-negative number, got {epsilon}"
        )));
    }
    let points: Vec<(f64, f64)> = pk.iter().copied().zip(elevation.iter().copied()).collect();
    if points.len() < 3 {
        return Ok(points);
    }
    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;
    rdp_recurse(&points, 0, points.len() - 1, epsilon, &mut kept);
    Ok(points
        .into_iter()
        .zip(kept)
        .filter_map(|(p, k)| k.then_some(p))
        .collect())
}

/// Slope of one simplified segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentSlope {
    pub start: f64,
    pub end: f64,
    pub slope: f64,
}

impl SegmentSlope {
    /// Whether `pk` falls in `[start, end)`, or `[start, end]` when `closed`.
    fn contains(&self, pk: f64, closed: bool) -> bool {
        self.start <= pk && (pk < self.end || (closed && pk <= self.end))
    }
}

/// Slopes between consecutive retained points.
pub fn segment_slopes(simplified: &[(f64, f64)]) -> Vec<SegmentSlope> {
    simplified
        .windows(2)
        .map(|pair| SegmentSlope {
            start: pair[0].0,
            end: pair[1].0,
            slope: (pair[1].1 - pair[0].1) / (pair[1].0 - pair[0].0),
        })
        .collect()
}

/// Assigns every profile PK the slope of the simplified segment containing it.
///
/// Segments are left-closed, so a PK sitting on a breakpoint takes the slope
/// of the segment that starts there; the final segment also includes its end.
pub fn interpolate_segment_slopes(
    pk: &[f64],
    simplified: &[(f64, f64)],
) -> Result<Vec<(f64, f64)>> {
    let segments = segment_slopes(simplified);
    let last = segments.len().saturating_sub(1);
    pk.iter()
        .map(|&p| {
            segments
                .iter()
                .enumerate()
                .find(|(i, s)| s.contains(p, *i == last))
                .map(|(_, s)| (p, s.slope))
                .ok_or_else(|| RiverSectionError::SegmentLookup {
                    pk: p,
                    segments: segments.iter().map(|s| (s.start, s.end)).collect(),
                })
        })
        .collect()
}

/// Simplified curve and per-sample slope for one tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RdpProfile {
    pub epsilon: f64,
    pub simplified: Vec<(f64, f64)>,
    pub interpolated_slope: Vec<(f64, f64)>,
}

/// Computes the simplified profile and its slopes for `epsilon`.
pub fn rdp_profile(pk: &[f64], elevation: &[f64], epsilon: f64) -> Result<RdpProfile> {
    let simplified = simplify(pk, elevation, epsilon)?;
    let interpolated_slope = interpolate_segment_slopes(pk, &simplified)?;
    Ok(RdpProfile {
        epsilon,
        simplified,
        interpolated_slope,
    })
}

/// Tolerances from 0 to 1 inclusive in steps of `step`.
pub fn epsilon_grid(step: f64) -> Result<Vec<f64>> {
    if !(step > 0.0 && step <= 1.0) {
        return Err(RiverSectionError::invalid_params(format!(
            "epsilon step must be in (0, 1], got {step}"
        )));
    }
    let count = (1.0 / step).round() as usize;
    Ok((0..=count)
        .map(|i| ((i as f64 * step) * 1e6).round() / 1e6)
        .filter(|e| *e <= 1.0)
        .collect())
}

/// Precomputed series consumed by the profile viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileBundle {
    pub pk: Vec<f64>,
    pub elevation: Vec<f64>,
    /// `None` where the regression window is incomplete.
    pub baseline_slope: Vec<Option<f64>>,
    pub rdp: Vec<RdpProfile>,
}

impl ProfileBundle {
    /// Builds the bundle for every tolerance in `epsilons`.
    pub fn build(pk: &[f64], elevation: &[f64], epsilons: &[f64]) -> Result<Self> {
        let baseline = baseline_slope(pk, elevation)?;
        let rdp = epsilons
            .iter()
            .map(|&e| rdp_profile(pk, elevation, e))
            .collect::<Result<Vec<_>>>()?;
        log::info!(
            "profile bundle: {} samples, {} tolerances",
            pk.len(),
            rdp.len()
        );
        Ok(Self {
            pk: pk.to_vec(),
            elevation: elevation.to_vec(),
            baseline_slope: baseline
                .into_iter()
                .map(|(_, s)| if s.is_nan() { None } else { Some(s) })
                .collect(),
            rdp,
        })
    }

    /// Looks up the precomputed series for a tolerance.
    pub fn get(&self, epsilon: f64) -> Option<&RdpProfile> {
        self.rdp.iter().find(|r| (r.epsilon - epsilon).abs() < 1e-9)
    }

    pub fn write_json(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        crate::io::write_string(path, &json)?;
        Ok(())
    }

    pub fn read_json(path: &str) -> Result<Self> {
        let contents = crate::io::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
