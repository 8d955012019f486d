//! Bed depth from Manning's equation and point interpolation along a path.

use crate::geometry::{Point3, Polyline3};

/// Estimates the bed depth of a rectangular channel.
///
/// `depth = 2 * ((q * manning) / (width * sqrt(slope)))^0.6 / 1.8`
///
/// Returns `None` outside the domain `slope > 0`, `width > 0`, `q >= 0`.
pub fn bed_depth(q: f64, manning: f64, width: f64, slope: f64) -> Option<f64> {
    if !(slope > 0.0 && width > 0.0 && q >= 0.0) || !q.is_finite() {
        return None;
    }
    let normal_depth = ((q * manning) / (width * slope.sqrt())).powf(0.6);
    Some(2.0 * normal_depth / 1.8)
}

/// Number of interior points `interpolate_along` yields for a path length.
pub fn interpolation_count(length: f64, spacing: f64) -> usize {
    if !(spacing > 0.0) || !(length > 0.0) {
        return 0;
    }
    ((length / spacing).ceil() as usize).saturating_sub(1)
}

/// Evenly spaced points along `points`, endpoints excluded.
///
/// The path is divided into `ceil(length / spacing)` equal steps, so
/// consecutive points are at most `spacing` apart. Lengths are measured
/// in plan; elevations are interpolated linearly.
pub fn interpolate_along(points: &[Point3], spacing: f64) -> Vec<Point3> {
    let path = Polyline3::new(points.to_vec());
    let count = interpolation_count(path.plan_length(), spacing);
    let steps = (count + 1) as f64;
    (1..=count)
        .filter_map(|i| path.interpolate(i as f64 / steps))
        .collect()
}
