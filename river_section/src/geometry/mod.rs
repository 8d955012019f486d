//! Basic geometry primitives for transect processing.

use geo::{Coord, LineString, MultiPolygon, Polygon};

/// Representation of a 2D point.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Lifts the point to 3D with the given elevation.
    pub fn with_z(self, z: f64) -> Point3 {
        Point3::new(self.x, self.y, z)
    }
}

impl From<Coord<f64>> for Point {
    fn from(c: Coord<f64>) -> Self {
        Point::new(c.x, c.y)
    }
}

impl From<Point> for Coord<f64> {
    fn from(p: Point) -> Self {
        Coord { x: p.x, y: p.y }
    }
}

/// Representation of a 2D line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Line {
    pub start: Point,
    pub end: Point,
}

impl Line {
    /// Creates a new line segment.
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Returns the length of the line segment.
    pub fn length(&self) -> f64 {
        distance(self.start, self.end)
    }

    /// Returns the midpoint of the line segment.
    pub fn midpoint(&self) -> Point {
        Point::new(
            (self.start.x + self.end.x) / 2.0,
            (self.start.y + self.end.y) / 2.0,
        )
    }

    /// Returns the point at `fraction` of the way from start to end.
    pub fn point_at(&self, fraction: f64) -> Point {
        Point::new(
            self.start.x + (self.end.x - self.start.x) * fraction,
            self.start.y + (self.end.y - self.start.y) * fraction,
        )
    }

    /// Returns the segment grown by `factor` times its own length past each end.
    pub fn extended(&self, factor: f64) -> Line {
        let dx = (self.end.x - self.start.x) * factor;
        let dy = (self.end.y - self.start.y) * factor;
        Line::new(
            Point::new(self.start.x - dx, self.start.y - dy),
            Point::new(self.end.x + dx, self.end.y + dy),
        )
    }
}

impl From<Line> for geo::Line<f64> {
    fn from(l: Line) -> Self {
        geo::Line::new(Coord::from(l.start), Coord::from(l.end))
    }
}

/// Calculates the Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// Representation of a 3D point.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Drops the elevation.
    pub fn plan(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Horizontal distance between two 3D points, ignoring elevation.
pub fn plan_distance(a: Point3, b: Point3) -> f64 {
    distance(a.plan(), b.plan())
}

/// Linear interpolation between two 3D points.
pub fn lerp3(a: Point3, b: Point3, t: f64) -> Point3 {
    Point3::new(
        a.x + (b.x - a.x) * t,
        a.y + (b.y - a.y) * t,
        a.z + (b.z - a.z) * t,
    )
}

/// Representation of a series of connected 3D vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline3 {
    pub vertices: Vec<Point3>,
}

impl Polyline3 {
    pub fn new(vertices: Vec<Point3>) -> Self {
        Self { vertices }
    }

    /// Length of the path measured in plan.
    pub fn plan_length(&self) -> f64 {
        self.vertices
            .windows(2)
            .map(|pair| plan_distance(pair[0], pair[1]))
            .sum()
    }

    /// Point at the normalized plan distance `fraction` along the path.
    ///
    /// Fractions are clamped to `[0, 1]`. Returns `None` for an empty path.
    pub fn interpolate(&self, fraction: f64) -> Option<Point3> {
        let first = *self.vertices.first()?;
        let total = self.plan_length();
        if total <= 0.0 {
            return Some(first);
        }
        let target = fraction.clamp(0.0, 1.0) * total;
        let mut walked = 0.0;
        for pair in self.vertices.windows(2) {
            let seg = plan_distance(pair[0], pair[1]);
            if seg > 0.0 && walked + seg >= target {
                return Some(lerp3(pair[0], pair[1], (target - walked) / seg));
            }
            walked += seg;
        }
        self.vertices.last().copied()
    }
}

/// Iterates over every ring (exteriors and holes) of a multipolygon.
pub fn rings(polygons: &MultiPolygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    polygons
        .0
        .iter()
        .flat_map(|p: &Polygon<f64>| std::iter::once(p.exterior()).chain(p.interiors()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_length_midpoint() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        let line = Line::new(a, b);
        assert_eq!(line.length(), 5.0);
        let mid = line.midpoint();
        assert_eq!(mid, Point::new(1.5, 2.0));
    }

    #[test]
    fn line_extended_by_own_length() {
        let line = Line::new(Point::new(0.0, 0.0), Point::new(2.0, 0.0));
        let ext = line.extended(1.0);
        assert_eq!(ext.start, Point::new(-2.0, 0.0));
        assert_eq!(ext.end, Point::new(4.0, 0.0));
    }

    #[test]
    fn polyline_interpolates_in_plan() {
        let pl = Polyline3::new(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 2.0)]);
        assert!((pl.plan_length() - 10.0).abs() < 1e-12);
        let p = pl.interpolate(0.25).unwrap();
        assert!((p.x - 2.5).abs() < 1e-12);
        assert!((p.z - 0.5).abs() < 1e-12);
    }

    #[test]
    fn polyline_interpolation_crosses_vertices() {
        let pl = Polyline3::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ]);
        let p = pl.interpolate(0.75).unwrap();
        assert!((p.x - 1.0).abs() < 1e-12);
        assert!((p.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rings_include_holes() {
        let outer = LineString::from(vec![
            (0.0, 0.0),
            (4.0, 0.0),
            (4.0, 4.0),
            (0.0, 4.0),
            (0.0, 0.0),
        ]);
        let hole = LineString::from(vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 1.0)]);
        let mp = MultiPolygon::new(vec![Polygon::new(outer, vec![hole])]);
        assert_eq!(rings(&mp).count(), 2);
    }
}
