//! Polygon contact and shoreline geometry between neighboring transects.

use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{BooleanOps, Coord, EuclideanDistance, Intersects, LineString, MultiPolygon};

use crate::geometry::{distance, rings, Line, Point};
use crate::transect::Transect;

/// Parametric tolerance along a single edge.
const PARAM_EPS: f64 = 1e-9;

/// Distance to a boundary, relative to coordinate magnitude, still counted as on it.
const BOUNDARY_REL_EPS: f64 = 1e-10;

/// Returns the geometry of the transects located at `pk`.
///
/// Several transects sharing the same chainage are merged into their union.
/// The result is empty when no transect matches.
pub fn neighboring_polygon(transects: &[Transect], pk: f64, tolerance: f64) -> MultiPolygon<f64> {
    let mut matches = transects.iter().filter(|t| (t.pk - pk).abs() <= tolerance);
    let first = match matches.next() {
        Some(t) => t.geometry.clone(),
        None => return MultiPolygon::new(Vec::new()),
    };
    matches.fold(first, |acc, t| acc.union(&t.geometry))
}

/// Endpoints of every stretch of `a`'s boundary that lies inside or on `b`.
///
/// Each connected stretch contributes its two endpoints, so the result holds
/// an even number of points. Stretches that only touch `b` in a single point
/// are ignored.
pub fn contact_points(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Vec<Point> {
    if b.0.is_empty() {
        return Vec::new();
    }
    let mut points = Vec::new();
    for ring in rings(a) {
        for (start, end) in ring_runs_inside(ring, b) {
            points.push(start);
            points.push(end);
        }
    }
    points
}

/// Exhaustive search for the two points farthest apart.
///
/// Returns `None` when there are fewer than two distinct points.
pub fn farthest_pair(points: &[Point]) -> Option<[Point; 2]> {
    let mut best: Option<[Point; 2]> = None;
    let mut max_distance = 0.0;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            let d = distance(*a, *b);
            if d > max_distance {
                max_distance = d;
                best = Some([*a, *b]);
            }
        }
    }
    best
}

/// How upstream and downstream contact points are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pairing {
    /// `before[0]-after[0]` and `before[1]-after[1]`.
    Direct,
    /// `before[0]-after[1]` and `before[1]-after[0]`.
    Swapped,
}

impl Pairing {
    const CANDIDATES: [Pairing; 2] = [Pairing::Direct, Pairing::Swapped];

    fn segments(self, before: &[Point; 2], after: &[Point; 2]) -> [Line; 2] {
        match self {
            Pairing::Direct => [Line::new(before[0], after[0]), Line::new(before[1], after[1])],
            Pairing::Swapped => [Line::new(before[0], after[1]), Line::new(before[1], after[0])],
        }
    }
}

/// The two points marking the channel sides of a transect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremities {
    /// Midpoints of the two pairing segments.
    pub points: [Point; 2],
    /// Segments joining upstream and downstream contacts.
    pub segments: [Line; 2],
    pub pairing: Pairing,
}

/// Pairs upstream and downstream contacts so the joining segments do not cross.
///
/// Touching segments count as crossing. Returns `None` when both candidate
/// pairings cross.
pub fn choose_non_crossing_pairing(before: &[Point; 2], after: &[Point; 2]) -> Option<Extremities> {
    Pairing::CANDIDATES.into_iter().find_map(|pairing| {
        let segments = pairing.segments(before, after);
        let first: geo::Line<f64> = segments[0].into();
        let second: geo::Line<f64> = segments[1].into();
        if first.intersects(&second) {
            return None;
        }
        Some(Extremities {
            points: [segments[0].midpoint(), segments[1].midpoint()],
            segments,
            pairing,
        })
    })
}

/// Moves both points onto the polygon boundary along the line through them.
///
/// The line is extended by its own length past each end before being
/// intersected with every ring; each point takes the nearest crossing.
/// Returns `None` if the extended line never meets the boundary.
pub fn project_onto_boundary(
    points: [Point; 2],
    polygon: &MultiPolygon<f64>,
) -> Option<[Point; 2]> {
    let ray: geo::Line<f64> = Line::new(points[0], points[1]).extended(1.0).into();
    let mut crossings: Vec<Point> = Vec::new();
    for ring in rings(polygon) {
        for side in ring.lines() {
            match line_intersection(ray, side) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    crossings.push(intersection.into());
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    crossings.push(intersection.start.into());
                    crossings.push(intersection.end.into());
                }
                None => {}
            }
        }
    }
    let nearest = |p: Point| {
        crossings
            .iter()
            .copied()
            .min_by(|a, b| distance(p, *a).total_cmp(&distance(p, *b)))
    };
    Some([nearest(points[0])?, nearest(points[1])?])
}

fn param_on(edge: &geo::Line<f64>, c: Coord<f64>) -> f64 {
    let d = edge.delta();
    let len2 = d.x * d.x + d.y * d.y;
    if len2 == 0.0 {
        return 0.0;
    }
    (((c.x - edge.start.x) * d.x + (c.y - edge.start.y) * d.y) / len2).clamp(0.0, 1.0)
}

fn coord_at(edge: &geo::Line<f64>, t: f64) -> Coord<f64> {
    if t <= PARAM_EPS {
        edge.start
    } else if t >= 1.0 - PARAM_EPS {
        edge.end
    } else {
        edge.start + edge.delta() * t
    }
}

/// Absolute distance under which a point is taken to lie on a boundary near `edge`.
fn boundary_tolerance(edge: &geo::Line<f64>) -> f64 {
    let scale = [edge.start.x, edge.start.y, edge.end.x, edge.end.y]
        .iter()
        .fold(1.0_f64, |m, v| m.max(v.abs()));
    scale * BOUNDARY_REL_EPS
}

/// Parameter intervals of `edge` lying inside or on the boundary of `other`.
///
/// Points within [`boundary_tolerance`] of a boundary of `other` count as on
/// it, so a shared edge split by an extra vertex on one side stays shared.
fn inside_intervals(edge: &geo::Line<f64>, other: &MultiPolygon<f64>) -> Vec<(f64, f64)> {
    let tolerance = boundary_tolerance(edge);
    let mut cuts = vec![0.0, 1.0];
    let mut shared: Vec<(f64, f64)> = Vec::new();
    for ring in rings(other) {
        for vertex in ring.coords() {
            if geo::Point::from(*vertex).euclidean_distance(edge) <= tolerance {
                cuts.push(param_on(edge, *vertex));
            }
        }
        for side in ring.lines() {
            match line_intersection(*edge, side) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    cuts.push(param_on(edge, intersection));
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    let a = param_on(edge, intersection.start);
                    let b = param_on(edge, intersection.end);
                    cuts.push(a);
                    cuts.push(b);
                    shared.push((a.min(b), a.max(b)));
                }
                None => {}
            }
        }
    }
    cuts.sort_by(|a, b| a.total_cmp(b));
    cuts.dedup_by(|later, kept| (*later - *kept).abs() <= PARAM_EPS);

    let mut intervals: Vec<(f64, f64)> = Vec::new();
    for pair in cuts.windows(2) {
        let (t0, t1) = (pair[0], pair[1]);
        let mid = 0.5 * (t0 + t1);
        let on_shared = shared
            .iter()
            .any(|(a, b)| *a - PARAM_EPS <= mid && mid <= *b + PARAM_EPS);
        let inside = on_shared || {
            let c = coord_at(edge, mid);
            other.0.iter().any(|p| p.intersects(&c)) || near_boundary(c, other, tolerance)
        };
        if !inside {
            continue;
        }
        match intervals.last_mut() {
            Some(last) if (last.1 - t0).abs() <= PARAM_EPS => last.1 = t1,
            _ => intervals.push((t0, t1)),
        }
    }
    intervals
}

fn near_boundary(c: Coord<f64>, polygons: &MultiPolygon<f64>, tolerance: f64) -> bool {
    let p = geo::Point::from(c);
    rings(polygons)
        .flat_map(|ring| ring.lines())
        .any(|side| p.euclidean_distance(&side) <= tolerance)
}

struct Run {
    start: Coord<f64>,
    end: Coord<f64>,
    from_origin: bool,
}

/// Maximal connected stretches of `ring` inside `other`, as endpoint pairs.
fn ring_runs_inside(ring: &LineString<f64>, other: &MultiPolygon<f64>) -> Vec<(Point, Point)> {
    let edges: Vec<geo::Line<f64>> = ring.lines().filter(|l| l.start != l.end).collect();
    let mut runs: Vec<Run> = Vec::new();
    // index of the edge whose last interval reached its end vertex
    let mut open_until: Option<usize> = None;

    for (i, edge) in edges.iter().enumerate() {
        for (t0, t1) in inside_intervals(edge, other) {
            let start = coord_at(edge, t0);
            let end = coord_at(edge, t1);
            let continues = t0 <= PARAM_EPS && i > 0 && open_until == Some(i - 1);
            match runs.last_mut() {
                Some(run) if continues => run.end = end,
                _ => runs.push(Run {
                    start,
                    end,
                    from_origin: i == 0 && t0 <= PARAM_EPS,
                }),
            }
            open_until = if t1 >= 1.0 - PARAM_EPS { Some(i) } else { None };
        }
    }

    let closes_ring = !edges.is_empty() && open_until == Some(edges.len() - 1);
    if closes_ring && runs.len() > 1 && runs[0].from_origin {
        if let Some(last) = runs.pop() {
            runs[0].start = last.start;
        }
    }

    runs.into_iter()
        .map(|run| (run.start.into(), run.end.into()))
        .collect()
}
