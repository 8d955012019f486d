//! Cross-section point cloud generation from a sequence of transects.
//!
//! Each interior transect is bounded by its upstream and downstream
//! neighbors. The shared boundary stretches give the channel sides, which are
//! projected onto the transect boundary as shore points. A flat bed at the
//! Manning depth is placed between them and the profile is densified.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use shapefile::dbase::FieldValue;

use crate::crs::Crs;
use crate::error::{Result, RiverSectionError, Side, SkipReason};
use crate::geometry::{Line, Point, Point3};
use crate::intersection::{
    choose_non_crossing_pairing, contact_points, farthest_pair, neighboring_polygon,
    project_onto_boundary,
};
use crate::io::shp::{write_line_records_shp, write_point_records_shp, LineRecord, PointRecord};
use crate::manning::{bed_depth, interpolate_along};
use crate::params::CrossSectionParams;
use crate::transect::Transect;

/// Role of a generated point in the cross-section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum PointKind {
    Shore,
    Bed,
    /// Interpolated between a shore point and its bed point.
    Bank,
    /// Interpolated along the bed.
    BedLine,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SectionPoint {
    pub pk: f64,
    pub position: Point3,
    pub kind: PointKind,
}

/// A diagnostic point tagged with its transect chainage.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct TaggedPoint {
    pub pk: f64,
    pub point: Point,
}

/// A diagnostic segment tagged with its transect chainage.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct TaggedLine {
    pub pk: f64,
    pub line: Line,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SkippedTransect {
    pub index: usize,
    pub pk: f64,
    pub reason: SkipReason,
}

/// Everything produced by a run over a transect sequence.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct CrossSectionReport {
    pub points: Vec<SectionPoint>,
    /// Upstream and downstream contact pairs of every processed transect.
    pub boundary_points: Vec<TaggedPoint>,
    /// The two pairing segments of every processed transect.
    pub boundary_lines: Vec<TaggedLine>,
    pub skipped: Vec<SkippedTransect>,
    pub processed: usize,
}

/// Result of running the pipeline on one transect.
#[derive(Debug, Clone, PartialEq)]
pub enum TransectOutcome {
    Processed {
        points: Vec<SectionPoint>,
        contacts: [Point; 4],
        segments: [Line; 2],
    },
    Skipped(SkipReason),
}

/// Points of one cross-section given its two shore points.
///
/// Shore points sit at `z = 0` and the bed points at the Manning depth. The
/// bank and bed lines are densified at `params.spacing`.
pub fn section_points(
    shore: [Point; 2],
    pk: f64,
    flow: f64,
    slope: f64,
    params: &CrossSectionParams,
) -> std::result::Result<Vec<SectionPoint>, SkipReason> {
    let shore_line = Line::new(shore[0], shore[1]);
    let width = shore_line.length();
    if width <= 0.0 {
        return Err(SkipReason::DegenerateShoreLine);
    }
    if !(slope > 0.0) {
        return Err(SkipReason::UndefinedSlope { slope });
    }
    let depth =
        bed_depth(flow, params.manning, width, slope).ok_or(SkipReason::InvalidFlow { flow })?;

    let (near, far) = params.bed_fractions;
    let shore3 = [shore[0].with_z(0.0), shore[1].with_z(0.0)];
    let bed3 = [
        shore_line.point_at(near).with_z(depth),
        shore_line.point_at(far).with_z(depth),
    ];

    let tag = |kind: PointKind| move |position: Point3| SectionPoint { pk, position, kind };
    let mut points: Vec<SectionPoint> = Vec::new();
    points.extend(shore3.iter().copied().map(tag(PointKind::Shore)));
    points.extend(bed3.iter().copied().map(tag(PointKind::Bed)));
    for (s, b) in shore3.iter().zip(&bed3) {
        let bank = interpolate_along(&[*s, *b], params.spacing);
        points.extend(bank.into_iter().map(tag(PointKind::Bank)));
    }
    let bed_line = interpolate_along(&bed3, params.spacing);
    points.extend(bed_line.into_iter().map(tag(PointKind::BedLine)));
    Ok(points)
}

fn contact_pair(
    transects: &[Transect],
    current: &Transect,
    side: Side,
    params: &CrossSectionParams,
) -> std::result::Result<[Point; 2], SkipReason> {
    let pk = match side {
        Side::Upstream => current.pk - params.neighbor_offset,
        Side::Downstream => current.pk + params.neighbor_offset,
    };
    let neighbor = neighboring_polygon(transects, pk, params.pk_tolerance);
    let contacts = contact_points(&current.geometry, &neighbor);
    if contacts.is_empty() {
        return Err(SkipReason::NoContact { side });
    }
    farthest_pair(&contacts).ok_or(SkipReason::DegenerateContact { side })
}

/// Runs the cross-section pipeline on the transect at `index`.
///
/// Fails only when neither pairing of the contact points is free of
/// crossings, which points at broken transect topology.
pub fn process_transect(
    transects: &[Transect],
    index: usize,
    params: &CrossSectionParams,
) -> Result<TransectOutcome> {
    let current = &transects[index];
    let before = match contact_pair(transects, current, Side::Upstream, params) {
        Ok(pair) => pair,
        Err(reason) => return Ok(TransectOutcome::Skipped(reason)),
    };
    let after = match contact_pair(transects, current, Side::Downstream, params) {
        Ok(pair) => pair,
        Err(reason) => return Ok(TransectOutcome::Skipped(reason)),
    };
    let extremities = choose_non_crossing_pairing(&before, &after)
        .ok_or(RiverSectionError::InvalidPairing { index, pk: current.pk })?;
    let shore = match project_onto_boundary(extremities.points, &current.geometry) {
        Some(shore) => shore,
        None => return Ok(TransectOutcome::Skipped(SkipReason::NoBoundaryCrossing)),
    };
    Ok(match section_points(shore, current.pk, current.flow, current.slope, params) {
        Ok(points) => TransectOutcome::Processed {
            points,
            contacts: [before[0], before[1], after[0], after[1]],
            segments: extremities.segments,
        },
        Err(reason) => TransectOutcome::Skipped(reason),
    })
}

/// Generates the point cloud for every interior transect.
///
/// Transects are processed in input order; the first and last only serve as
/// neighbors.
pub fn generate_cross_sections(
    transects: &[Transect],
    params: &CrossSectionParams,
) -> Result<CrossSectionReport> {
    params.validate()?;
    if transects.len() < 3 {
        return Err(RiverSectionError::TooFewTransects {
            required: 3,
            found: transects.len(),
        });
    }
    let mut report = CrossSectionReport::default();
    for index in 1..transects.len() - 1 {
        let pk = transects[index].pk;
        match process_transect(transects, index, params)? {
            TransectOutcome::Processed {
                points,
                contacts,
                segments,
            } => {
                log::debug!("transect {} (PK {}): {} points", index, pk, points.len());
                report.points.extend(points);
                report
                    .boundary_points
                    .extend(contacts.iter().map(|&point| TaggedPoint { pk, point }));
                report
                    .boundary_lines
                    .extend(segments.iter().map(|&line| TaggedLine { pk, line }));
                report.processed += 1;
            }
            TransectOutcome::Skipped(reason) => {
                log::warn!("skipping transect {} (PK {}): {}", index, pk, reason);
                report.skipped.push(SkippedTransect { index, pk, reason });
            }
        }
    }
    log::info!(
        "{} transects processed, {} skipped, {} points",
        report.processed,
        report.skipped.len(),
        report.points.len()
    );
    Ok(report)
}

/// File name of the point cloud for the configured spacing.
pub fn points_file_name(params: &CrossSectionParams) -> String {
    format!("cross_section_points_{}.shp", params.spacing_tag())
}

fn pk_attrs(pk: f64) -> BTreeMap<String, FieldValue> {
    let mut attrs = BTreeMap::new();
    attrs.insert("PK".to_string(), FieldValue::Numeric(Some(pk)));
    attrs
}

fn finish_layer(path: &Path, crs: Option<&Crs>, written: &mut Vec<PathBuf>) -> Result<()> {
    if let Some(crs) = crs {
        crs.write_prj(path)?;
    }
    written.push(path.to_path_buf());
    Ok(())
}

/// Writes the point cloud and, with `diagnostics`, the boundary layers.
///
/// Empty layers are not written. Returns the paths of the written shapefiles.
pub fn write_report(
    report: &CrossSectionReport,
    out_dir: &Path,
    params: &CrossSectionParams,
    crs: Option<&Crs>,
    diagnostics: bool,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)?;
    let mut written = Vec::new();

    if !report.points.is_empty() {
        let records: Vec<PointRecord> = report
            .points
            .iter()
            .map(|p| {
                let mut attrs = pk_attrs(p.pk);
                attrs.insert("z".to_string(), FieldValue::Numeric(Some(p.position.z)));
                PointRecord {
                    geom: p.position.plan(),
                    geom_z: Some(p.position),
                    attrs,
                }
            })
            .collect();
        let path = out_dir.join(points_file_name(params));
        write_point_records_shp(&path.to_string_lossy(), &records)?;
        finish_layer(&path, crs, &mut written)?;
    }

    if diagnostics && !report.boundary_points.is_empty() {
        let records: Vec<PointRecord> = report
            .boundary_points
            .iter()
            .map(|p| PointRecord {
                geom: p.point,
                geom_z: None,
                attrs: pk_attrs(p.pk),
            })
            .collect();
        let path = out_dir.join("boundary_points.shp");
        write_point_records_shp(&path.to_string_lossy(), &records)?;
        finish_layer(&path, crs, &mut written)?;

        let records: Vec<LineRecord> = report
            .boundary_lines
            .iter()
            .map(|l| LineRecord {
                geom: l.line,
                attrs: pk_attrs(l.pk),
            })
            .collect();
        let path = out_dir.join("boundary_lines.shp");
        write_line_records_shp(&path.to_string_lossy(), &records)?;
        finish_layer(&path, crs, &mut written)?;
    }
    Ok(written)
}
