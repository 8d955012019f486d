use geo::{polygon, MultiPolygon};
use river_section::cross_section::{generate_cross_sections, write_report, PointKind};
use river_section::crs::Crs;
use river_section::error::{Side, SkipReason};
use river_section::io::shp::{
    read_point_records_shp, read_polygon_records_shp, write_polygon_records_shp, PolygonRecord,
};
use river_section::transect::{drop_duplicate_pk, sort_by_pk, transects_from_records};
use river_section::CrossSectionParams;
use shapefile::dbase::FieldValue;
use std::collections::BTreeMap;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn transect_record(pk: f64, flow: f64) -> PolygonRecord {
    let x0 = pk;
    let x1 = pk + 5.0;
    let poly = polygon![
        (x: x0, y: 0.0),
        (x: x0, y: 10.0),
        (x: x1, y: 10.0),
        (x: x1, y: 0.0),
        (x: x0, y: 0.0),
    ];
    let mut attrs = BTreeMap::new();
    attrs.insert("PK".to_string(), FieldValue::Numeric(Some(pk)));
    attrs.insert("Slope".to_string(), FieldValue::Numeric(Some(0.01)));
    attrs.insert("Q_ortho_ad".to_string(), FieldValue::Numeric(Some(flow)));
    PolygonRecord {
        geom: MultiPolygon::new(vec![poly]),
        attrs,
    }
}

fn channel_records() -> Vec<PolygonRecord> {
    [0.0, 5.0, 10.0, 15.0, 20.0]
        .iter()
        .map(|pk| transect_record(*pk, 5.0))
        .collect()
}

#[test]
fn straight_channel_from_shapefile() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("transects.shp");
    write_polygon_records_shp(input.to_str().unwrap(), &channel_records()).unwrap();
    std::fs::write(input.with_extension("prj"), "PROJCS[\"MTM zone 7\"]").unwrap();

    let params = CrossSectionParams::default();
    let records = read_polygon_records_shp(input.to_str().unwrap()).unwrap();
    assert_eq!(records.len(), 5);
    let transects = transects_from_records(&records, &params).unwrap();
    let report = generate_cross_sections(&transects, &params).unwrap();

    assert_eq!(report.processed, 3);
    assert_eq!(report.points.len(), 3 * 36);

    let depth = 2.0 * (5.0f64 * 0.037 / (10.0 * 0.1)).powf(0.6) / 1.8;
    for p in report.points.iter().filter(|p| p.kind == PointKind::Bed) {
        assert!((p.position.z - depth).abs() < 1e-9);
    }
    for pk in [5.0, 10.0, 15.0] {
        let shore: Vec<_> = report
            .points
            .iter()
            .filter(|p| p.pk == pk && p.kind == PointKind::Shore)
            .collect();
        assert_eq!(shore.len(), 2);
        let width = ((shore[0].position.x - shore[1].position.x).powi(2)
            + (shore[0].position.y - shore[1].position.y).powi(2))
        .sqrt();
        assert!((width - 10.0).abs() < 1e-9);
        assert!(shore.iter().all(|p| (p.position.x - (pk + 2.5)).abs() < 1e-9));
    }

    let crs = Crs::from_shapefile(&input).unwrap().unwrap();
    let out = dir.path().join("out");
    let written = write_report(&report, &out, &params, Some(&crs), false).unwrap();
    assert_eq!(written, vec![out.join("cross_section_points_0_3.shp")]);
    let prj = std::fs::read_to_string(out.join("cross_section_points_0_3.prj")).unwrap();
    assert_eq!(prj, "PROJCS[\"MTM zone 7\"]");

    let points = read_point_records_shp(written[0].to_str().unwrap()).unwrap();
    assert_eq!(points.len(), 108);
    let zs: Vec<f64> = points
        .iter()
        .filter_map(|r| match r.attrs.get("z") {
            Some(FieldValue::Numeric(Some(z))) => Some(*z),
            _ => None,
        })
        .collect();
    assert_eq!(zs.len(), 108);
    assert!(zs.iter().all(|z| *z >= 0.0));
}

#[test]
fn missing_neighbor_skips_only_that_transect() {
    init_logger();
    let params = CrossSectionParams::default();
    let records: Vec<PolygonRecord> = [0.0, 5.0, 15.0, 20.0, 25.0]
        .iter()
        .map(|pk| transect_record(*pk, 5.0))
        .collect();
    let transects = transects_from_records(&records, &params).unwrap();
    let report = generate_cross_sections(&transects, &params).unwrap();
    assert_eq!(report.processed, 1);
    let skipped: Vec<(f64, SkipReason)> = report
        .skipped
        .iter()
        .map(|s| (s.pk, s.reason.clone()))
        .collect();
    assert_eq!(
        skipped,
        vec![
            (5.0, SkipReason::NoContact { side: Side::Downstream }),
            (15.0, SkipReason::NoContact { side: Side::Upstream }),
        ]
    );
}

#[test]
fn split_pk_neighbors_are_merged() {
    init_logger();
    let params = CrossSectionParams::default();
    let mut lower = transect_record(5.0, 5.0);
    lower.geom = MultiPolygon::new(vec![polygon![
        (x: 5.0, y: 0.0),
        (x: 5.0, y: 5.0),
        (x: 10.0, y: 5.0),
        (x: 10.0, y: 0.0),
        (x: 5.0, y: 0.0),
    ]]);
    let mut upper = transect_record(5.0, 5.0);
    upper.geom = MultiPolygon::new(vec![polygon![
        (x: 5.0, y: 5.0),
        (x: 5.0, y: 10.0),
        (x: 10.0, y: 10.0),
        (x: 10.0, y: 5.0),
        (x: 5.0, y: 5.0),
    ]]);
    let records = vec![
        transect_record(0.0, 5.0),
        lower,
        upper,
        transect_record(10.0, 5.0),
        transect_record(15.0, 5.0),
        transect_record(20.0, 5.0),
    ];
    let mut transects = transects_from_records(&records, &params).unwrap();
    sort_by_pk(&mut transects);
    let report = generate_cross_sections(&transects, &params).unwrap();

    assert_eq!(report.processed, 4);
    assert!(report.skipped.is_empty());
    let shore: Vec<_> = report
        .points
        .iter()
        .filter(|p| p.pk == 10.0 && p.kind == PointKind::Shore)
        .collect();
    assert_eq!(shore.len(), 2);
    assert!(shore.iter().all(|p| (p.position.x - 12.5).abs() < 1e-9));
    let width = (shore[0].position.y - shore[1].position.y).abs();
    assert!((width - 10.0).abs() < 1e-9);
}

#[test]
fn duplicated_pk_keeps_last_record() {
    let params = CrossSectionParams::default();
    let mut records = channel_records();
    records.push(transect_record(10.0, 8.0));
    let transects = transects_from_records(&records, &params).unwrap();
    let mut transects = drop_duplicate_pk(transects, |t| t.pk, params.pk_tolerance);
    sort_by_pk(&mut transects);
    let pks: Vec<f64> = transects.iter().map(|t| t.pk).collect();
    assert_eq!(pks, vec![0.0, 5.0, 10.0, 15.0, 20.0]);
    assert_eq!(transects[2].flow, 8.0);
}

#[test]
fn higher_flow_gives_deeper_bed() {
    let params = CrossSectionParams::default();
    let mut records = channel_records();
    records[2] = transect_record(10.0, 20.0);
    let transects = transects_from_records(&records, &params).unwrap();
    let report = generate_cross_sections(&transects, &params).unwrap();
    let bed_z = |pk: f64| {
        report
            .points
            .iter()
            .find(|p| p.pk == pk && p.kind == PointKind::Bed)
            .map(|p| p.position.z)
            .unwrap()
    };
    assert!(bed_z(10.0) > bed_z(5.0));
    assert_eq!(bed_z(5.0), bed_z(15.0));
}
