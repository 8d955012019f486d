use geo::{polygon, MultiPolygon};
use river_section::geometry::{Line, Point, Point3};
use river_section::io::shp::{
    read_field_names_dbf, read_point_records_shp, read_polygon_records_shp, write_line_records_shp,
    write_point_records_shp, write_polygon_records_shp, LineRecord, PointRecord, PolygonRecord,
};
use shapefile::dbase::FieldValue;
use std::collections::BTreeMap;
use tempfile::NamedTempFile;

#[test]
fn point_z_record_roundtrip() {
    let mut attrs = BTreeMap::new();
    attrs.insert("PK".to_string(), FieldValue::Numeric(Some(12.5)));
    let rec = PointRecord {
        geom: Point::new(1.0, 2.0),
        geom_z: Some(Point3::new(1.0, 2.0, 0.75)),
        attrs,
    };
    let file = NamedTempFile::new().unwrap();
    write_point_records_shp(file.path().to_str().unwrap(), &[rec.clone()]).unwrap();
    let records = read_point_records_shp(file.path().to_str().unwrap()).unwrap();
    assert_eq!(records, vec![rec]);
}

#[test]
fn multipart_polygon_stays_one_record() {
    let mut attrs = BTreeMap::new();
    attrs.insert("PK".to_string(), FieldValue::Numeric(Some(5.0)));
    let left = polygon![
        (x: 0.0, y: 0.0),
        (x: 0.0, y: 1.0),
        (x: 1.0, y: 1.0),
        (x: 1.0, y: 0.0),
        (x: 0.0, y: 0.0),
    ];
    let right = polygon![
        (x: 3.0, y: 0.0),
        (x: 3.0, y: 1.0),
        (x: 4.0, y: 1.0),
        (x: 4.0, y: 0.0),
        (x: 3.0, y: 0.0),
    ];
    let rec = PolygonRecord {
        geom: MultiPolygon::new(vec![left, right]),
        attrs,
    };
    let file = NamedTempFile::new().unwrap();
    write_polygon_records_shp(file.path().to_str().unwrap(), &[rec.clone()]).unwrap();
    let records = read_polygon_records_shp(file.path().to_str().unwrap()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].geom.0.len(), 2);
    assert_eq!(records[0].attrs, rec.attrs);
}

#[test]
fn line_records_write_all_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lines.shp");
    let mut attrs = BTreeMap::new();
    attrs.insert("PK".to_string(), FieldValue::Numeric(Some(5.0)));
    let rec = LineRecord {
        geom: Line::new(Point::new(5.0, 0.0), Point::new(10.0, 0.0)),
        attrs,
    };
    write_line_records_shp(path.to_str().unwrap(), &[rec]).unwrap();
    assert!(path.exists());
    assert!(path.with_extension("shx").exists());
    assert!(path.with_extension("dbf").exists());
}

#[test]
fn empty_layers_write_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.shp");
    write_point_records_shp(path.to_str().unwrap(), &[]).unwrap();
    assert!(!path.exists());
}

#[test]
fn field_names_follow_table_order() {
    use shapefile::dbase::{FieldName, Record, TableWriterBuilder};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ordered.shp");
    let builder = TableWriterBuilder::new()
        .add_numeric_field(FieldName::try_from("Slope").unwrap(), 10, 3)
        .add_numeric_field(FieldName::try_from("PK").unwrap(), 10, 3);
    let mut writer = shapefile::Writer::from_path(&path, builder).unwrap();
    let mut record = Record::default();
    record.insert("Slope".to_string(), FieldValue::Numeric(Some(0.01)));
    record.insert("PK".to_string(), FieldValue::Numeric(Some(5.0)));
    writer
        .write_shape_and_record(&shapefile::Point { x: 0.0, y: 0.0 }, &record)
        .unwrap();
    drop(writer);

    let fields = read_field_names_dbf(path.to_str().unwrap()).unwrap();
    assert_eq!(fields, vec!["Slope".to_string(), "PK".to_string()]);
}
