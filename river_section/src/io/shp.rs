use crate::geometry::{Line, Point, Point3};
use geo_types::{LineString, MultiPolygon, Polygon};
use shapefile::dbase::TableWriterBuilder;
use shapefile::dbase::{FieldName, FieldValue, Record};
use shapefile::{
    Point as ShpPoint, PointZ as ShpPointZ, Polygon as ShpPolygon, PolygonRing,
    Polyline as ShpPolyline, Reader, Shape, Writer, NO_DATA,
};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// Record type for a point geometry and its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    pub geom: Point,
    pub geom_z: Option<Point3>,
    pub attrs: BTreeMap<String, FieldValue>,
}

/// Record type for a single segment and its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRecord {
    pub geom: Line,
    pub attrs: BTreeMap<String, FieldValue>,
}

/// Record type for a (multi)polygon geometry and its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonRecord {
    pub geom: MultiPolygon<f64>,
    pub attrs: BTreeMap<String, FieldValue>,
}

fn build_table_builder(attrs: &BTreeMap<String, FieldValue>) -> io::Result<TableWriterBuilder> {
    use std::convert::TryFrom;
    let mut builder = TableWriterBuilder::new();
    for (name, value) in attrs {
        let field_name = FieldName::try_from(name.as_str()).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("field name {name}: {e:?}"),
            )
        })?;
        builder = match value {
            FieldValue::Character(_) | FieldValue::Memo(_) => {
                builder.add_character_field(field_name, 64)
            }
            FieldValue::Numeric(_) => builder.add_numeric_field(field_name, 18, 5),
            FieldValue::Logical(_) => builder.add_logical_field(field_name),
            FieldValue::Integer(_) => builder.add_integer_field(field_name),
            FieldValue::Float(_) => builder.add_float_field(field_name, 18, 5),
            FieldValue::Double(_) => builder.add_double_field(field_name),
            FieldValue::Date(_) => builder.add_date_field(field_name),
            FieldValue::Currency(_) => builder.add_currency_field(field_name),
            FieldValue::DateTime(_) => builder.add_datetime_field(field_name),
        };
    }
    Ok(builder)
}

fn to_record(attrs: &BTreeMap<String, FieldValue>) -> Record {
    let mut r = Record::default();
    for (k, v) in attrs {
        r.insert(k.clone(), v.clone());
    }
    r
}

/// Renders an attribute value as text, empty for null values.
pub fn field_value_to_string(v: &FieldValue) -> String {
    match v {
        FieldValue::Character(Some(s)) => s.trim().to_string(),
        FieldValue::Character(None) => String::new(),
        FieldValue::Numeric(Some(n)) => n.to_string(),
        FieldValue::Numeric(None) => String::new(),
        FieldValue::Logical(Some(b)) => b.to_string(),
        FieldValue::Logical(None) => String::new(),
        FieldValue::Date(Some(d)) => format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day()),
        FieldValue::Date(None) => String::new(),
        FieldValue::Float(Some(f)) => f.to_string(),
        FieldValue::Float(None) => String::new(),
        FieldValue::Integer(i) => i.to_string(),
        FieldValue::Currency(c) => c.to_string(),
        FieldValue::DateTime(dt) => format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            dt.date().year(),
            dt.date().month(),
            dt.date().day(),
            dt.time().hours(),
            dt.time().minutes(),
            dt.time().seconds()
        ),
        FieldValue::Double(d) => d.to_string(),
        FieldValue::Memo(s) => s.clone(),
    }
}

/// Reads an attribute as a number; text fields are parsed.
pub fn field_value_as_f64(v: &FieldValue) -> Option<f64> {
    match v {
        FieldValue::Numeric(n) => *n,
        FieldValue::Float(f) => f.map(f64::from),
        FieldValue::Double(d) => Some(*d),
        FieldValue::Integer(i) => Some(f64::from(*i)),
        FieldValue::Currency(c) => Some(*c),
        FieldValue::Character(Some(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Groups shapefile rings into polygons: each outer ring opens a polygon and
/// the inner rings that follow become its holes.
fn rings_to_multipolygon(
    rings: impl Iterator<Item = (bool, Vec<(f64, f64)>)>,
) -> MultiPolygon<f64> {
    let mut polygons: Vec<Polygon<f64>> = Vec::new();
    for (outer, coords) in rings {
        let ring = LineString::from(coords);
        match polygons.last_mut() {
            Some(last) if !outer => last.interiors_push(ring),
            _ => polygons.push(Polygon::new(ring, Vec::new())),
        }
    }
    MultiPolygon::new(polygons)
}

/// Attribute names of a shapefile in `.dbf` column order.
pub fn read_field_names_dbf(shp_path: &str) -> io::Result<Vec<String>> {
    let dbf = Path::new(shp_path).with_extension("dbf");
    let reader = shapefile::dbase::Reader::from_path(&dbf)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(reader
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .filter(|name| name != "DeletionFlag")
        .collect())
}

/// Reads Polygon records with attributes from a shapefile.
///
/// All rings of a record are kept together, so multi-part transects stay a
/// single record.
pub fn read_polygon_records_shp(path: &str) -> io::Result<Vec<PolygonRecord>> {
    let mut reader = Reader::from_path(path)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut out = Vec::new();
    for res in reader.iter_shapes_and_records() {
        let (shape, record) = res.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let attrs: BTreeMap<_, _> = record.into_iter().collect();
        let geom = match shape {
            Shape::Polygon(pg) => rings_to_multipolygon(pg.rings().iter().map(|ring| {
                let outer = matches!(ring, PolygonRing::Outer(_));
                (outer, ring.points().iter().map(|p| (p.x, p.y)).collect())
            })),
            Shape::PolygonZ(pg) => rings_to_multipolygon(pg.rings().iter().map(|ring| {
                let outer = matches!(ring, PolygonRing::Outer(_));
                (outer, ring.points().iter().map(|p| (p.x, p.y)).collect())
            })),
            Shape::PolygonM(pg) => rings_to_multipolygon(pg.rings().iter().map(|ring| {
                let outer = matches!(ring, PolygonRing::Outer(_));
                (outer, ring.points().iter().map(|p| (p.x, p.y)).collect())
            })),
            _ => {
                log::warn!("{}: skipping non-polygon shape", path);
                continue;
            }
        };
        out.push(PolygonRecord { geom, attrs });
    }
    Ok(out)
}

/// Writes Polygon records with attributes to a shapefile.
pub fn write_polygon_records_shp(path: &str, records: &[PolygonRecord]) -> io::Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    let builder = build_table_builder(&records[0].attrs)?;
    let mut writer = Writer::from_path(path, builder)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    for rec in records {
        let mut rings = Vec::new();
        for poly in &rec.geom.0 {
            let to_shp = |ls: &LineString<f64>| -> Vec<ShpPoint> {
                ls.coords().map(|c| ShpPoint { x: c.x, y: c.y }).collect()
            };
            rings.push(PolygonRing::Outer(to_shp(poly.exterior())));
            for hole in poly.interiors() {
                rings.push(PolygonRing::Inner(to_shp(hole)));
            }
        }
        if rings.is_empty() {
            continue;
        }
        let shp_poly = ShpPolygon::with_rings(rings);
        writer
            .write_shape_and_record(&shp_poly, &to_record(&rec.attrs))
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    }
    Ok(())
}

/// Writes Point records with attributes to a shapefile.
///
/// Records carrying `geom_z` are written as PointZ shapes.
pub fn write_point_records_shp(path: &str, records: &[PointRecord]) -> io::Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    let builder = build_table_builder(&records[0].attrs)?;
    let mut writer = Writer::from_path(path, builder)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    for rec in records {
        let r = to_record(&rec.attrs);
        if let Some(z) = &rec.geom_z {
            let shp = ShpPointZ::new(z.x, z.y, z.z, NO_DATA);
            writer
                .write_shape_and_record(&shp, &r)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        } else {
            let shp = ShpPoint { x: rec.geom.x, y: rec.geom.y };
            writer
                .write_shape_and_record(&shp, &r)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        }
    }
    Ok(())
}

/// Reads Point records with attributes from a shapefile.
pub fn read_point_records_shp(path: &str) -> io::Result<Vec<PointRecord>> {
    let mut reader = Reader::from_path(path)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut out = Vec::new();
    for res in reader.iter_shapes_and_records() {
        let (shape, record) = res.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let attrs: BTreeMap<_, _> = record.into_iter().collect();
        match shape {
            Shape::Point(p) => out.push(PointRecord {
                geom: Point::new(p.x, p.y),
                geom_z: None,
                attrs,
            }),
            Shape::PointZ(p) => out.push(PointRecord {
                geom: Point::new(p.x, p.y),
                geom_z: Some(Point3::new(p.x, p.y, p.z)),
                attrs,
            }),
            _ => {}
        }
    }
    Ok(out)
}

/// Writes segment records with attributes as a Polyline shapefile.
pub fn write_line_records_shp(path: &str, records: &[LineRecord]) -> io::Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    let builder = build_table_builder(&records[0].attrs)?;
    let mut writer = Writer::from_path(path, builder)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    for rec in records {
        let shp_pts = vec![
            ShpPoint { x: rec.geom.start.x, y: rec.geom.start.y },
            ShpPoint { x: rec.geom.end.x, y: rec.geom.end.y },
        ];
        let shp_pl = ShpPolyline::new(shp_pts);
        writer
            .write_shape_and_record(&shp_pl, &to_record(&rec.attrs))
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    }
    Ok(())
}
