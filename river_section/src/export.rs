//! Joins profile slopes back onto transect attributes for the viewer.

use std::collections::BTreeMap;
use std::io;

use shapefile::dbase::FieldValue;

use crate::error::{Result, RiverSectionError};
use crate::io::csv::{format_value, write_table_csv};
use crate::io::shp::{field_value_as_f64, field_value_to_string, PolygonRecord};

/// Columns appended to every exported row.
pub const JOINED_COLUMNS: [&str; 3] = ["elev_rdp", "base_slope", "rdp_slope"];

/// One transect's attributes with its slope values.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub pk: f64,
    pub attrs: BTreeMap<String, FieldValue>,
    /// Elevation of the retained RDP point at this PK, if it was retained.
    pub elev_rdp: Option<f64>,
    pub base_slope: Option<f64>,
    pub rdp_slope: Option<f64>,
}

fn lookup(series: &[(f64, f64)], pk: f64, tolerance: f64) -> Option<f64> {
    series
        .iter()
        .find(|(p, _)| (p - pk).abs() <= tolerance)
        .map(|(_, v)| *v)
        .filter(|v| !v.is_nan())
}

/// Matches each record to the slope series by its chainage.
pub fn join_slopes(
    records: &[PolygonRecord],
    pk_field: &str,
    simplified: &[(f64, f64)],
    baseline: &[(f64, f64)],
    interpolated: &[(f64, f64)],
    tolerance: f64,
) -> Result<Vec<JoinedRow>> {
    records
        .iter()
        .enumerate()
        .map(|(index, rec)| {
            let pk = rec
                .attrs
                .get(pk_field)
                .and_then(field_value_as_f64)
                .ok_or_else(|| RiverSectionError::MissingField {
                    index,
                    field: pk_field.to_string(),
                })?;
            Ok(JoinedRow {
                pk,
                attrs: rec.attrs.clone(),
                elev_rdp: lookup(simplified, pk, tolerance),
                base_slope: lookup(baseline, pk, tolerance),
                rdp_slope: lookup(interpolated, pk, tolerance),
            })
        })
        .collect()
}

/// Name of the export for a profile stem, e.g. `profile_rdp_0_25.csv`.
pub fn rdp_export_file_name(stem: &str, epsilon: f64) -> String {
    format!("{}_rdp_{}.csv", stem, epsilon.to_string().replace('.', "_"))
}

/// Writes joined rows: the source attributes followed by the slope columns.
///
/// Attributes follow `fields`, normally the `.dbf` column order; attributes
/// missing from `fields` come after them in name order.
pub fn write_joined_csv(path: &str, fields: &[String], rows: &[JoinedRow]) -> io::Result<()> {
    let mut columns: Vec<String> = fields.to_vec();
    if let Some(first) = rows.first() {
        columns.extend(first.attrs.keys().filter(|k| !fields.contains(k)).cloned());
    }
    let mut header = columns.clone();
    header.extend(JOINED_COLUMNS.iter().map(|c| c.to_string()));
    let cell = |v: Option<f64>| v.map(format_value).unwrap_or_default();
    let table: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            let mut cells: Vec<String> = columns
                .iter()
                .map(|c| r.attrs.get(c).map(field_value_to_string).unwrap_or_default())
                .collect();
            cells.push(cell(r.elev_rdp));
            cells.push(cell(r.base_slope));
            cells.push(cell(r.rdp_slope));
            cells
        })
        .collect();
    write_table_csv(path, &header, &table)
}
