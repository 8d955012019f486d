//! Transect polygons and their hydraulic attributes.

use geo_types::MultiPolygon;

use crate::error::{Result, RiverSectionError};
use crate::io::shp::{field_value_as_f64, PolygonRecord};
use crate::params::CrossSectionParams;

/// One cross-sectional slice of the river corridor.
#[derive(Debug, Clone, PartialEq)]
pub struct Transect {
    /// Chainage along the reach.
    pub pk: f64,
    /// Flow rate.
    pub flow: f64,
    /// Channel slope.
    pub slope: f64,
    pub geometry: MultiPolygon<f64>,
}

impl Transect {
    pub fn new(pk: f64, flow: f64, slope: f64, geometry: MultiPolygon<f64>) -> Self {
        Self {
            pk,
            flow,
            slope,
            geometry,
        }
    }

    /// Builds a transect from a shapefile record using the configured field names.
    pub fn from_record(
        index: usize,
        record: &PolygonRecord,
        params: &CrossSectionParams,
    ) -> Result<Self> {
        let field = |name: &str| {
            record
                .attrs
                .get(name)
                .or_else(|| record.attrs.get(dbf_field_name(name)))
                .and_then(field_value_as_f64)
                .ok_or_else(|| RiverSectionError::MissingField {
                    index,
                    field: name.to_string(),
                })
        };
        Ok(Self::new(
            field(&params.pk_field)?,
            field(&params.flow_field)?,
            field(&params.slope_field)?,
            record.geom.clone(),
        ))
    }
}

/// Longest attribute name a dBase table can store.
const DBF_FIELD_NAME_LEN: usize = 10;

/// Name under which a long attribute is stored in a `.dbf` table.
fn dbf_field_name(name: &str) -> &str {
    match name.char_indices().nth(DBF_FIELD_NAME_LEN) {
        Some((end, _)) => &name[..end],
        None => name,
    }
}

/// Converts every polygon record into a transect, keeping record order.
pub fn transects_from_records(
    records: &[PolygonRecord],
    params: &CrossSectionParams,
) -> Result<Vec<Transect>> {
    records
        .iter()
        .enumerate()
        .map(|(i, rec)| Transect::from_record(i, rec, params))
        .collect()
}

/// Keeps only the last item for each chainage, preserving the order of the kept items.
pub fn drop_duplicate_pk<T>(items: Vec<T>, pk: impl Fn(&T) -> f64, tolerance: f64) -> Vec<T> {
    let keys: Vec<f64> = items.iter().map(&pk).collect();
    items
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !keys[i + 1..].iter().any(|k| (k - keys[*i]).abs() <= tolerance))
        .map(|(_, item)| item)
        .collect()
}

/// Orders transects by chainage; equal chainages keep their relative order.
pub fn sort_by_pk(transects: &mut [Transect]) {
    transects.sort_by(|a, b| a.pk.total_cmp(&b.pk));
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapefile::dbase::FieldValue;
    use std::collections::BTreeMap;

    fn record(pk: f64, with_flow: bool) -> PolygonRecord {
        let mut attrs = BTreeMap::new();
        attrs.insert("PK".to_string(), FieldValue::Numeric(Some(pk)));
        attrs.insert("Slope".to_string(), FieldValue::Double(0.01));
        if with_flow {
            attrs.insert("Q_ortho_adjusted".to_string(), FieldValue::Float(Some(5.0)));
        }
        PolygonRecord {
            geom: MultiPolygon::new(vec![]),
            attrs,
        }
    }

    #[test]
    fn reads_configured_fields() {
        let params = CrossSectionParams::default();
        let t = Transect::from_record(0, &record(15.0, true), &params).unwrap();
        assert_eq!(t.pk, 15.0);
        assert_eq!(t.flow, 5.0);
        assert_eq!(t.slope, 0.01);
    }

    #[test]
    fn missing_flow_names_the_field() {
        let params = CrossSectionParams::default();
        let records = [record(0.0, true), record(5.0, false)];
        let err = transects_from_records(&records, &params).unwrap_err();
        match err {
            RiverSectionError::MissingField { index, field } => {
                assert_eq!(index, 1);
                assert_eq!(field, "Q_ortho_adjusted");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn truncated_dbf_name_is_found() {
        let mut rec = record(5.0, false);
        rec.attrs
            .insert("Q_ortho_ad".to_string(), FieldValue::Numeric(Some(2.5)));
        let t = Transect::from_record(0, &rec, &CrossSectionParams::default()).unwrap();
        assert_eq!(t.flow, 2.5);
        assert_eq!(dbf_field_name("PK"), "PK");
    }

    #[test]
    fn duplicates_keep_last() {
        let items = vec![(0.0, 'a'), (5.0, 'b'), (0.0, 'c'), (10.0, 'd')];
        let kept = drop_duplicate_pk(items, |i| i.0, 1e-9);
        assert_eq!(kept, vec![(5.0, 'b'), (0.0, 'c'), (10.0, 'd')]);
    }

    #[test]
    fn sorting_is_stable() {
        let geom = MultiPolygon::new(vec![]);
        let mut ts = vec![
            Transect::new(10.0, 1.0, 0.0, geom.clone()),
            Transect::new(5.0, 2.0, 0.0, geom.clone()),
            Transect::new(5.0, 3.0, 0.0, geom),
        ];
        sort_by_pk(&mut ts);
        let flows: Vec<f64> = ts.iter().map(|t| t.flow).collect();
        assert_eq!(flows, vec![2.0, 3.0, 1.0]);
    }
}
