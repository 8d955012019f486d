//! Coordinate reference carried unchanged from the input layer to the outputs.

use std::io;
use std::path::Path;

/// Representation of a coordinate reference system.
///
/// A CRS is stored as a definition string which is either an EPSG identifier
/// (`"EPSG:2948"`) or a WKT definition read from a `.prj` sidecar. No
/// reprojection is ever performed; the reference only travels with the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crs {
    definition: String,
    epsg: Option<u32>,
}

impl Crs {
    /// Creates a new CRS from the given EPSG code.
    pub fn from_epsg(code: u32) -> Self {
        Self {
            definition: format!("EPSG:{}", code),
            epsg: Some(code),
        }
    }

    /// Creates a CRS from a WKT definition string.
    pub fn from_wkt(definition: &str) -> Self {
        Self {
            definition: definition.trim().to_string(),
            epsg: None,
        }
    }

    /// Returns the EPSG code for this CRS, if available.
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Returns the underlying definition string.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Returns the WKT definition when the CRS was read from one.
    pub fn wkt(&self) -> Option<&str> {
        if self.epsg.is_some() {
            None
        } else {
            Some(&self.definition)
        }
    }

    /// Reads the `.prj` sidecar of a shapefile, if there is one.
    pub fn from_shapefile(shp_path: &Path) -> io::Result<Option<Self>> {
        let prj = shp_path.with_extension("prj");
        if !prj.exists() {
            return Ok(None);
        }
        let wkt = std::fs::read_to_string(&prj)?;
        if wkt.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::from_wkt(&wkt)))
    }

    /// Writes the `.prj` sidecar for a shapefile.
    ///
    /// Only WKT definitions can be written; returns `false` for an EPSG-only CRS.
    pub fn write_prj(&self, shp_path: &Path) -> io::Result<bool> {
        match self.wkt() {
            Some(wkt) => {
                std::fs::write(shp_path.with_extension("prj"), wkt)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsg_has_no_wkt() {
        let crs = Crs::from_epsg(2948);
        assert_eq!(crs.definition(), "EPSG:2948");
        assert_eq!(crs.epsg(), Some(2948));
        assert!(crs.wkt().is_none());
    }

    #[test]
    fn prj_sidecar_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.shp");
        assert!(Crs::from_shapefile(&src).unwrap().is_none());
        std::fs::write(
            src.with_extension("prj"),
            "PROJCS[\"NAD83(CSRS) / MTM zone 7\"]\n",
        )
        .unwrap();
        let crs = Crs::from_shapefile(&src).unwrap().unwrap();
        let dst = dir.path().join("out.shp");
        assert!(crs.write_prj(&dst).unwrap());
        let written = std::fs::read_to_string(dst.with_extension("prj")).unwrap();
        assert_eq!(written, "PROJCS[\"NAD83(CSRS) / MTM zone 7\"]");
        assert!(!Crs::from_epsg(2948).write_prj(&dst).unwrap());
    }
}
