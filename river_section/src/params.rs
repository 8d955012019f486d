//! Run parameters for cross-section generation.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RiverSectionError};

/// Manning roughness used for the reference datasets.
pub const DEFAULT_MANNING: f64 = 0.037;

/// Parameters controlling cross-section point generation.
///
/// Every field has a default, so a JSON parameter file only needs the
/// values that differ for a given dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossSectionParams {
    /// Manning roughness coefficient.
    pub manning: f64,
    /// Target distance between interpolated points, in map units.
    pub spacing: f64,
    /// PK distance to the upstream and downstream neighbors.
    pub neighbor_offset: f64,
    /// Tolerance when matching neighbor PK values.
    pub pk_tolerance: f64,
    /// Fractions along the shore line where the two bed points sit.
    pub bed_fractions: (f64, f64),
    /// Attribute holding the chainage.
    pub pk_field: String,
    /// Attribute holding the channel slope.
    pub slope_field: String,
    /// Attribute holding the flow rate.
    pub flow_field: String,
}

impl Default for CrossSectionParams {
    fn default() -> Self {
        Self {
            manning: DEFAULT_MANNING,
            spacing: 0.3,
            neighbor_offset: 5.0,
            pk_tolerance: 1e-6,
            bed_fractions: (0.1, 0.9),
            pk_field: "PK".to_string(),
            slope_field: "Slope".to_string(),
            flow_field: "Q_ortho_adjusted".to_string(),
        }
    }
}

impl CrossSectionParams {
    /// Loads parameters from a JSON file; missing keys keep their defaults.
    pub fn from_json_file(path: &str) -> Result<Self> {
        let contents = crate::io::read_to_string(path)?;
        let params: Self = serde_json::from_str(&contents)?;
        Ok(params)
    }

    /// Checks that every numeric parameter is usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.manning.is_finite() && self.manning > 0.0) {
            return Err(RiverSectionError::invalid_params(format!(
                "manning must be positive, got {}",
                self.manning
            )));
        }
        if !(self.spacing.is_finite() && self.spacing > 0.0) {
            return Err(RiverSectionError::invalid_params(format!(
                "spacing must be positive, got {}",
                self.spacing
            )));
        }
        if !(self.neighbor_offset.is_finite() && self.neighbor_offset > 0.0) {
            return Err(RiverSectionError::invalid_params(format!(
                "neighbor offset must be positive, got {}",
                self.neighbor_offset
            )));
        }
        if !(self.pk_tolerance >= 0.0) {
            return Err(RiverSectionError::invalid_params("pk tolerance must not be negative"));
        }
        let (near, far) = self.bed_fractions;
        if !(0.0 < near && near < far && far < 1.0) {
            return Err(RiverSectionError::invalid_params(format!(
                "bed fractions must satisfy 0 < a < b < 1, got ({near}, {far})"
            )));
        }
        Ok(())
    }

    /// Spacing formatted for file names, e.g. `0.3` becomes `0_3`.
    pub fn spacing_tag(&self) -> String {
        self.spacing.to_string().replace('.', "_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let p = CrossSectionParams::default();
        assert!(p.validate().is_ok());
        assert_eq!(p.spacing_tag(), "0_3");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let p: CrossSectionParams =
            serde_json::from_str(r#"{ "spacing": 1.0, "flow_field": "Q_IMG_spli" }"#).unwrap();
        assert_eq!(p.spacing, 1.0);
        assert_eq!(p.flow_field, "Q_IMG_spli");
        assert_eq!(p.manning, DEFAULT_MANNING);
        assert_eq!(p.spacing_tag(), "1");
    }

    #[test]
    fn rejects_bad_values() {
        let mut p = CrossSectionParams::default();
        p.spacing = 0.0;
        assert!(p.validate().is_err());
        let mut p = CrossSectionParams::default();
        p.bed_fractions = (0.9, 0.1);
        assert!(p.validate().is_err());
    }
}
