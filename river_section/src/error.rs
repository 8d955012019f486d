//! Error types for cross-section and slope processing.

use thiserror::Error;

/// Result type alias for fallible library operations.
pub type Result<T> = std::result::Result<T, RiverSectionError>;

/// Errors that stop a whole run.
#[derive(Debug, Error)]
pub enum RiverSectionError {
    /// Both candidate pairings of the contact points cross each other.
    #[error("transect {index} (PK {pk}): both extremity pairings cross, check topology")]
    InvalidPairing { index: usize, pk: f64 },

    /// No simplified segment contains a profile position.
    #[error("no RDP segment contains PK {pk}; segments: {segments:?}")]
    SegmentLookup { pk: f64, segments: Vec<(f64, f64)> },

    /// Not enough transects to have any interior one.
    #[error("at least {required} transects are required, got {found}")]
    TooFewTransects { required: usize, found: usize },

    /// A record lacks a numeric attribute.
    #[error("record {index}: missing or non-numeric field `{field}`")]
    MissingField { index: usize, field: String },

    /// Run parameters are out of range.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Input arrays are malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("shapefile: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl RiverSectionError {
    /// Create an invalid params error.
    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::InvalidParams(details.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(details: impl Into<String>) -> Self {
        Self::InvalidInput(details.into())
    }
}

/// Which neighbor a contact was searched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Side {
    Upstream,
    Downstream,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Upstream => write!(f, "upstream"),
            Side::Downstream => write!(f, "downstream"),
        }
    }
}

/// Reasons a single transect is left out of the point cloud.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize)]
pub enum SkipReason {
    #[error("no contact with the {side} neighbor")]
    NoContact { side: Side },

    #[error("contact points on the {side} side all coincide")]
    DegenerateContact { side: Side },

    #[error("extremity line never meets the transect boundary")]
    NoBoundaryCrossing,

    #[error("shore line has zero length")]
    DegenerateShoreLine,

    #[error("slope {slope} leaves the bed depth undefined")]
    UndefinedSlope { slope: f64 },

    #[error("flow rate {flow} is not a valid discharge")]
    InvalidFlow { flow: f64 },
}
