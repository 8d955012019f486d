//! Core library for river cross-section geometry and profile slopes.

pub mod cross_section;
pub mod crs;
pub mod error;
pub mod export;
pub mod geometry;
pub mod intersection;
pub mod io;
pub mod manning;
pub mod params;
pub mod slope;
pub mod transect;

pub use error::{Result, RiverSectionError, SkipReason};
pub use params::CrossSectionParams;
