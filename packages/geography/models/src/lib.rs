#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Study area definition types.
//!
//! Defines the TOML schema for the registered study areas (Thai provinces
//! with approximate bounding polygons) and conversions into the `GeoJSON`
//! geometry the provider consumes.

use geojson::Geometry;
use serde::{Deserialize, Serialize};

/// A named geographic study area with a registered fallback polygon,
/// deserialized from TOML.
///
/// Areas are immutable: the registry is seeded at compile time and never
/// mutated at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyArea {
    /// Area name as used in requests (e.g. `"Chiang Mai"`).
    pub name: String,
    /// Display center hint (lon, lat).
    pub center: [f64; 2],
    /// Default display zoom.
    pub zoom: u8,
    /// Boundary ring of lon/lat pairs; the first and last entries must be
    /// equal.
    pub bounds: Vec<[f64; 2]>,
}

impl StudyArea {
    /// Converts the registered boundary ring into a `GeoJSON` polygon.
    #[must_use]
    pub fn geometry(&self) -> Geometry {
        let ring: Vec<Vec<f64>> = self.bounds.iter().map(|pair| pair.to_vec()).collect();
        Geometry::new(geojson::Value::Polygon(vec![ring]))
    }

    /// Whether the boundary ring is closed (first point equals last).
    #[must_use]
    pub fn ring_is_closed(&self) -> bool {
        match (self.bounds.first(), self.bounds.last()) {
            (Some(first), Some(last)) => first == last && self.bounds.len() >= 4,
            _ => false,
        }
    }
}
