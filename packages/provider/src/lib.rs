#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Earth data provider capability.
//!
//! The engine never computes pixel values locally: every reduction,
//! visualization, and tile fetch is a round trip to an external imagery
//! provider. This crate defines the declarative [`Expression`] tree the
//! engine builds, the [`EarthDataProvider`] trait the engine consumes, and
//! the JSON-over-REST implementation ([`HttpEarthDataProvider`]).
//!
//! The provider is an explicit capability object: it is constructed once at
//! startup, reports readiness via [`EarthDataProvider::is_ready`], and when
//! not ready every call fails immediately with
//! [`ProviderError::NotConfigured`] without touching the network.

pub mod expression;
pub mod http;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use expression::Expression;
pub use geojson::Geometry;
pub use http::{HttpEarthDataProvider, ProviderConfig};

/// Errors that can occur talking to the earth data provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider capability was never initialized; no network call was
    /// attempted.
    #[error("Earth data service is not configured")]
    NotConfigured,

    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The provider rejected or failed the computation.
    #[error("Provider error: {message}")]
    Api {
        /// Provider-supplied failure description.
        message: String,
    },

    /// The tile endpoint returned a non-success status.
    #[error("Tile not found: upstream returned status {status}")]
    TileNotFound {
        /// Upstream HTTP status code.
        status: u16,
    },
}

/// An equality filter on a feature-collection property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Property name.
    pub name: String,
    /// Required property value.
    pub value: String,
}

impl Filter {
    /// Creates an equality filter.
    #[must_use]
    pub fn eq(name: &str, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            value: value.to_owned(),
        }
    }
}

/// Region reducers the provider can apply to an evaluated expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Reducer {
    /// Combined mean / min / max / standard-deviation reduction. Result
    /// keys are the band name suffixed with `_mean`, `_min`, `_max`, and
    /// `_stdDev`.
    Stats,
    /// Mean over the region, keyed by the bare band name.
    Mean,
    /// First (top-most) value intersecting the geometry, keyed by the bare
    /// band name. Used for point sampling.
    First,
}

/// Visualization parameters for map registration: values are clamped to
/// `[min, max]` and colored by linear interpolation over `palette`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    /// Lower clamp.
    pub min: f64,
    /// Upper clamp.
    pub max: f64,
    /// Ordered colors mapped linearly between `min` and `max`.
    pub palette: Vec<String>,
}

/// A registered visualized expression, ready for tile serving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapHandle {
    /// Opaque provider map identifier.
    pub map_id: String,
    /// Tile URL template parameterized by `{z}`, `{x}`, and `{y}`.
    pub tile_url_template: String,
}

/// One per-composite reduction result with the composite's nominal date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReduction {
    /// Nominal calendar date of the composite (no time of day).
    pub date: NaiveDate,
    /// Reduced value, absent when the provider had no data for the
    /// composite over the region.
    pub value: Option<f64>,
}

/// The external imagery/statistics provider.
///
/// All operations are a single query/response round trip; nothing is
/// computed locally. Implementations must be safe for concurrent use —
/// the engine shares one provider across requests without locking.
#[async_trait::async_trait]
pub trait EarthDataProvider: Send + Sync {
    /// Whether the provider finished initialization and can serve calls.
    ///
    /// When this returns `false`, every other method fails with
    /// [`ProviderError::NotConfigured`] without attempting a network call.
    fn is_ready(&self) -> bool;

    /// Looks up the merged geometry of the features in `dataset` matching
    /// all `filters`. Returns `Ok(None)` when no feature matches.
    async fn feature_geometry(
        &self,
        dataset: &str,
        filters: &[Filter],
    ) -> Result<Option<Geometry>, ProviderError>;

    /// Evaluates `expression` and reduces it over `geometry` at `scale`,
    /// visiting at most `max_pixels` pixels.
    ///
    /// The result maps reducer output keys to values; keys the provider
    /// could not compute (no data over the region/window) are absent.
    async fn reduce_region(
        &self,
        expression: &Expression,
        reducer: Reducer,
        geometry: &Geometry,
        scale: u32,
        max_pixels: u64,
    ) -> Result<BTreeMap<String, f64>, ProviderError>;

    /// Reduces every composite in `collection` independently over
    /// `geometry`, pairing each result with the composite's nominal date.
    ///
    /// Enumeration order is NOT guaranteed to be chronological.
    async fn reduce_images(
        &self,
        collection: &Expression,
        reducer: Reducer,
        geometry: &Geometry,
        scale: u32,
        max_pixels: u64,
    ) -> Result<Vec<ImageReduction>, ProviderError>;

    /// Registers `expression` for tile serving with the given
    /// visualization and returns the map handle.
    async fn map_id(
        &self,
        expression: &Expression,
        visualization: &VisParams,
    ) -> Result<MapHandle, ProviderError>;

    /// Fetches one rendered tile. Any non-success upstream status is
    /// surfaced as [`ProviderError::TileNotFound`]; fetches are never
    /// retried here.
    async fn fetch_tile(&self, url: &str) -> Result<Vec<u8>, ProviderError>;
}

/// Builds a point geometry in lon/lat order, matching the coordinate
/// convention of study-area polygons.
#[must_use]
pub fn point_geometry(lon: f64, lat: f64) -> Geometry {
    Geometry::new(geojson::Value::Point(vec![lon, lat]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_geometry_is_lon_lat_ordered() {
        let geometry = point_geometry(98.95, 18.8);
        match geometry.value {
            geojson::Value::Point(coords) => assert_eq!(coords, vec![98.95, 18.8]),
            other => panic!("expected point, got {other:?}"),
        }
    }

    #[test]
    fn reducer_serializes_camel_case() {
        assert_eq!(serde_json::to_string(&Reducer::Stats).unwrap(), "\"stats\"");
        assert_eq!(serde_json::to_string(&Reducer::First).unwrap(), "\"first\"");
    }

    #[test]
    fn map_handle_round_trips() {
        let json = r#"{"mapId":"abc123","tileUrlTemplate":"https://tiles.example/abc123/{z}/{x}/{y}.png"}"#;
        let handle: MapHandle = serde_json::from_str(json).unwrap();
        assert_eq!(handle.map_id, "abc123");
        assert_eq!(serde_json::to_string(&handle).unwrap(), json);
    }

    #[test]
    fn not_configured_error_names_the_service() {
        let message = ProviderError::NotConfigured.to_string();
        assert!(message.contains("not configured"), "{message}");
    }
}
