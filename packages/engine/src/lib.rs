#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Index computation and aggregation engine.
//!
//! A request names an index kind, a date window, a study area, and
//! optionally a sample point. The engine resolves the area to a geometry
//! via the study-area resolver, builds the kind's lazily-evaluated
//! expression ([`pipeline`]), and hands it to the provider for the
//! requested output shape: region statistics, a point sample, an ordered
//! time series, or a tile-serving descriptor. Scalar outputs are annotated
//! with their qualitative classification.
//!
//! Every scalar and series value is produced by a reduction over a
//! resolver-obtained geometry — no raw provider geometry bypasses the
//! resolver, so the registered-bounds fallback is always reachable.

pub mod pipeline;

mod aggregate;
mod series;
mod tiles;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use drought_map_geography::{StudyAreaResolver, registry};
use drought_map_index_models::{
    DateWindow, IndexKind, IndexStats, InvalidWindowError, PointSample, SeriesPoint,
    TileDescriptor,
};
use drought_map_provider::{EarthDataProvider, Geometry, ProviderError};
use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// A provider reduction that finds no data is NOT an error: it is
/// reported as an absent value in the result type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The provider was never initialized; the call failed before any
    /// network activity.
    #[error("Earth data service is not configured")]
    ServiceUnavailable,

    /// The request itself is malformed: inverted date window, unknown
    /// index kind, unsupported series kind, or out-of-range coordinates.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What was wrong with the request.
        message: String,
    },

    /// The provider failed; propagated with its context so the caller can
    /// retry manually. Never retried inside the engine.
    #[error(transparent)]
    Provider(ProviderError),
}

impl From<ProviderError> for EngineError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured => Self::ServiceUnavailable,
            other => Self::Provider(other),
        }
    }
}

impl From<InvalidWindowError> for EngineError {
    fn from(err: InvalidWindowError) -> Self {
        Self::InvalidRequest {
            message: err.to_string(),
        }
    }
}

/// The engine facade: one instance per process, holding the injected
/// provider capability and the study-area resolver built on it.
///
/// Stateless across requests apart from the resolver's geometry cache;
/// safe for concurrent use whenever the provider is.
pub struct IndexEngine {
    provider: Arc<dyn EarthDataProvider>,
    resolver: StudyAreaResolver,
}

impl IndexEngine {
    /// Creates an engine around an injected provider capability.
    #[must_use]
    pub fn new(provider: Arc<dyn EarthDataProvider>) -> Self {
        let resolver = StudyAreaResolver::new(Arc::clone(&provider));
        Self { provider, resolver }
    }

    /// Creates an engine with a custom-configured resolver (e.g. a
    /// different cache TTL).
    #[must_use]
    pub fn with_resolver(
        provider: Arc<dyn EarthDataProvider>,
        resolver: StudyAreaResolver,
    ) -> Self {
        Self { provider, resolver }
    }

    /// Whether the provider capability is ready to serve calls.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.provider.is_ready()
    }

    /// Resolves a study-area name to a geometry. Never fails: unknown
    /// names and provider failures degrade to registered bounds.
    pub async fn resolve_area(&self, name: &str) -> Geometry {
        self.resolver.resolve(name).await
    }

    /// Region statistics for `kind` over the named area and window.
    ///
    /// # Errors
    ///
    /// [`EngineError::ServiceUnavailable`] when the provider is not
    /// configured, [`EngineError::Provider`] on provider failure.
    pub async fn stats(
        &self,
        kind: IndexKind,
        area: &str,
        window: &DateWindow,
    ) -> Result<IndexStats, EngineError> {
        self.ensure_ready()?;
        let geometry = self.resolver.resolve(area).await;
        aggregate::stats(self.provider.as_ref(), kind, area, &geometry, window).await
    }

    /// Samples `kind` at a single coordinate. A point outside provider
    /// coverage yields an absent value, not an error.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidRequest`] for out-of-range coordinates,
    /// [`EngineError::ServiceUnavailable`] / [`EngineError::Provider`] as
    /// for [`Self::stats`].
    pub async fn point(
        &self,
        kind: IndexKind,
        area: &str,
        window: &DateWindow,
        lon: f64,
        lat: f64,
    ) -> Result<PointSample, EngineError> {
        self.ensure_ready()?;
        let geometry = self.resolver.resolve(area).await;
        aggregate::point(self.provider.as_ref(), kind, &geometry, window, lon, lat).await
    }

    /// Ordered NDVI time series over the collection's native 16-day
    /// cadence.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidRequest`] for kinds other than NDVI, plus
    /// the readiness/provider errors of [`Self::stats`].
    pub async fn series(
        &self,
        kind: IndexKind,
        area: &str,
        window: &DateWindow,
    ) -> Result<Vec<SeriesPoint>, EngineError> {
        self.ensure_ready()?;
        if kind != IndexKind::Ndvi {
            return Err(EngineError::InvalidRequest {
                message: format!("time series is only available for NDVI, not {kind}"),
            });
        }
        let geometry = self.resolver.resolve(area).await;
        series::series(self.provider.as_ref(), &geometry, window).await
    }

    /// Registers the visualized index and returns everything a map client
    /// needs to fetch and label tiles.
    ///
    /// # Errors
    ///
    /// As for [`Self::stats`].
    pub async fn tile_descriptor(
        &self,
        kind: IndexKind,
        area: &str,
        window: &DateWindow,
    ) -> Result<TileDescriptor, EngineError> {
        self.ensure_ready()?;
        let geometry = self.resolver.resolve(area).await;
        let metadata = registry::area_or_default(area);
        tiles::tile_descriptor(self.provider.as_ref(), kind, &metadata, &geometry, window).await
    }

    /// Fetches one rendered tile through the provider by substituting
    /// `z`/`x`/`y` into a descriptor's URL template.
    ///
    /// # Errors
    ///
    /// [`EngineError::Provider`] wrapping a tile-not-found for any
    /// non-success upstream status; never retried.
    pub async fn fetch_tile(
        &self,
        template: &str,
        z: u32,
        x: u32,
        y: u32,
    ) -> Result<Vec<u8>, EngineError> {
        self.ensure_ready()?;
        tiles::fetch_tile(self.provider.as_ref(), template, z, x, y).await
    }

    fn ensure_ready(&self) -> Result<(), EngineError> {
        if self.provider.is_ready() {
            Ok(())
        } else {
            Err(EngineError::ServiceUnavailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockProvider;
    use drought_map_provider::MapHandle;

    fn window() -> DateWindow {
        DateWindow::parse("2024-01-01", "2024-01-31").unwrap()
    }

    #[tokio::test]
    async fn every_entry_point_fails_fast_when_not_configured() {
        let provider = MockProvider {
            not_ready: true,
            ..MockProvider::default()
        }
        .arc();
        let engine = IndexEngine::new(provider.clone());
        let window = window();

        assert!(matches!(
            engine.stats(IndexKind::Ndvi, "Chiang Mai", &window).await,
            Err(EngineError::ServiceUnavailable)
        ));
        assert!(matches!(
            engine
                .point(IndexKind::Ndmi, "Chiang Mai", &window, 98.95, 18.8)
                .await,
            Err(EngineError::ServiceUnavailable)
        ));
        assert!(matches!(
            engine.series(IndexKind::Ndvi, "Chiang Mai", &window).await,
            Err(EngineError::ServiceUnavailable)
        ));
        assert!(matches!(
            engine
                .tile_descriptor(IndexKind::Spi, "Chiang Mai", &window)
                .await,
            Err(EngineError::ServiceUnavailable)
        ));
        assert!(matches!(
            engine
                .fetch_tile("https://tiles.example/m/{z}/{x}/{y}.png", 1, 2, 3)
                .await,
            Err(EngineError::ServiceUnavailable)
        ));

        assert_eq!(provider.call_count(), 0, "no network call may be attempted");
    }

    #[tokio::test]
    async fn series_rejects_kinds_other_than_ndvi() {
        let provider = MockProvider::default().arc();
        let engine = IndexEngine::new(provider.clone());

        for kind in [IndexKind::Ndmi, IndexKind::Spi] {
            let err = engine.series(kind, "Chiang Mai", &window()).await.unwrap_err();
            assert!(matches!(err, EngineError::InvalidRequest { .. }), "{kind}");
        }
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn stats_resolves_the_area_then_reduces_once() {
        let provider = MockProvider {
            uniform_native_value: Some(5000.0),
            ..MockProvider::default()
        }
        .arc();
        let engine = IndexEngine::new(provider.clone());

        let stats = engine
            .stats(IndexKind::Ndvi, "Chiang Mai", &window())
            .await
            .unwrap();

        assert_eq!(stats.region, "Chiang Mai");
        assert_eq!(stats.statistics.mean, Some(0.5));
        assert_eq!(stats.statistics.std_dev, Some(0.0));
        assert_eq!(stats.interpretation.as_deref(), Some("Moderate vegetation"));
        // One boundary lookup plus one reduction.
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn resolve_area_degrades_to_registered_bounds_when_offline() {
        let provider = MockProvider {
            not_ready: true,
            ..MockProvider::default()
        }
        .arc();
        let engine = IndexEngine::new(provider);

        let geometry = engine.resolve_area("Atlantis").await;
        assert_eq!(geometry, registry::default_area().geometry());
    }

    #[tokio::test]
    async fn tile_descriptor_flows_through_the_facade() {
        let provider = MockProvider {
            map_handle: Some(MapHandle {
                map_id: "map-7".to_owned(),
                tile_url_template: "https://tiles.example/map-7/{z}/{x}/{y}.png".to_owned(),
            }),
            ..MockProvider::default()
        }
        .arc();
        let engine = IndexEngine::new(provider);

        let descriptor = engine
            .tile_descriptor(IndexKind::Ndvi, "Lampang", &window())
            .await
            .unwrap();
        assert_eq!(descriptor.region, "Lampang");
        assert_eq!(descriptor.legend_title, "NDVI Values");
        assert!(descriptor.tile_url_template.contains("{z}"));
    }
}
