//! Study area geometry resolution with authoritative-dataset fallback.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use drought_map_provider::{EarthDataProvider, Filter, Geometry};

use crate::registry;

/// Authoritative first-level administrative boundary dataset.
pub const BOUNDARY_DATASET: &str = "FAO/GAUL/2015/level1";

/// Country whose first-level admin names the study areas match.
pub const BOUNDARY_COUNTRY: &str = "Thailand";

/// How long a successful authoritative lookup is reused before the next
/// provider round trip.
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

struct CachedGeometry {
    geometry: Geometry,
    fetched_at: Instant,
}

/// Maps a study-area name to a region geometry.
///
/// Fallback chain, in strict order: (a) the authoritative administrative
/// boundary from [`BOUNDARY_DATASET`], (b) the registered polygon for the
/// name, (c) the default area's polygon. [`Self::resolve`] never fails,
/// for any input name.
///
/// Successful authoritative lookups are cached per name with a bounded
/// TTL. Fallback geometries are never cached, so a transient provider
/// failure does not pin the registered bounds until the TTL expires.
pub struct StudyAreaResolver {
    provider: Arc<dyn EarthDataProvider>,
    ttl: Duration,
    cache: RwLock<BTreeMap<String, CachedGeometry>>,
}

impl StudyAreaResolver {
    /// Creates a resolver with the default cache TTL.
    #[must_use]
    pub fn new(provider: Arc<dyn EarthDataProvider>) -> Self {
        Self::with_ttl(provider, DEFAULT_CACHE_TTL)
    }

    /// Creates a resolver with an explicit cache TTL.
    #[must_use]
    pub fn with_ttl(provider: Arc<dyn EarthDataProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            cache: RwLock::new(BTreeMap::new()),
        }
    }

    /// Resolves `name` to a geometry, degrading through the fallback
    /// chain instead of failing.
    pub async fn resolve(&self, name: &str) -> Geometry {
        if let Some(geometry) = self.cached(name) {
            return geometry;
        }

        let filters = [
            Filter::eq("ADM0_NAME", BOUNDARY_COUNTRY),
            Filter::eq("ADM1_NAME", name),
        ];
        match self
            .provider
            .feature_geometry(BOUNDARY_DATASET, &filters)
            .await
        {
            Ok(Some(geometry)) => {
                self.store(name, geometry.clone());
                geometry
            }
            Ok(None) => {
                log::warn!(
                    "Study area '{name}' not found in {BOUNDARY_DATASET}; \
                     using registered bounds"
                );
                registered_geometry(name)
            }
            Err(e) => {
                log::warn!("Boundary lookup for '{name}' failed: {e}; using registered bounds");
                registered_geometry(name)
            }
        }
    }

    fn cached(&self, name: &str) -> Option<Geometry> {
        let Ok(cache) = self.cache.read() else {
            return None;
        };
        cache
            .get(name)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.geometry.clone())
    }

    fn store(&self, name: &str, geometry: Geometry) {
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(
                name.to_owned(),
                CachedGeometry {
                    geometry,
                    fetched_at: Instant::now(),
                },
            );
        }
    }
}

fn registered_geometry(name: &str) -> Geometry {
    registry::area_or_default(name).geometry()
}
