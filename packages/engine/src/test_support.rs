//! Configurable in-memory provider for engine tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use drought_map_provider::{
    EarthDataProvider, Expression, Filter, Geometry, ImageReduction, MapHandle, ProviderError,
    Reducer, VisParams,
};

/// Mock provider with per-call counting.
///
/// For stats reductions it emulates the provider's integer-encoding
/// semantics: configure the uniform native value and the mock applies the
/// rescale factors found in the expression, so tests exercise the real
/// pipeline algebra end to end. When not ready, every call fails without
/// being counted, matching the fail-fast contract.
#[derive(Default)]
pub(crate) struct MockProvider {
    /// When set, the provider reports itself not ready.
    pub not_ready: bool,
    /// Uniform per-pixel native value for stats reductions.
    pub uniform_native_value: Option<f64>,
    /// Raw reduction keys returned for stats when no uniform value is set.
    pub region_values: Vec<(String, f64)>,
    /// First-value result for point sampling; `None` means no coverage.
    pub point_value: Option<f64>,
    /// Canned per-composite reductions, in provider (arbitrary) order.
    pub image_reductions: Vec<ImageReduction>,
    /// Canned map registration result.
    pub map_handle: Option<MapHandle>,
    /// Upstream tile status; `None` means success.
    pub tile_status: Option<u16>,
    /// Tile payload returned on success.
    pub tile_bytes: Vec<u8>,
    /// Authoritative boundary lookup result; `None` exercises the
    /// registry fallback.
    pub admin_geometry: Option<Geometry>,
    pub(crate) calls: AtomicUsize,
    pub(crate) last_tile_url: Mutex<Option<String>>,
}

impl MockProvider {
    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Number of provider operations attempted (readiness checks and
    /// not-ready rejections excluded).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_tile_url(&self) -> Option<String> {
        self.last_tile_url.lock().ok().and_then(|url| url.clone())
    }

    fn record(&self) -> Result<(), ProviderError> {
        if self.not_ready {
            return Err(ProviderError::NotConfigured);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Product of every constant multiplication in the expression tree,
/// following the left branch of binary operations.
fn rescale_product(expression: &Expression) -> f64 {
    match expression {
        Expression::Multiply { input, factor } | Expression::MapMultiply { input, factor } => {
            factor * rescale_product(input)
        }
        Expression::Collection { .. } => 1.0,
        Expression::FilterDate { input, .. }
        | Expression::FilterBounds { input, .. }
        | Expression::Select { input, .. }
        | Expression::MapNormalizedDifference { input, .. }
        | Expression::Mean { input }
        | Expression::Sum { input }
        | Expression::Clip { input, .. }
        | Expression::Rename { input, .. } => rescale_product(input),
        Expression::Subtract { left, .. } | Expression::Divide { left, .. } => {
            rescale_product(left)
        }
    }
}

#[async_trait::async_trait]
impl EarthDataProvider for MockProvider {
    fn is_ready(&self) -> bool {
        !self.not_ready
    }

    async fn feature_geometry(
        &self,
        _dataset: &str,
        _filters: &[Filter],
    ) -> Result<Option<Geometry>, ProviderError> {
        self.record()?;
        Ok(self.admin_geometry.clone())
    }

    async fn reduce_region(
        &self,
        expression: &Expression,
        reducer: Reducer,
        _geometry: &Geometry,
        _scale: u32,
        _max_pixels: u64,
    ) -> Result<BTreeMap<String, f64>, ProviderError> {
        self.record()?;
        let band = expression.output_band().unwrap_or("value").to_owned();
        Ok(match reducer {
            Reducer::Stats => self.uniform_native_value.map_or_else(
                || self.region_values.iter().cloned().collect(),
                |native| {
                    let value = native * rescale_product(expression);
                    BTreeMap::from([
                        (format!("{band}_mean"), value),
                        (format!("{band}_min"), value),
                        (format!("{band}_max"), value),
                        (format!("{band}_stdDev"), 0.0),
                    ])
                },
            ),
            Reducer::First => self
                .point_value
                .map(|value| BTreeMap::from([(band, value)]))
                .unwrap_or_default(),
            Reducer::Mean => BTreeMap::new(),
        })
    }

    async fn reduce_images(
        &self,
        _collection: &Expression,
        _reducer: Reducer,
        _geometry: &Geometry,
        _scale: u32,
        _max_pixels: u64,
    ) -> Result<Vec<ImageReduction>, ProviderError> {
        self.record()?;
        Ok(self.image_reductions.clone())
    }

    async fn map_id(
        &self,
        _expression: &Expression,
        _visualization: &VisParams,
    ) -> Result<MapHandle, ProviderError> {
        self.record()?;
        self.map_handle
            .clone()
            .ok_or_else(|| ProviderError::Api {
                message: "no map configured".to_owned(),
            })
    }

    async fn fetch_tile(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        self.record()?;
        if let Ok(mut last) = self.last_tile_url.lock() {
            *last = Some(url.to_owned());
        }
        match self.tile_status {
            Some(status) if status != 200 => Err(ProviderError::TileNotFound { status }),
            _ => Ok(self.tile_bytes.clone()),
        }
    }
}
