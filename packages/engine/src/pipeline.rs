//! Index expression pipelines.
//!
//! One pure function per index kind. Each builds the lazily-evaluated
//! expression for that index over a geometry and date window; nothing here
//! triggers the provider to compute pixel values — that happens only when
//! a reduction or visualization consumes the expression.

use drought_map_index_models::{DateWindow, IndexKind};
use drought_map_provider::{Expression, Geometry};

/// Days the SPI reference window is shifted back: ten 365-day years,
/// exactly 3650 days regardless of leap years.
pub const SPI_BASELINE_SHIFT_DAYS: i64 = 3650;

/// Builds the index expression for `kind` over `geometry` and `window`.
///
/// Every reduction and visualization in this crate consumes the output of
/// this function, so all index algebra lives in one place.
#[must_use]
pub fn expression_for(kind: IndexKind, geometry: &Geometry, window: &DateWindow) -> Expression {
    match kind {
        IndexKind::Ndvi => ndvi(geometry, window),
        IndexKind::Ndmi => ndmi(geometry, window),
        IndexKind::Spi => spi(geometry, window),
    }
}

/// NDVI: mean of the windowed 16-day vegetation composites, clipped to the
/// region and rescaled from the provider's integer encoding.
#[must_use]
pub fn ndvi(geometry: &Geometry, window: &DateWindow) -> Expression {
    let profile = IndexKind::Ndvi.profile();
    let expression = Expression::collection(profile.collection)
        .filter_bounds(geometry.clone())
        .filter_date(window.start(), window.end())
        .select(profile.input_bands)
        .mean()
        .clip(geometry.clone());
    match profile.rescale {
        Some(factor) => expression.multiply(factor),
        None => expression,
    }
}

/// NDMI: per-composite normalized difference of the NIR and SWIR
/// reflectance bands, averaged over the window and clipped to the region.
#[must_use]
pub fn ndmi(geometry: &Geometry, window: &DateWindow) -> Expression {
    let profile = IndexKind::Ndmi.profile();
    let (nir, swir) = (profile.input_bands[0], profile.input_bands[1]);
    Expression::collection(profile.collection)
        .filter_bounds(geometry.clone())
        .filter_date(window.start(), window.end())
        .select(profile.input_bands)
        .map_normalized_difference(nir, swir, profile.band)
        .mean()
        .clip(geometry.clone())
}

/// SPI proxy: percentage deviation of the windowed precipitation sum from
/// the sum over the same window shifted back [`SPI_BASELINE_SHIFT_DAYS`]
/// days. Pixels with a zero historical sum propagate as no-data through
/// the division.
#[must_use]
pub fn spi(geometry: &Geometry, window: &DateWindow) -> Expression {
    let profile = IndexKind::Spi.profile();
    let current = windowed_sum(profile.collection, geometry, window);
    let baseline = window.shift_back_days(SPI_BASELINE_SHIFT_DAYS);
    let historical = windowed_sum(profile.collection, geometry, &baseline);
    current
        .subtract(historical.clone())
        .divide(historical)
        .multiply(100.0)
        .rename(profile.band)
}

/// The NDVI collection prepared for per-composite reduction: filtered to
/// the region and window with the rescale mapped over every composite.
#[must_use]
pub fn ndvi_series_collection(geometry: &Geometry, window: &DateWindow) -> Expression {
    let profile = IndexKind::Ndvi.profile();
    let collection = Expression::collection(profile.collection)
        .filter_bounds(geometry.clone())
        .filter_date(window.start(), window.end())
        .select(profile.input_bands);
    match profile.rescale {
        Some(factor) => collection.map_multiply(factor),
        None => collection,
    }
}

fn windowed_sum(collection: &str, geometry: &Geometry, window: &DateWindow) -> Expression {
    Expression::collection(collection)
        .filter_date(window.start(), window.end())
        .filter_bounds(geometry.clone())
        .sum()
        .clip(geometry.clone())
}
