//! Scalar reductions: region statistics and point samples.

use std::collections::BTreeMap;

use drought_map_index_models::{
    DateWindow, IndexKind, IndexStats, MAX_PIXELS, PointSample, StatResult,
};
use drought_map_provider::{EarthDataProvider, Geometry, Reducer, point_geometry};

use crate::{EngineError, pipeline};

/// Requests a combined mean/min/max/std-dev reduction over the region at
/// the kind's native scale.
///
/// The provider's combined-reducer keys (`<band>_mean` etc.) are
/// authoritative; the bare band name is consulted for the mean only when
/// the suffixed key is absent. A statistic missing under both keys is
/// reported absent, never coerced to zero.
pub(crate) async fn stats(
    provider: &dyn EarthDataProvider,
    kind: IndexKind,
    region: &str,
    geometry: &Geometry,
    window: &DateWindow,
) -> Result<IndexStats, EngineError> {
    let expression = pipeline::expression_for(kind, geometry, window);
    let profile = kind.profile();
    let values = provider
        .reduce_region(&expression, Reducer::Stats, geometry, profile.scale, MAX_PIXELS)
        .await?;

    let band = profile.band;
    let mean = suffixed(&values, band, "mean")
        .or_else(|| values.get(band).copied())
        .map(|value| kind.round(value));
    let min = suffixed(&values, band, "min").map(|value| kind.round(value));
    let max = suffixed(&values, band, "max").map(|value| kind.round(value));
    let std_dev = suffixed(&values, band, "stdDev").map(|value| kind.round(value));

    if mean.is_none() {
        log::info!("No {kind} data over {region} for {window:?}");
    }

    let interpretation = mean.map(|value| kind.classify(value).to_owned());
    Ok(IndexStats {
        kind,
        region: region.to_owned(),
        period: *window,
        statistics: StatResult {
            mean,
            min,
            max,
            std_dev,
        },
        interpretation,
    })
}

/// Samples the index expression at a single coordinate with a first-value
/// reducer at the kind's native scale.
///
/// A point outside provider coverage is a valid no-data outcome, reported
/// as an absent value; coordinates outside the valid lon/lat ranges are an
/// invalid request.
pub(crate) async fn point(
    provider: &dyn EarthDataProvider,
    kind: IndexKind,
    geometry: &Geometry,
    window: &DateWindow,
    lon: f64,
    lat: f64,
) -> Result<PointSample, EngineError> {
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(EngineError::InvalidRequest {
            message: format!("coordinates ({lon}, {lat}) are out of range"),
        });
    }

    let expression = pipeline::expression_for(kind, geometry, window);
    let profile = kind.profile();
    let sample = point_geometry(lon, lat);
    let values = provider
        .reduce_region(&expression, Reducer::First, &sample, profile.scale, MAX_PIXELS)
        .await?;

    let band = profile.band;
    let value = values
        .get(band)
        .copied()
        .or_else(|| suffixed(&values, band, "first"))
        .map(|value| kind.round(value));
    let interpretation = value.map(|value| kind.classify(value).to_owned());
    Ok(PointSample {
        kind,
        lon,
        lat,
        value,
        interpretation,
    })
}

fn suffixed(values: &BTreeMap<String, f64>, band: &str, suffix: &str) -> Option<f64> {
    values.get(&format!("{band}_{suffix}")).copied()
}
