//! NDVI time series over the source collection's native 16-day cadence.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use drought_map_index_models::{DateWindow, IndexKind, MAX_PIXELS, SeriesPoint};
use drought_map_provider::{EarthDataProvider, Geometry, Reducer};

use crate::{EngineError, pipeline};

/// Reduces every composite in the windowed NDVI collection to its region
/// mean, paired with the composite's nominal date.
///
/// The provider's enumeration order is not chronological; results are
/// sorted ascending by date before returning. Composites without a
/// computable value are dropped, not zero-filled.
pub(crate) async fn series(
    provider: &dyn EarthDataProvider,
    geometry: &Geometry,
    window: &DateWindow,
) -> Result<Vec<SeriesPoint>, EngineError> {
    let kind = IndexKind::Ndvi;
    let collection = pipeline::ndvi_series_collection(geometry, window);
    let reductions = provider
        .reduce_images(&collection, Reducer::Mean, geometry, kind.scale(), MAX_PIXELS)
        .await?;

    let total = reductions.len();
    let ordered: BTreeMap<NaiveDate, f64> = reductions
        .into_iter()
        .filter_map(|reduction| {
            reduction
                .value
                .map(|value| (reduction.date, kind.round(value)))
        })
        .collect();

    if ordered.len() < total {
        log::debug!(
            "Dropped {} of {total} composites without data",
            total - ordered.len()
        );
    }

    Ok(ordered
        .into_iter()
        .map(|(date, value)| SeriesPoint { date, value })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockProvider;
    use drought_map_geography::registry;
    use drought_map_provider::ImageReduction;

    fn window() -> DateWindow {
        DateWindow::parse("2024-01-01", "2024-03-31").unwrap()
    }

    fn geometry() -> Geometry {
        registry::default_area().geometry()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn results_are_sorted_ascending_by_date() {
        let provider = MockProvider {
            image_reductions: vec![
                ImageReduction {
                    date: date(2024, 2, 2),
                    value: Some(0.41),
                },
                ImageReduction {
                    date: date(2024, 1, 1),
                    value: Some(0.39),
                },
                ImageReduction {
                    date: date(2024, 1, 17),
                    value: Some(0.44),
                },
            ],
            ..MockProvider::default()
        };

        let points = series(&provider, &geometry(), &window()).await.unwrap();
        let dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 1, 1), date(2024, 1, 17), date(2024, 2, 2)]
        );
    }

    #[tokio::test]
    async fn composites_without_data_are_dropped() {
        let provider = MockProvider {
            image_reductions: vec![
                ImageReduction {
                    date: date(2024, 1, 1),
                    value: Some(0.39),
                },
                ImageReduction {
                    date: date(2024, 1, 17),
                    value: None,
                },
                ImageReduction {
                    date: date(2024, 2, 2),
                    value: Some(0.41),
                },
            ],
            ..MockProvider::default()
        };

        let points = series(&provider, &geometry(), &window()).await.unwrap();
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.date != date(2024, 1, 17)));
    }

    #[tokio::test]
    async fn full_windows_keep_every_composite() {
        let reductions: Vec<ImageReduction> = (0..6)
            .map(|i| ImageReduction {
                date: date(2024, 1, 1) + chrono::Duration::days(i * 16),
                value: Some(0.4),
            })
            .collect();
        let provider = MockProvider {
            image_reductions: reductions,
            ..MockProvider::default()
        };

        let points = series(&provider, &geometry(), &window()).await.unwrap();
        assert_eq!(points.len(), 6);
    }

    #[tokio::test]
    async fn duplicate_dates_collapse_to_a_single_entry() {
        let provider = MockProvider {
            image_reductions: vec![
                ImageReduction {
                    date: date(2024, 1, 1),
                    value: Some(0.39),
                },
                ImageReduction {
                    date: date(2024, 1, 1),
                    value: Some(0.41),
                },
            ],
            ..MockProvider::default()
        };

        let points = series(&provider, &geometry(), &window()).await.unwrap();
        assert_eq!(points.len(), 1);
    }

    #[tokio::test]
    async fn values_are_rounded_to_ndvi_precision() {
        let provider = MockProvider {
            image_reductions: vec![ImageReduction {
                date: date(2024, 1, 1),
                value: Some(0.391_234_9),
            }],
            ..MockProvider::default()
        };

        let points = series(&provider, &geometry(), &window()).await.unwrap();
        assert_eq!(points[0].value, 0.3912);
    }
}
