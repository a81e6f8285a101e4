//! Tile map publishing: visualization registration and tile fetching.

use drought_map_geography_models::StudyArea;
use drought_map_index_models::{DateWindow, IndexKind, TileDescriptor};
use drought_map_provider::{EarthDataProvider, Geometry, VisParams};

use crate::{EngineError, pipeline};

/// Registers the kind's visualized expression with the provider and
/// assembles the descriptor a map client needs: the tile URL template and
/// opaque map id from the provider, plus the kind's fixed legend and the
/// area's registered bounds/center/zoom.
pub(crate) async fn tile_descriptor(
    provider: &dyn EarthDataProvider,
    kind: IndexKind,
    area: &StudyArea,
    geometry: &Geometry,
    window: &DateWindow,
) -> Result<TileDescriptor, EngineError> {
    let expression = pipeline::expression_for(kind, geometry, window);
    let vis = kind.profile().visualization;
    let palette: Vec<String> = vis.palette.iter().map(|&color| color.to_owned()).collect();

    let handle = provider
        .map_id(
            &expression,
            &VisParams {
                min: vis.min,
                max: vis.max,
                palette: palette.clone(),
            },
        )
        .await?;

    Ok(TileDescriptor {
        tile_url_template: handle.tile_url_template,
        map_id: handle.map_id,
        region: area.name.clone(),
        period: *window,
        min: vis.min,
        max: vis.max,
        palette,
        legend_title: vis.legend_title.to_owned(),
        legend_labels: vis
            .legend_labels
            .iter()
            .map(|&label| label.to_owned())
            .collect(),
        bounds: area.bounds.clone(),
        center: area.center,
        zoom: area.zoom,
    })
}

/// Fetches one rendered tile by substituting the coordinates into the
/// template. Non-success upstream statuses surface as tile-not-found and
/// are never retried here.
pub(crate) async fn fetch_tile(
    provider: &dyn EarthDataProvider,
    template: &str,
    z: u32,
    x: u32,
    y: u32,
) -> Result<Vec<u8>, EngineError> {
    let url = tile_url(template, z, x, y);
    provider.fetch_tile(&url).await.map_err(Into::into)
}

fn tile_url(template: &str, z: u32, x: u32, y: u32) -> String {
    template
        .replace("{z}", &z.to_string())
        .replace("{x}", &x.to_string())
        .replace("{y}", &y.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockProvider;
    use drought_map_geography::registry;
    use drought_map_provider::{MapHandle, ProviderError};

    fn window() -> DateWindow {
        DateWindow::parse("2024-01-01", "2024-01-31").unwrap()
    }

    fn handle() -> MapHandle {
        MapHandle {
            map_id: "map-42".to_owned(),
            tile_url_template: "https://tiles.example/map-42/{z}/{x}/{y}.png".to_owned(),
        }
    }

    #[test]
    fn tile_url_substitutes_all_three_coordinates() {
        let url = tile_url("https://tiles.example/m/{z}/{x}/{y}.png", 8, 201, 113);
        assert_eq!(url, "https://tiles.example/m/8/201/113.png");
    }

    #[tokio::test]
    async fn descriptor_combines_provider_handle_with_area_metadata() {
        let provider = MockProvider {
            map_handle: Some(handle()),
            ..MockProvider::default()
        };
        let area = registry::find("Chiang Rai").unwrap();
        let descriptor = tile_descriptor(
            &provider,
            IndexKind::Spi,
            &area,
            &area.geometry(),
            &window(),
        )
        .await
        .unwrap();

        assert_eq!(descriptor.map_id, "map-42");
        assert_eq!(descriptor.region, "Chiang Rai");
        assert_eq!(descriptor.center, area.center);
        assert_eq!(descriptor.zoom, area.zoom);
        assert_eq!(descriptor.bounds, area.bounds);
        assert_eq!(descriptor.legend_title, "Precipitation Anomaly (%)");
        assert_eq!(descriptor.palette.len(), descriptor.legend_labels.len());
        assert!((descriptor.min + 50.0).abs() < f64::EPSILON);
        assert!((descriptor.max - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn tile_fetch_substitutes_before_the_single_request() {
        let provider = MockProvider {
            tile_bytes: vec![0x89, 0x50, 0x4e, 0x47],
            ..MockProvider::default()
        };
        let bytes = fetch_tile(&provider, "https://tiles.example/m/{z}/{x}/{y}.png", 8, 1, 2)
            .await
            .unwrap();

        assert_eq!(bytes, vec![0x89, 0x50, 0x4e, 0x47]);
        assert_eq!(
            provider.last_tile_url(),
            Some("https://tiles.example/m/8/1/2.png".to_owned())
        );
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn upstream_non_success_surfaces_as_tile_not_found() {
        let provider = MockProvider {
            tile_status: Some(404),
            ..MockProvider::default()
        };
        let err = fetch_tile(&provider, "https://tiles.example/m/{z}/{x}/{y}.png", 8, 1, 2)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Provider(ProviderError::TileNotFound { status: 404 })
        ));
        assert_eq!(provider.call_count(), 1);
    }
}
