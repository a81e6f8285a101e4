//! Declarative image and collection expressions.
//!
//! An [`Expression`] describes "this index, over this geometry, over this
//! date window" without evaluating anything: pixel values are only computed
//! when the provider receives the expression alongside a reduction or
//! visualization request. The tree serializes to tagged JSON, which is the
//! wire format [`crate::HttpEarthDataProvider`] posts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Geometry;

/// A lazily-evaluated provider-side computation.
///
/// Collection operators (`filter_*`, `select`, `map_*`) keep the value a
/// collection of composites; `mean`/`sum` reduce it to a single image;
/// image operators (`clip`, `multiply`, band algebra) transform images.
/// The provider enforces arity — the engine only builds shapes the
/// pipelines define.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Expression {
    /// A named source image collection.
    Collection {
        /// Provider collection identifier.
        dataset: String,
    },
    /// Composites whose nominal date falls within `[start, end]`.
    FilterDate {
        /// Upstream collection.
        input: Box<Expression>,
        /// Window start.
        start: NaiveDate,
        /// Window end.
        end: NaiveDate,
    },
    /// Composites intersecting a geometry.
    FilterBounds {
        /// Upstream collection.
        input: Box<Expression>,
        /// Region of interest.
        geometry: Geometry,
    },
    /// Restriction to the named bands.
    Select {
        /// Upstream collection.
        input: Box<Expression>,
        /// Band names to keep.
        bands: Vec<String>,
    },
    /// Per-composite normalized difference `(a - b) / (a + b)` of two
    /// bands, renamed to a single output band.
    MapNormalizedDifference {
        /// Upstream collection.
        input: Box<Expression>,
        /// The `[a, b]` band pair.
        bands: [String; 2],
        /// Output band name.
        rename: String,
    },
    /// Per-composite multiplication by a constant factor.
    MapMultiply {
        /// Upstream collection.
        input: Box<Expression>,
        /// Multiplicative factor.
        factor: f64,
    },
    /// Collection reduced to its per-pixel mean image.
    Mean {
        /// Upstream collection.
        input: Box<Expression>,
    },
    /// Collection reduced to its per-pixel sum image.
    Sum {
        /// Upstream collection.
        input: Box<Expression>,
    },
    /// Image clipped to a geometry.
    Clip {
        /// Upstream image.
        input: Box<Expression>,
        /// Clip region.
        geometry: Geometry,
    },
    /// Image multiplied by a constant factor. Band names are preserved.
    Multiply {
        /// Upstream image.
        input: Box<Expression>,
        /// Multiplicative factor.
        factor: f64,
    },
    /// Per-pixel difference `left - right`.
    Subtract {
        /// Minuend image.
        left: Box<Expression>,
        /// Subtrahend image.
        right: Box<Expression>,
    },
    /// Per-pixel quotient `left / right`. Pixels where `right` is zero
    /// propagate as no-data, not as an evaluation failure.
    Divide {
        /// Dividend image.
        left: Box<Expression>,
        /// Divisor image.
        right: Box<Expression>,
    },
    /// Image with its single band renamed.
    Rename {
        /// Upstream image.
        input: Box<Expression>,
        /// New band name.
        band: String,
    },
}

impl Expression {
    /// Starts an expression from a named source collection.
    #[must_use]
    pub fn collection(dataset: &str) -> Self {
        Self::Collection {
            dataset: dataset.to_owned(),
        }
    }

    /// Restricts the collection to composites within `[start, end]`.
    #[must_use]
    pub fn filter_date(self, start: NaiveDate, end: NaiveDate) -> Self {
        Self::FilterDate {
            input: Box::new(self),
            start,
            end,
        }
    }

    /// Restricts the collection to composites intersecting `geometry`.
    #[must_use]
    pub fn filter_bounds(self, geometry: Geometry) -> Self {
        Self::FilterBounds {
            input: Box::new(self),
            geometry,
        }
    }

    /// Keeps only the named bands.
    #[must_use]
    pub fn select(self, bands: &[&str]) -> Self {
        Self::Select {
            input: Box::new(self),
            bands: bands.iter().map(|&band| band.to_owned()).collect(),
        }
    }

    /// Maps a normalized difference of two bands over every composite,
    /// renaming the result band.
    #[must_use]
    pub fn map_normalized_difference(self, a: &str, b: &str, rename: &str) -> Self {
        Self::MapNormalizedDifference {
            input: Box::new(self),
            bands: [a.to_owned(), b.to_owned()],
            rename: rename.to_owned(),
        }
    }

    /// Maps a constant multiplication over every composite.
    #[must_use]
    pub fn map_multiply(self, factor: f64) -> Self {
        Self::MapMultiply {
            input: Box::new(self),
            factor,
        }
    }

    /// Reduces the collection to its per-pixel mean image.
    #[must_use]
    pub fn mean(self) -> Self {
        Self::Mean {
            input: Box::new(self),
        }
    }

    /// Reduces the collection to its per-pixel sum image.
    #[must_use]
    pub fn sum(self) -> Self {
        Self::Sum {
            input: Box::new(self),
        }
    }

    /// Clips the image to `geometry`.
    #[must_use]
    pub fn clip(self, geometry: Geometry) -> Self {
        Self::Clip {
            input: Box::new(self),
            geometry,
        }
    }

    /// Multiplies the image by a constant factor.
    #[must_use]
    pub fn multiply(self, factor: f64) -> Self {
        Self::Multiply {
            input: Box::new(self),
            factor,
        }
    }

    /// Subtracts `other` from this image per pixel.
    #[must_use]
    pub fn subtract(self, other: Self) -> Self {
        Self::Subtract {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// Divides this image by `other` per pixel. Zero-divisor pixels
    /// propagate as no-data.
    #[must_use]
    pub fn divide(self, other: Self) -> Self {
        Self::Divide {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// Renames the image's single band.
    #[must_use]
    pub fn rename(self, band: &str) -> Self {
        Self::Rename {
            input: Box::new(self),
            band: band.to_owned(),
        }
    }

    /// Resolves the band name reduction result keys are derived from.
    ///
    /// `None` for bare collections and ambiguous multi-band selections —
    /// the pipelines always produce expressions with a resolvable band.
    #[must_use]
    pub fn output_band(&self) -> Option<&str> {
        match self {
            Self::Collection { .. } => None,
            Self::Rename { band, .. } => Some(band),
            Self::MapNormalizedDifference { rename, .. } => Some(rename),
            Self::Select { input, bands } => match bands.as_slice() {
                [band] => Some(band),
                _ => input.output_band(),
            },
            Self::FilterDate { input, .. }
            | Self::FilterBounds { input, .. }
            | Self::MapMultiply { input, .. }
            | Self::Mean { input }
            | Self::Sum { input }
            | Self::Clip { input, .. }
            | Self::Multiply { input, .. } => input.output_band(),
            Self::Subtract { left, .. } | Self::Divide { left, .. } => left.output_band(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn region() -> Geometry {
        Geometry::new(geojson::Value::Polygon(vec![vec![
            vec![98.3, 18.2],
            vec![99.6, 18.2],
            vec![99.6, 20.0],
            vec![98.3, 20.0],
            vec![98.3, 18.2],
        ]]))
    }

    #[test]
    fn builders_nest_in_application_order() {
        let expr = Expression::collection("MODIS/061/MOD13Q1")
            .filter_bounds(region())
            .filter_date(date(2024, 1, 1), date(2024, 1, 31))
            .select(&["NDVI"])
            .mean()
            .clip(region())
            .multiply(0.0001);

        let Expression::Multiply { input, factor } = &expr else {
            panic!("outermost op must be the rescale");
        };
        assert!((factor - 0.0001).abs() < f64::EPSILON);
        assert!(matches!(**input, Expression::Clip { .. }));
    }

    #[test]
    fn output_band_follows_select_and_rename() {
        let selected = Expression::collection("MODIS/061/MOD13Q1")
            .select(&["NDVI"])
            .mean()
            .multiply(0.0001);
        assert_eq!(selected.output_band(), Some("NDVI"));

        let renamed = Expression::collection("UCSB-CHG/CHIRPS/DAILY")
            .sum()
            .rename("SPI");
        assert_eq!(renamed.output_band(), Some("SPI"));

        let mapped = Expression::collection("MODIS/061/MOD09A1")
            .select(&["sur_refl_b02", "sur_refl_b06"])
            .map_normalized_difference("sur_refl_b02", "sur_refl_b06", "NDMI")
            .mean();
        assert_eq!(mapped.output_band(), Some("NDMI"));

        assert_eq!(Expression::collection("any").output_band(), None);
    }

    #[test]
    fn binary_ops_take_the_left_band() {
        let current = Expression::collection("UCSB-CHG/CHIRPS/DAILY")
            .sum()
            .rename("current");
        let historical = Expression::collection("UCSB-CHG/CHIRPS/DAILY")
            .sum()
            .rename("historical");
        let anomaly = current.subtract(historical.clone()).divide(historical);
        assert_eq!(anomaly.output_band(), Some("current"));
    }

    #[test]
    fn serialization_is_op_tagged() {
        let expr = Expression::collection("MODIS/061/MOD13Q1")
            .filter_date(date(2024, 1, 1), date(2024, 1, 31))
            .mean();
        let json = serde_json::to_value(&expr).unwrap();

        assert_eq!(json["op"], "mean");
        assert_eq!(json["input"]["op"], "filterDate");
        assert_eq!(json["input"]["start"], "2024-01-01");
        assert_eq!(json["input"]["end"], "2024-01-31");
        assert_eq!(json["input"]["input"]["op"], "collection");
        assert_eq!(json["input"]["input"]["dataset"], "MODIS/061/MOD13Q1");
    }

    #[test]
    fn expressions_round_trip_through_json() {
        let expr = Expression::collection("MODIS/061/MOD09A1")
            .filter_bounds(region())
            .select(&["sur_refl_b02", "sur_refl_b06"])
            .map_normalized_difference("sur_refl_b02", "sur_refl_b06", "NDMI")
            .mean()
            .clip(region());
        let json = serde_json::to_string(&expr).unwrap();
        let back: Expression = serde_json::from_str(&json).unwrap();
        assert_eq!(back, expr);
    }
}
