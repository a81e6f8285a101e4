#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Index taxonomy and per-kind configuration for the drought map engine.
//!
//! This crate defines the closed set of derived indices the system serves
//! (NDVI, NDMI, SPI) and, for each kind, a single configuration record
//! describing the source collection, band algebra inputs, reduction scale,
//! rescale factor, rounding precision, visualization ramp, and qualitative
//! classification bands. Everything downstream of the engine dispatches on
//! [`IndexKind`] and reads the rest from its [`IndexProfile`] instead of
//! branching on strings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Pixel-count ceiling for every region reduction, bounding provider cost
/// on large study areas.
pub const MAX_PIXELS: u64 = 1_000_000_000;

/// A derived index kind served by the engine.
///
/// The string forms are case-sensitive (`"NDVI"`, `"NDMI"`, `"SPI"`);
/// anything else fails to parse and must be rejected by the caller as an
/// invalid request.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum IndexKind {
    /// Normalized Difference Vegetation Index from 16-day composites.
    Ndvi,
    /// Normalized Difference Moisture Index from surface reflectance.
    Ndmi,
    /// Precipitation anomaly against a decade-prior baseline (SPI proxy).
    Spi,
}

impl IndexKind {
    /// All index kinds, in display order.
    pub const ALL: [Self; 3] = [Self::Ndvi, Self::Ndmi, Self::Spi];

    /// Returns the configuration record for this kind.
    #[must_use]
    pub const fn profile(self) -> &'static IndexProfile {
        match self {
            Self::Ndvi => &NDVI_PROFILE,
            Self::Ndmi => &NDMI_PROFILE,
            Self::Spi => &SPI_PROFILE,
        }
    }

    /// Output band name carried by this kind's expressions and reduction
    /// result keys.
    #[must_use]
    pub const fn band(self) -> &'static str {
        self.profile().band
    }

    /// Native spatial resolution (in the source collection's pixel-grid
    /// units) used for every reduction of this kind.
    #[must_use]
    pub const fn scale(self) -> u32 {
        self.profile().scale
    }

    /// Maps a scalar index value to its qualitative label.
    ///
    /// Total over finite floats: the bands are ordered, half-open
    /// `[previous upper, upper)` intervals with an unbounded final band, so
    /// every finite value lands in exactly one.
    #[must_use]
    pub fn classify(self, value: f64) -> &'static str {
        self.profile()
            .classification
            .iter()
            .find(|band| band.upper.is_none_or(|upper| value < upper))
            .map_or("", |band| band.label)
    }

    /// Rounds a scalar to this kind's reporting precision (4 decimal places
    /// for NDVI/NDMI, 2 for SPI).
    #[must_use]
    pub fn round(self, value: f64) -> f64 {
        let factor = 10f64.powi(self.profile().decimals);
        (value * factor).round() / factor
    }
}

/// Static configuration for one index kind.
///
/// One record per kind; the engine never hard-codes collection ids, scales,
/// palettes, or thresholds anywhere else.
#[derive(Debug, Clone, Copy)]
pub struct IndexProfile {
    /// Source image collection identifier at the provider.
    pub collection: &'static str,
    /// Bands selected from the collection before any band algebra.
    /// Empty when the collection's single band is used as-is.
    pub input_bands: &'static [&'static str],
    /// Output band name after the index algebra.
    pub band: &'static str,
    /// Reduction scale in the collection's native pixel-grid units.
    pub scale: u32,
    /// Multiplicative rescale from the provider's integer encoding to the
    /// continuous index range, when the collection needs one.
    pub rescale: Option<f64>,
    /// Decimal places for reported scalars.
    pub decimals: i32,
    /// Fixed visualization ramp and legend.
    pub visualization: Visualization,
    /// Ordered, half-open classification bands; the final band is
    /// unbounded.
    pub classification: &'static [ClassBand],
}

/// Hand-tuned visualization parameters for one index kind.
#[derive(Debug, Clone, Copy)]
pub struct Visualization {
    /// Lower clamp of the color ramp.
    pub min: f64,
    /// Upper clamp of the color ramp.
    pub max: f64,
    /// Colors mapped linearly between `min` and `max`.
    pub palette: &'static [&'static str],
    /// One label per palette entry, in ramp order.
    pub legend_labels: &'static [&'static str],
    /// Human-readable legend title.
    pub legend_title: &'static str,
}

/// One qualitative classification band.
#[derive(Debug, Clone, Copy)]
pub struct ClassBand {
    /// Exclusive upper bound, or `None` for the unbounded final band.
    pub upper: Option<f64>,
    /// Label reported for values in this band.
    pub label: &'static str,
}

const NDVI_CLASSIFICATION: &[ClassBand] = &[
    ClassBand {
        upper: Some(0.0),
        label: "Water or bare soil",
    },
    ClassBand {
        upper: Some(0.2),
        label: "Very low vegetation / Drought stress",
    },
    ClassBand {
        upper: Some(0.4),
        label: "Low vegetation density",
    },
    ClassBand {
        upper: Some(0.6),
        label: "Moderate vegetation",
    },
    ClassBand {
        upper: Some(0.8),
        label: "High vegetation density",
    },
    ClassBand {
        upper: None,
        label: "Very dense vegetation",
    },
];

const NDMI_CLASSIFICATION: &[ClassBand] = &[
    ClassBand {
        upper: Some(-0.4),
        label: "Very dry - Severe water stress",
    },
    ClassBand {
        upper: Some(-0.2),
        label: "Dry - Moderate water stress",
    },
    ClassBand {
        upper: Some(0.0),
        label: "Slightly dry - Low water content",
    },
    ClassBand {
        upper: Some(0.2),
        label: "Moderate moisture - Normal water content",
    },
    ClassBand {
        upper: Some(0.4),
        label: "High moisture - Good water content",
    },
    ClassBand {
        upper: None,
        label: "Very high moisture - Saturated vegetation",
    },
];

const SPI_CLASSIFICATION: &[ClassBand] = &[
    ClassBand {
        upper: Some(-30.0),
        label: "Severe drought - Extremely dry conditions",
    },
    ClassBand {
        upper: Some(-20.0),
        label: "Moderate drought - Significantly below normal precipitation",
    },
    ClassBand {
        upper: Some(-10.0),
        label: "Mild drought - Below normal precipitation",
    },
    ClassBand {
        upper: Some(10.0),
        label: "Near normal - Precipitation near historical average",
    },
    ClassBand {
        upper: Some(20.0),
        label: "Slightly wet - Above normal precipitation",
    },
    ClassBand {
        upper: Some(30.0),
        label: "Moderately wet - Significantly above normal precipitation",
    },
    ClassBand {
        upper: None,
        label: "Very wet - Extremely high precipitation",
    },
];

/// MODIS Terra Vegetation Indices 16-day global 250m composites.
const NDVI_PROFILE: IndexProfile = IndexProfile {
    collection: "MODIS/061/MOD13Q1",
    input_bands: &["NDVI"],
    band: "NDVI",
    scale: 250,
    rescale: Some(0.0001),
    decimals: 4,
    visualization: Visualization {
        min: -0.2,
        max: 0.8,
        palette: &[
            "#d73027", "#fc8d59", "#fee08b", "#d9ef8b", "#91cf60", "#1a9850",
        ],
        legend_labels: &[
            "Bare soil / Water",
            "Very low vegetation",
            "Low vegetation",
            "Moderate vegetation",
            "High vegetation",
            "Very high vegetation",
        ],
        legend_title: "NDVI Values",
    },
    classification: NDVI_CLASSIFICATION,
};

/// MODIS Terra Surface Reflectance 8-day global 500m composites; NDMI is
/// the normalized difference of the NIR (band 2) and SWIR (band 6)
/// reflectances.
const NDMI_PROFILE: IndexProfile = IndexProfile {
    collection: "MODIS/061/MOD09A1",
    input_bands: &["sur_refl_b02", "sur_refl_b06"],
    band: "NDMI",
    scale: 500,
    rescale: None,
    decimals: 4,
    visualization: Visualization {
        min: -0.6,
        max: 0.6,
        palette: &[
            "#8B4513", "#D2691E", "#F4A460", "#FFFF00", "#90EE90", "#008000", "#006400",
        ],
        legend_labels: &[
            "Very dry",
            "Dry",
            "Slightly dry",
            "Moderate",
            "High moisture",
            "Very high moisture",
            "Saturated",
        ],
        legend_title: "Moisture Index (NDMI)",
    },
    classification: NDMI_CLASSIFICATION,
};

/// CHIRPS daily precipitation at ~5km; the SPI proxy is the percentage
/// deviation of the windowed precipitation sum from the decade-prior
/// equivalent window.
const SPI_PROFILE: IndexProfile = IndexProfile {
    collection: "UCSB-CHG/CHIRPS/DAILY",
    input_bands: &[],
    band: "SPI",
    scale: 5000,
    rescale: None,
    decimals: 2,
    visualization: Visualization {
        min: -50.0,
        max: 50.0,
        palette: &[
            "#8B0000", "#FF0000", "#FFA500", "#FFFF00", "#90EE90", "#008000", "#0000FF",
        ],
        legend_labels: &[
            "Severe drought",
            "Moderate drought",
            "Mild drought",
            "Near normal",
            "Slightly wet",
            "Moderately wet",
            "Very wet",
        ],
        legend_title: "Precipitation Anomaly (%)",
    },
    classification: SPI_CLASSIFICATION,
};

/// An inclusive calendar-date window with `start <= end` enforced at
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateWindow {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl DateWindow {
    /// Creates a window from two calendar dates.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWindowError::Inverted`] if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidWindowError> {
        if start > end {
            return Err(InvalidWindowError::Inverted { start, end });
        }
        Ok(Self {
            start_date: start,
            end_date: end,
        })
    }

    /// Parses a window from two ISO `YYYY-MM-DD` strings.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWindowError`] if either string is not a calendar
    /// date or the window is inverted.
    pub fn parse(start: &str, end: &str) -> Result<Self, InvalidWindowError> {
        let start = parse_date(start)?;
        let end = parse_date(end)?;
        Self::new(start, end)
    }

    /// Start of the window.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start_date
    }

    /// End of the window.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end_date
    }

    /// Returns the window with both endpoints shifted back by exactly
    /// `days` days, preserving the window length.
    #[must_use]
    pub fn shift_back_days(&self, days: i64) -> Self {
        let delta = chrono::Duration::days(days);
        Self {
            start_date: self.start_date - delta,
            end_date: self.end_date - delta,
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, InvalidWindowError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| InvalidWindowError::UnparsableDate {
        value: value.to_owned(),
    })
}

/// Errors from constructing a [`DateWindow`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidWindowError {
    /// A date string did not parse as ISO `YYYY-MM-DD`.
    #[error("invalid date '{value}': expected YYYY-MM-DD")]
    UnparsableDate {
        /// The rejected input.
        value: String,
    },

    /// The start date was after the end date.
    #[error("start date {start} is after end date {end}")]
    Inverted {
        /// Window start.
        start: NaiveDate,
        /// Window end.
        end: NaiveDate,
    },
}

/// Scalar statistics from a region reduction.
///
/// Each statistic is independently absent when the provider returned no
/// value for it; absence is never coerced to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatResult {
    /// Mean over the region.
    pub mean: Option<f64>,
    /// Minimum over the region.
    pub min: Option<f64>,
    /// Maximum over the region.
    pub max: Option<f64>,
    /// Standard deviation over the region.
    pub std_dev: Option<f64>,
}

impl StatResult {
    /// Whether the reduction produced no values at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.mean.is_none() && self.min.is_none() && self.max.is_none() && self.std_dev.is_none()
    }
}

/// Region statistics for one index over one window, with the qualitative
/// interpretation of the mean when a mean is available.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    /// The computed index kind.
    pub kind: IndexKind,
    /// Study area name the statistics were computed for.
    pub region: String,
    /// The date window.
    pub period: DateWindow,
    /// Reduction results, rounded to the kind's precision.
    pub statistics: StatResult,
    /// Classification label for the mean, absent when the mean is.
    pub interpretation: Option<String>,
}

/// A single-point index sample.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointSample {
    /// The sampled index kind.
    pub kind: IndexKind,
    /// Sample longitude.
    pub lon: f64,
    /// Sample latitude.
    pub lat: f64,
    /// Index value at the point, absent outside provider coverage.
    pub value: Option<f64>,
    /// Classification label for the value, absent when the value is.
    pub interpretation: Option<String>,
}

/// One time-series entry: a composite's nominal date and its region mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    /// Nominal calendar date of the composite.
    pub date: NaiveDate,
    /// Mean index value over the region.
    pub value: f64,
}

/// Everything a map client needs to fetch and label tiles for a visualized
/// index without re-registering it per tile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileDescriptor {
    /// Tile URL template parameterized by `{z}`/`{x}`/`{y}`.
    pub tile_url_template: String,
    /// Opaque provider map identifier.
    pub map_id: String,
    /// Study area name.
    pub region: String,
    /// The visualized date window.
    pub period: DateWindow,
    /// Lower clamp of the color ramp.
    pub min: f64,
    /// Upper clamp of the color ramp.
    pub max: f64,
    /// Color ramp, low to high.
    pub palette: Vec<String>,
    /// Legend title.
    pub legend_title: String,
    /// One legend label per palette entry.
    pub legend_labels: Vec<String>,
    /// Registered study-area boundary ring (lon/lat pairs, closed).
    pub bounds: Vec<[f64; 2]>,
    /// Display center hint (lon, lat).
    pub center: [f64; 2],
    /// Default display zoom.
    pub zoom: u8,
}
