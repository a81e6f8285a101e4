#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the drought map index engine.
//!
//! One subcommand per engine operation: list study areas, check provider
//! readiness, and compute statistics, point samples, time series, and tile
//! descriptors for any study area and date window. Results are printed as
//! JSON on stdout; logs go to stderr.
//!
//! The earth data provider is configured from the environment (see
//! `EARTH_DATA_API_URL`); without it, every compute subcommand reports the
//! service as unavailable.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use drought_map_engine::IndexEngine;
use drought_map_geography::registry;
use drought_map_index_models::{DateWindow, IndexKind};
use drought_map_provider::HttpEarthDataProvider;

/// Days of history when no start date is given, matching the upstream
/// collections' useful recency for a dashboard view.
const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Longer default for time series, covering a full seasonal cycle.
const DEFAULT_SERIES_DAYS: i64 = 365;

#[derive(Parser)]
#[command(
    name = "drought_map_cli",
    about = "Vegetation, moisture, and precipitation indices over Thai study areas"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the registered study areas.
    Areas,
    /// Check whether the earth data provider is configured and reachable.
    Health,
    /// Region statistics (mean/min/max/std-dev) with interpretation.
    Stats {
        /// Index kind: NDVI, NDMI, or SPI (case-sensitive).
        #[arg(long)]
        kind: IndexKind,
        /// Study area name.
        #[arg(long, default_value = registry::DEFAULT_AREA_NAME)]
        area: String,
        /// Window start, YYYY-MM-DD. Defaults to 30 days before the end.
        #[arg(long)]
        start: Option<String>,
        /// Window end, YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        end: Option<String>,
    },
    /// Index value at a single coordinate.
    Point {
        /// Index kind: NDVI, NDMI, or SPI (case-sensitive).
        #[arg(long)]
        kind: IndexKind,
        /// Study area name.
        #[arg(long, default_value = registry::DEFAULT_AREA_NAME)]
        area: String,
        /// Window start, YYYY-MM-DD. Defaults to 30 days before the end.
        #[arg(long)]
        start: Option<String>,
        /// Window end, YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        end: Option<String>,
        /// Sample longitude.
        #[arg(long)]
        lon: f64,
        /// Sample latitude.
        #[arg(long)]
        lat: f64,
    },
    /// NDVI time series at the collection's native 16-day cadence.
    Series {
        /// Study area name.
        #[arg(long, default_value = registry::DEFAULT_AREA_NAME)]
        area: String,
        /// Window start, YYYY-MM-DD. Defaults to a year before the end.
        #[arg(long)]
        start: Option<String>,
        /// Window end, YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        end: Option<String>,
    },
    /// Tile URL template, map id, and legend for a visualized index.
    TileUrl {
        /// Index kind: NDVI, NDMI, or SPI (case-sensitive).
        #[arg(long)]
        kind: IndexKind,
        /// Study area name.
        #[arg(long, default_value = registry::DEFAULT_AREA_NAME)]
        area: String,
        /// Window start, YYYY-MM-DD. Defaults to 30 days before the end.
        #[arg(long)]
        start: Option<String>,
        /// Window end, YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        end: Option<String>,
    },
    /// Fetch a single rendered tile to a file.
    Tile {
        /// Index kind: NDVI, NDMI, or SPI (case-sensitive).
        #[arg(long)]
        kind: IndexKind,
        /// Study area name.
        #[arg(long, default_value = registry::DEFAULT_AREA_NAME)]
        area: String,
        /// Window start, YYYY-MM-DD. Defaults to 30 days before the end.
        #[arg(long)]
        start: Option<String>,
        /// Window end, YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        end: Option<String>,
        /// Tile zoom level.
        #[arg(long)]
        z: u32,
        /// Tile x coordinate.
        #[arg(long)]
        x: u32,
        /// Tile y coordinate.
        #[arg(long)]
        y: u32,
        /// Output file for the tile bytes.
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    // The area registry is compile-time data; listing it must work even
    // on a host with no provider configured.
    if matches!(cli.command, Command::Areas) {
        println!("{}", serde_json::to_string_pretty(&registry::all_areas())?);
        return Ok(());
    }

    let provider = Arc::new(HttpEarthDataProvider::from_env().await);
    let engine = IndexEngine::new(provider);

    match cli.command {
        Command::Areas => unreachable!("handled before provider construction"),
        Command::Health => {
            let ready = engine.is_ready();
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "ready": ready,
                    "status": if ready { "operational" } else { "not configured" },
                }))?
            );
        }
        Command::Stats {
            kind,
            area,
            start,
            end,
        } => {
            let window = resolve_window(start, end, DEFAULT_WINDOW_DAYS)?;
            let stats = engine.stats(kind, &area, &window).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Point {
            kind,
            area,
            start,
            end,
            lon,
            lat,
        } => {
            let window = resolve_window(start, end, DEFAULT_WINDOW_DAYS)?;
            let sample = engine.point(kind, &area, &window, lon, lat).await?;
            println!("{}", serde_json::to_string_pretty(&sample)?);
        }
        Command::Series { area, start, end } => {
            let window = resolve_window(start, end, DEFAULT_SERIES_DAYS)?;
            let series = engine.series(IndexKind::Ndvi, &area, &window).await?;
            println!("{}", serde_json::to_string_pretty(&series)?);
        }
        Command::TileUrl {
            kind,
            area,
            start,
            end,
        } => {
            let window = resolve_window(start, end, DEFAULT_WINDOW_DAYS)?;
            let descriptor = engine.tile_descriptor(kind, &area, &window).await?;
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
        }
        Command::Tile {
            kind,
            area,
            start,
            end,
            z,
            x,
            y,
            out,
        } => {
            let window = resolve_window(start, end, DEFAULT_WINDOW_DAYS)?;
            let descriptor = engine.tile_descriptor(kind, &area, &window).await?;
            let bytes = engine
                .fetch_tile(&descriptor.tile_url_template, z, x, y)
                .await?;
            std::fs::write(&out, &bytes)?;
            log::info!("Wrote {} tile bytes to {}", bytes.len(), out.display());
        }
    }

    Ok(())
}

/// Builds the date window from optional CLI arguments: the end defaults to
/// today, the start to `default_days` before the end.
fn resolve_window(
    start: Option<String>,
    end: Option<String>,
    default_days: i64,
) -> Result<DateWindow, Box<dyn std::error::Error>> {
    let end_date = match end {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")?,
        None => chrono::Local::now().date_naive(),
    };
    let start_date = match start {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")?,
        None => end_date - chrono::Duration::days(default_days),
    };
    Ok(DateWindow::new(start_date, end_date)?)
}
