#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Study area registry and geometry resolution.
//!
//! Study areas are defined as TOML files embedded at compile time,
//! following the same registry pattern as the index configuration tables.
//! [`resolver::StudyAreaResolver`] maps an area name to a geometry with a
//! deterministic fallback chain: authoritative administrative boundaries
//! from the provider first, then the registered polygon, then the default
//! area. Resolution never fails for any input name.

pub mod registry;
pub mod resolver;

pub use drought_map_geography_models::StudyArea;
pub use resolver::StudyAreaResolver;
