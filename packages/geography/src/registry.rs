//! Compile-time registry of study areas.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Adding a province requires creating a TOML file in `areas/` and adding
//! a corresponding entry here.

use drought_map_geography_models::StudyArea;

/// Name of the area used when a requested name is not registered.
pub const DEFAULT_AREA_NAME: &str = "Chiang Mai";

/// Number of registered study areas. Updated when new areas are added.
/// Enforced by a test.
#[cfg(test)]
const EXPECTED_AREA_COUNT: usize = 16;

/// Embedded TOML area definitions.
const AREA_TOMLS: &[(&str, &str)] = &[
    ("chiang_mai", include_str!("../areas/chiang_mai.toml")),
    ("chiang_rai", include_str!("../areas/chiang_rai.toml")),
    ("lamphun", include_str!("../areas/lamphun.toml")),
    ("lampang", include_str!("../areas/lampang.toml")),
    ("mae_hong_son", include_str!("../areas/mae_hong_son.toml")),
    ("nan", include_str!("../areas/nan.toml")),
    ("phayao", include_str!("../areas/phayao.toml")),
    ("phrae", include_str!("../areas/phrae.toml")),
    ("phitsanulok", include_str!("../areas/phitsanulok.toml")),
    ("sukhothai", include_str!("../areas/sukhothai.toml")),
    ("uttaradit", include_str!("../areas/uttaradit.toml")),
    ("tak", include_str!("../areas/tak.toml")),
    (
        "kamphaeng_phet",
        include_str!("../areas/kamphaeng_phet.toml"),
    ),
    ("phichit", include_str!("../areas/phichit.toml")),
    ("phetchabun", include_str!("../areas/phetchabun.toml")),
    ("khon_kaen", include_str!("../areas/khon_kaen.toml")),
];

/// Returns all registered study areas.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught during CI.
#[must_use]
pub fn all_areas() -> Vec<StudyArea> {
    AREA_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse study area '{name}': {e}"))
        })
        .collect()
}

/// Looks up a registered area by its request name (exact match).
#[must_use]
pub fn find(name: &str) -> Option<StudyArea> {
    all_areas().into_iter().find(|area| area.name == name)
}

/// Returns the default study area.
///
/// # Panics
///
/// Panics if the default area is missing from the registry, which is a
/// development error caught by the registry tests.
#[must_use]
pub fn default_area() -> StudyArea {
    find(DEFAULT_AREA_NAME)
        .unwrap_or_else(|| panic!("default study area '{DEFAULT_AREA_NAME}' is not registered"))
}

/// Returns the registered area for `name`, or the default area when the
/// name is unknown.
#[must_use]
pub fn area_or_default(name: &str) -> StudyArea {
    find(name).unwrap_or_else(default_area)
}
