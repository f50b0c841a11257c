//! Map themes

use serde::{Deserialize, Serialize};

/// Base map rendering used by the map widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapType {
    Roadmap,
    Satellite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapTheme {
    pub key: &'static str,
    pub name: &'static str,
    pub map_type: MapType,
}

pub const DEFAULT_MAP_THEME: &str = "satellite";

pub const MAP_THEMES: [MapTheme; 4] = [
    MapTheme {
        key: "osm",
        name: "Roadmap",
        map_type: MapType::Roadmap,
    },
    MapTheme {
        key: "light",
        name: "Light",
        map_type: MapType::Roadmap,
    },
    MapTheme {
        key: "dark",
        name: "Dark",
        map_type: MapType::Roadmap,
    },
    MapTheme {
        key: "satellite",
        name: "Satellite",
        map_type: MapType::Satellite,
    },
];

pub fn theme(key: &str) -> Option<&'static MapTheme> {
    MAP_THEMES.iter().find(|t| t.key == key)
}

/// Theme for `key`, falling back to the default for unknown or empty keys
pub fn theme_or_default(key: &str) -> &'static MapTheme {
    theme(key)
        .or_else(|| theme(DEFAULT_MAP_THEME))
        .unwrap_or(&MAP_THEMES[3])
}

pub fn theme_keys() -> impl Iterator<Item = &'static str> {
    MAP_THEMES.iter().map(|t| t.key)
}
