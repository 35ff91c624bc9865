use std::path::Path;

use serde::Deserialize;

use relief_tasks::{ProximityConfig, RevealShape};

/// Tunables for the mapping core, loaded from a TOML file with sane
/// defaults for every field.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MapConfig {
    /// Chunk radius always covered around the player.
    pub primary_radius: i32,
    /// Outer bound for the stationary catch-up radius.
    pub max_radius: i32,
    pub reveal_shape: RevealShapeCfg,
    /// Priority chunks drained per scheduler poll.
    pub max_priority_per_poll: usize,
    /// Polls an out-of-range snapshot is retained.
    pub grace_polls: u8,
    pub always_map_surface: bool,
    pub map_topography: bool,
    /// Region rasters kept in memory.
    pub region_cache_capacity: usize,
    pub flush_interval_secs: u64,
    /// Idle window before a display tile expires.
    pub tile_idle_secs: u64,
    /// Odd number of tiles per grid axis.
    pub grid_size: i32,
    /// Regions per tile axis at full zoom; power of two.
    pub regions_per_tile: u32,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RevealShapeCfg {
    Square,
    Circle,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            primary_radius: 2,
            max_radius: 5,
            reveal_shape: RevealShapeCfg::Square,
            max_priority_per_poll: 16,
            grace_polls: 3,
            always_map_surface: false,
            map_topography: false,
            region_cache_capacity: 25,
            flush_interval_secs: 30,
            tile_idle_secs: 30,
            grid_size: 3,
            regions_per_tile: 2,
        }
    }
}

impl MapConfig {
    /// Parse from a TOML file; any problem logs a warning and falls back to
    /// defaults so a bad config never blocks mapping.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => match toml::from_str(&text) {
                Ok(cfg) => cfg,
                Err(e) => {
                    log::warn!("bad map config {}: {e}; using defaults", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn proximity(&self) -> ProximityConfig {
        ProximityConfig {
            primary_radius: self.primary_radius,
            max_radius: self.max_radius,
            shape: match self.reveal_shape {
                RevealShapeCfg::Square => RevealShape::Square,
                RevealShapeCfg::Circle => RevealShape::Circle,
            },
            max_priority_per_poll: self.max_priority_per_poll,
            grace_polls: self.grace_polls,
            always_map_surface: self.always_map_surface,
            map_topography: self.map_topography,
        }
    }
}
