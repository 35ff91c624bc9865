use std::time::Instant;

use relief_store::RegionImageStore;
use relief_world::{DimensionId, MapLayer, TILE_PIXELS, TileCoord};

use crate::cache::TileCache;
use crate::tile::TileId;

/// Arranges a fixed odd-by-odd grid of tiles around a focus point and
/// refreshes only the grid members currently on screen.
pub struct GridRenderer {
    grid_size: i32,
    regions_per_tile: u32,
    zoom: u8,
    dim: DimensionId,
    center: Option<TileId>,
    center_block: (i32, i32),
}

impl GridRenderer {
    pub fn new(grid_size: i32, regions_per_tile: u32) -> Self {
        // Must be odd so there is a center tile.
        let grid_size = if grid_size % 2 == 0 { grid_size + 1 } else { grid_size };
        Self {
            grid_size: grid_size.max(3),
            regions_per_tile,
            zoom: 0,
            dim: DimensionId::OVERWORLD,
            center: None,
            center_block: (0, 0),
        }
    }

    pub fn grid_size(&self) -> i32 {
        self.grid_size
    }

    pub fn center(&self) -> Option<TileId> {
        self.center
    }

    /// Re-center the grid on a world block position. A no-op returning
    /// `false` when the computed center tile identity is unchanged, which is
    /// what makes pixel-level panning cheap. Zoom or dimension changes clear
    /// the tile cache outright.
    pub fn recenter(
        &mut self,
        cache: &mut TileCache,
        block_x: i32,
        block_z: i32,
        zoom: u8,
        dim: DimensionId,
        now: Instant,
    ) -> bool {
        let new_center = TileId::from_block(block_x, block_z, zoom, dim, self.regions_per_tile);
        self.center_block = (block_x, block_z);
        if self.center == Some(new_center) {
            return false;
        }
        if self.center.is_some() && (zoom != self.zoom || dim != self.dim) {
            cache.clear();
        }
        self.zoom = zoom;
        self.dim = dim;
        self.center = Some(new_center);

        // Populate every grid slot so neighbors are ready before they scroll
        // on screen.
        let half = (self.grid_size - 1) / 2;
        for dz in -half..=half {
            for dx in -half..=half {
                let id = TileId {
                    tx: new_center.tx + dx,
                    tz: new_center.tz + dz,
                    zoom,
                    dim,
                };
                cache.get_or_create(id, self.regions_per_tile, now);
            }
        }
        true
    }

    /// Refresh textures for grid members intersecting the viewport;
    /// off-screen members are deliberately skipped. Returns whether any tile
    /// was rebuilt.
    pub fn refresh_visible(
        &mut self,
        cache: &mut TileCache,
        store: &RegionImageStore,
        layer: MapLayer,
        viewport_w: u32,
        viewport_h: u32,
        now: Instant,
    ) -> bool {
        let Some(center) = self.center else {
            return false;
        };
        let coord = TileCoord {
            tx: center.tx,
            tz: center.tz,
            zoom: center.zoom,
        };
        let span = coord.block_span(self.regions_per_tile);
        let scale = f64::from(TILE_PIXELS) / f64::from(span);
        let (min_x, min_z) = coord.min_block(self.regions_per_tile);
        // Screen position of the center tile's NW corner, with the focus
        // block pinned to the viewport center.
        let focus_px = f64::from(self.center_block.0 - min_x) * scale;
        let focus_pz = f64::from(self.center_block.1 - min_z) * scale;
        let origin_x = f64::from(viewport_w) / 2.0 - focus_px;
        let origin_z = f64::from(viewport_h) / 2.0 - focus_pz;

        let half = (self.grid_size - 1) / 2;
        let tile_px = f64::from(TILE_PIXELS);
        let mut rebuilt = false;
        for dz in -half..=half {
            for dx in -half..=half {
                let x0 = origin_x + f64::from(dx) * tile_px;
                let z0 = origin_z + f64::from(dz) * tile_px;
                let on_screen = x0 < f64::from(viewport_w)
                    && z0 < f64::from(viewport_h)
                    && x0 + tile_px > 0.0
                    && z0 + tile_px > 0.0;
                if !on_screen {
                    continue;
                }
                let id = TileId {
                    tx: center.tx + dx,
                    tz: center.tz + dz,
                    zoom: center.zoom,
                    dim: center.dim,
                };
                let tile = cache.get_or_create(id, self.regions_per_tile, now);
                if tile.update(store, layer) {
                    rebuilt = true;
                }
            }
        }
        rebuilt
    }
}
