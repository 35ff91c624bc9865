use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::RgbaImage;
use relief_blocks::{BiomeCatalog, BlockRegistry};
use relief_palette::{ColorPalette, ColorSource, PaletteOrigin, PaletteProvenance};
use relief_render::{ChunkRenderer, RenderOptions};
use relief_store::{Announcer, RegionImageStore};
use relief_tasks::{
    AutomapManager, ControlParams, ManagerKind, ProximityManager, TaskScheduler, WorldSource,
};
use relief_tiles::{GridRenderer, TileCache, TileId};
use relief_world::{ChunkCoord, DimensionId, MapLayer};

use crate::config::MapConfig;

/// Long-lived service object wiring the whole mapping core together:
/// palette, region store, tile cache, grid, and the task scheduler.
/// Constructed once when a world loads and shut down explicitly when it
/// unloads; no global state.
pub struct MapService {
    config: MapConfig,
    palette: Arc<ColorPalette>,
    store: Arc<RegionImageStore>,
    renderer: Arc<ChunkRenderer>,
    scheduler: TaskScheduler,
    tiles: TileCache,
    grid: GridRenderer,
    announcer: Arc<dyn Announcer>,
}

impl MapService {
    /// Bring the mapping core up for one world. `world_dir` holds the
    /// per-world palette and region files; `data_dir` holds the shared
    /// standard palette.
    pub fn new(
        config: MapConfig,
        registry: Arc<BlockRegistry>,
        biomes: Arc<BiomeCatalog>,
        source: Arc<dyn ColorSource>,
        provenance: PaletteProvenance,
        world_dir: &Path,
        data_dir: &Path,
        announcer: Arc<dyn Announcer>,
    ) -> Self {
        let (palette, origin) = ColorPalette::load_or_create(
            &world_dir.join("colorpalette.json"),
            &data_dir.join("colorpalette.json"),
            provenance,
            &registry,
        );
        if origin == PaletteOrigin::Fresh {
            announcer.announce("Building a new block color palette");
        }
        let palette = Arc::new(palette);

        let store = RegionImageStore::new(
            world_dir.to_path_buf(),
            config.region_cache_capacity,
            Duration::from_secs(config.flush_interval_secs),
            Arc::clone(&announcer),
        );
        store.spawn_maintenance();

        let renderer = Arc::new(ChunkRenderer::new(
            registry,
            biomes,
            Arc::clone(&palette),
            source,
            RenderOptions::default(),
        ));

        let mut scheduler = TaskScheduler::new(
            Arc::clone(&renderer),
            Arc::clone(&store),
            Arc::clone(&announcer),
        );
        // Registration order is poll order: a running automap takes the
        // single task slot ahead of proximity mapping.
        scheduler.register(Box::new(AutomapManager::new()));
        scheduler.register(Box::new(ProximityManager::new(config.proximity())));

        let tiles = TileCache::new(Duration::from_secs(config.tile_idle_secs));
        let grid = GridRenderer::new(config.grid_size, config.regions_per_tile);

        Self {
            config,
            palette,
            store,
            renderer,
            scheduler,
            tiles,
            grid,
            announcer,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn palette(&self) -> &Arc<ColorPalette> {
        &self.palette
    }

    pub fn store(&self) -> &Arc<RegionImageStore> {
        &self.store
    }

    pub fn renderer(&self) -> &Arc<ChunkRenderer> {
        &self.renderer
    }

    /// Foreground tick: report finished tasks, dispatch new work, expire
    /// idle tiles. Never touches the disk on this thread.
    pub fn tick(&mut self, world: &dyn WorldSource, now: Instant) {
        self.scheduler.poll(world);
        self.tiles.sweep(now);
    }

    // --- display-side surface -------------------------------------------

    /// Move the visible grid focus. Cheap no-op while the focus stays
    /// inside the same center tile.
    pub fn recenter(
        &mut self,
        block_x: i32,
        block_z: i32,
        zoom: u8,
        dim: DimensionId,
        now: Instant,
    ) -> bool {
        self.grid.recenter(&mut self.tiles, block_x, block_z, zoom, dim, now)
    }

    /// Refresh on-screen tiles for a layer; returns whether any rebuilt.
    pub fn refresh_visible(
        &mut self,
        layer: MapLayer,
        viewport_w: u32,
        viewport_h: u32,
        now: Instant,
    ) -> bool {
        self.grid
            .refresh_visible(&mut self.tiles, &self.store, layer, viewport_w, viewport_h, now)
    }

    /// Pixel data + generation for a tile, for the display collaborator to
    /// upload. `None` until the tile has been built.
    pub fn tile_texture(&mut self, id: TileId, now: Instant) -> Option<(u64, Arc<RgbaImage>)> {
        let tile = self.tiles.get(id, now)?;
        let pixels = Arc::clone(tile.pixels()?);
        Some((tile.generation(), pixels))
    }

    pub fn center_tile(&self) -> Option<TileId> {
        self.grid.center()
    }

    // --- operator controls ----------------------------------------------

    pub fn set_proximity_enabled(&mut self, enabled: bool, world: &dyn WorldSource) {
        self.scheduler
            .set_enabled(ManagerKind::Proximity, enabled, ControlParams::None, world);
    }

    pub fn proximity_enabled(&self) -> bool {
        self.scheduler.is_enabled(ManagerKind::Proximity)
    }

    /// Start a bulk automap of one dimension, or all of them.
    pub fn start_automap(&mut self, dim: Option<DimensionId>, world: &dyn WorldSource) {
        self.scheduler.set_enabled(
            ManagerKind::Automap,
            true,
            ControlParams::Automap { dim },
            world,
        );
    }

    pub fn stop_automap(&mut self, world: &dyn WorldSource) {
        self.scheduler
            .set_enabled(ManagerKind::Automap, false, ControlParams::None, world);
    }

    pub fn automap_running(&self) -> bool {
        self.scheduler.is_enabled(ManagerKind::Automap)
    }

    /// A chunk finished loading; map it ahead of the neighborhood sweep.
    pub fn chunk_loaded(&mut self, coord: ChunkCoord) {
        self.scheduler.offer_chunk(coord);
    }

    /// Drop all derived colors; they re-derive lazily and persist from the
    /// background worker.
    pub fn force_palette_rebuild(&self) {
        self.palette.clear_for_rebuild();
        self.announcer.announce("Color palette rebuild started");
    }

    /// Delete persisted map images for one dimension or all of them.
    pub fn delete_map(&mut self, dim: Option<DimensionId>) -> io::Result<()> {
        self.tiles.clear();
        self.store.delete(dim)?;
        self.announcer.announce(match dim {
            Some(_) => "Deleted map images for the dimension",
            None => "Deleted all map images",
        });
        Ok(())
    }

    /// The player moved to another dimension (or world): cancel in-flight
    /// work and drop per-dimension caches after flushing them.
    pub fn world_changed(&mut self, new_dim: DimensionId) {
        self.scheduler.world_changed(new_dim);
        self.tiles.clear();
        self.store.clear();
    }

    /// Tear the core down: stop background work, flush everything, persist
    /// the palette. The process-exit path.
    pub fn shutdown(&mut self) {
        self.scheduler.shutdown();
        self.store.close();
        if self.palette.is_dirty() {
            if let Err(e) = self.palette.persist() {
                log::error!("couldn't persist color palette on shutdown: {e}");
            }
        }
    }
}
