use std::sync::Arc;
use std::time::Instant;

use image::RgbaImage;
use image::imageops::{self, FilterType};
use relief_store::{RegionImageKey, RegionImageStore};
use relief_world::{DimensionId, MapLayer, TILE_PIXELS, TileCoord};

/// Identity of one display tile. Layer is not part of the identity; a layer
/// switch rebuilds the tile in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileId {
    pub tx: i32,
    pub tz: i32,
    pub zoom: u8,
    pub dim: DimensionId,
}

impl TileId {
    pub fn from_block(bx: i32, bz: i32, zoom: u8, dim: DimensionId, regions_per_tile: u32) -> Self {
        let coord = TileCoord::from_block(bx, bz, zoom, regions_per_tile);
        Self {
            tx: coord.tx,
            tz: coord.tz,
            zoom,
            dim,
        }
    }

    #[inline]
    fn coord(self) -> TileCoord {
        TileCoord {
            tx: self.tx,
            tz: self.tz,
            zoom: self.zoom,
        }
    }
}

/// One display tile: a composited raster larger than a region, rebuilt whole
/// whenever the underlying regions changed. The pixel buffer is the "texture
/// handle" the display collaborator consumes; `generation` bumps on every
/// rebuild so uploads can be skipped when nothing changed.
pub struct Tile {
    id: TileId,
    regions_per_tile: u32,
    last_built: Option<Instant>,
    last_layer: Option<MapLayer>,
    pixels: Option<Arc<RgbaImage>>,
    generation: u64,
}

impl Tile {
    pub fn new(id: TileId, regions_per_tile: u32) -> Self {
        Self {
            id,
            regions_per_tile,
            last_built: None,
            last_layer: None,
            pixels: None,
            generation: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> TileId {
        self.id
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current pixel data, if built. Fresh when `generation` advanced since
    /// the caller last uploaded.
    pub fn pixels(&self) -> Option<&Arc<RgbaImage>> {
        self.pixels.as_ref()
    }

    pub fn has_pixels(&self) -> bool {
        self.pixels.is_some()
    }

    /// Staleness is decided from region modification instants and the
    /// requested layer, never by diffing pixels.
    pub fn needs_rebuild(&self, store: &RegionImageStore, layer: MapLayer) -> bool {
        if self.pixels.is_none() || self.last_layer != Some(layer) {
            return true;
        }
        let Some(built) = self.last_built else {
            return true;
        };
        self.id.coord().regions(self.regions_per_tile).iter().any(|&region| {
            store.modified_since(
                RegionImageKey {
                    region,
                    dim: self.id.dim,
                    layer,
                },
                built,
            )
        })
    }

    /// Refresh the tile raster from the region store if stale. Returns
    /// whether a rebuild happened.
    pub fn update(&mut self, store: &RegionImageStore, layer: MapLayer) -> bool {
        if !self.needs_rebuild(store, layer) {
            return false;
        }
        self.rebuild(store, layer);
        true
    }

    fn rebuild(&mut self, store: &RegionImageStore, layer: MapLayer) {
        let coord = self.id.coord();
        let built_at = Instant::now();
        let span = i64::from(coord.block_span(self.regions_per_tile));
        let (min_x, min_z) = coord.min_block(self.regions_per_tile);
        let (min_x, min_z) = (i64::from(min_x), i64::from(min_z));
        let scale = f64::from(TILE_PIXELS) / span as f64;

        let mut canvas = RgbaImage::new(TILE_PIXELS, TILE_PIXELS);
        for region in coord.regions(self.regions_per_tile) {
            let key = RegionImageKey {
                region,
                dim: self.id.dim,
                layer,
            };
            let Some(raster) = store.region_raster(key) else {
                continue;
            };
            let (rbx, rbz) = region.min_chunk().min_block();
            let (rbx, rbz) = (i64::from(rbx), i64::from(rbz));
            let rspan = i64::from(relief_world::REGION_PIXELS);
            let ix0 = rbx.max(min_x);
            let iz0 = rbz.max(min_z);
            let ix1 = (rbx + rspan).min(min_x + span);
            let iz1 = (rbz + rspan).min(min_z + span);
            if ix1 <= ix0 || iz1 <= iz0 {
                continue;
            }
            let src = imageops::crop_imm(
                raster.as_ref(),
                (ix0 - rbx) as u32,
                (iz0 - rbz) as u32,
                (ix1 - ix0) as u32,
                (iz1 - iz0) as u32,
            )
            .to_image();
            let dw = ((ix1 - ix0) as f64 * scale).round() as u32;
            let dh = ((iz1 - iz0) as f64 * scale).round() as u32;
            let dx = ((ix0 - min_x) as f64 * scale).round() as i64;
            let dz = ((iz0 - min_z) as f64 * scale).round() as i64;
            if dw == 0 || dh == 0 {
                continue;
            }
            let scaled = if dw == src.width() && dh == src.height() {
                src
            } else {
                imageops::resize(&src, dw, dh, FilterType::Nearest)
            };
            imageops::replace(&mut canvas, &scaled, dx, dz);
        }

        self.pixels = Some(Arc::new(canvas));
        self.generation += 1;
        self.last_built = Some(built_at);
        self.last_layer = Some(layer);
        log::debug!("rebuilt tile {:?} for {layer}", self.id);
    }

    /// Resource-release hook: drops pixel data (the display side frees any
    /// GPU copy keyed by generation). Invoked on cache eviction and clears.
    pub fn release(&mut self) {
        self.pixels = None;
        self.last_built = None;
        self.last_layer = None;
    }
}
