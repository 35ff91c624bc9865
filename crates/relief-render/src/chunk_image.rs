use image::RgbaImage;
use relief_world::{CHUNK_PIXELS, ChunkCoord, DimensionId, MapLayer};

/// Raster output of one chunk render pass. Surface passes carry day and
/// night stacked in a single 16x32 image (day rows 0..16, night rows
/// 16..32); the region store crops the halves apart.
#[derive(Clone, Debug)]
pub struct ChunkImage {
    pub coord: ChunkCoord,
    pub dim: DimensionId,
    pub pixels: ChunkPixels,
}

#[derive(Clone, Debug)]
pub enum ChunkPixels {
    Surface(RgbaImage),
    Flat { layer: MapLayer, image: RgbaImage },
}

impl ChunkImage {
    pub fn surface(coord: ChunkCoord, dim: DimensionId, image: RgbaImage) -> Self {
        debug_assert_eq!(image.width(), CHUNK_PIXELS);
        debug_assert_eq!(image.height(), CHUNK_PIXELS * 2);
        Self {
            coord,
            dim,
            pixels: ChunkPixels::Surface(image),
        }
    }

    pub fn flat(coord: ChunkCoord, dim: DimensionId, layer: MapLayer, image: RgbaImage) -> Self {
        debug_assert_eq!(image.width(), CHUNK_PIXELS);
        debug_assert_eq!(image.height(), CHUNK_PIXELS);
        Self {
            coord,
            dim,
            pixels: ChunkPixels::Flat { layer, image },
        }
    }

    /// Map layers this image contributes to.
    pub fn layers(&self) -> Vec<MapLayer> {
        match &self.pixels {
            ChunkPixels::Surface(_) => vec![MapLayer::Day, MapLayer::Night],
            ChunkPixels::Flat { layer, .. } => vec![*layer],
        }
    }
}
