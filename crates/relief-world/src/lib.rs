//! Coordinate math for chunks, regions, display tiles, and map layers.
#![forbid(unsafe_code)]

mod coords;
mod layer;
mod order;

pub use coords::{ChunkCoord, RegionCoord, TileCoord};
pub use layer::{DimensionId, MapLayer};
pub use order::{sort_chunks_by_distance, sort_regions_by_distance};

/// Blocks per chunk edge.
pub const CHUNK_BLOCKS: i32 = 16;
/// Chunks per region edge.
pub const REGION_CHUNKS: i32 = 32;
/// Pixels per chunk edge in a region raster (one pixel per block column).
pub const CHUNK_PIXELS: u32 = 16;
/// Pixels per region raster edge.
pub const REGION_PIXELS: u32 = (REGION_CHUNKS as u32) * CHUNK_PIXELS;
/// Pixels per display tile edge, independent of zoom.
pub const TILE_PIXELS: u32 = 512;
