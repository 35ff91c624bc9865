use serde::{Deserialize, Serialize};

use crate::{CHUNK_BLOCKS, REGION_CHUNKS};

/// Coordinate of one 16x16-column chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cz: self.cz + dz,
        }
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.cx - other.cx);
        let dz = i64::from(self.cz - other.cz);
        dx * dx + dz * dz
    }

    #[inline]
    pub fn region(self) -> RegionCoord {
        RegionCoord::from_chunk(self)
    }

    /// World block coordinate of this chunk's north-west corner.
    #[inline]
    pub fn min_block(self) -> (i32, i32) {
        (self.cx * CHUNK_BLOCKS, self.cz * CHUNK_BLOCKS)
    }

    #[inline]
    pub fn from_block(bx: i32, bz: i32) -> Self {
        Self {
            cx: bx.div_euclid(CHUNK_BLOCKS),
            cz: bz.div_euclid(CHUNK_BLOCKS),
        }
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

/// Coordinate of one 32x32-chunk region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionCoord {
    pub rx: i32,
    pub rz: i32,
}

impl RegionCoord {
    #[inline]
    pub const fn new(rx: i32, rz: i32) -> Self {
        Self { rx, rz }
    }

    #[inline]
    pub fn from_chunk(chunk: ChunkCoord) -> Self {
        Self {
            rx: chunk.cx.div_euclid(REGION_CHUNKS),
            rz: chunk.cz.div_euclid(REGION_CHUNKS),
        }
    }

    #[inline]
    pub fn min_chunk(self) -> ChunkCoord {
        ChunkCoord::new(self.rx * REGION_CHUNKS, self.rz * REGION_CHUNKS)
    }

    #[inline]
    pub fn max_chunk(self) -> ChunkCoord {
        ChunkCoord::new(
            self.rx * REGION_CHUNKS + REGION_CHUNKS - 1,
            self.rz * REGION_CHUNKS + REGION_CHUNKS - 1,
        )
    }

    #[inline]
    pub fn contains(self, chunk: ChunkCoord) -> bool {
        RegionCoord::from_chunk(chunk) == self
    }

    /// All chunk coordinates in this region, row-major from the NW corner.
    pub fn chunks(self) -> impl Iterator<Item = ChunkCoord> {
        let min = self.min_chunk();
        (0..REGION_CHUNKS).flat_map(move |dz| {
            (0..REGION_CHUNKS).map(move |dx| ChunkCoord::new(min.cx + dx, min.cz + dz))
        })
    }

    /// Pixel offset of a chunk's sub-rectangle inside this region's raster.
    /// Caller must pass a chunk inside the region.
    #[inline]
    pub fn pixel_offset(self, chunk: ChunkCoord) -> (u32, u32) {
        let min = self.min_chunk();
        (
            ((chunk.cx - min.cx) * CHUNK_BLOCKS) as u32,
            ((chunk.cz - min.cz) * CHUNK_BLOCKS) as u32,
        )
    }

    #[inline]
    pub fn center_chunk(self) -> ChunkCoord {
        let min = self.min_chunk();
        ChunkCoord::new(min.cx + REGION_CHUNKS / 2, min.cz + REGION_CHUNKS / 2)
    }
}

/// Coordinate of one display tile at a zoom level. A tile at zoom 0 spans
/// `regions_per_tile` regions per axis; each zoom step halves block coverage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub tx: i32,
    pub tz: i32,
    pub zoom: u8,
}

impl TileCoord {
    pub fn from_block(bx: i32, bz: i32, zoom: u8, regions_per_tile: u32) -> Self {
        let shift = Self::block_shift(zoom, regions_per_tile);
        Self {
            tx: bx >> shift,
            tz: bz >> shift,
            zoom,
        }
    }

    /// log2 of blocks covered per tile axis. `regions_per_tile` must be a
    /// power of two; zoom can never shrink a tile below one chunk.
    #[inline]
    pub fn block_shift(zoom: u8, regions_per_tile: u32) -> u32 {
        let base = 9 + regions_per_tile.max(1).trailing_zeros();
        base.saturating_sub(u32::from(zoom)).max(4)
    }

    #[inline]
    pub fn block_span(self, regions_per_tile: u32) -> i32 {
        1 << Self::block_shift(self.zoom, regions_per_tile)
    }

    #[inline]
    pub fn min_block(self, regions_per_tile: u32) -> (i32, i32) {
        let span = self.block_span(regions_per_tile);
        (self.tx * span, self.tz * span)
    }

    #[inline]
    pub fn min_chunk(self, regions_per_tile: u32) -> ChunkCoord {
        let (bx, bz) = self.min_block(regions_per_tile);
        ChunkCoord::from_block(bx, bz)
    }

    #[inline]
    pub fn max_chunk(self, regions_per_tile: u32) -> ChunkCoord {
        let (bx, bz) = self.min_block(regions_per_tile);
        let span = self.block_span(regions_per_tile);
        ChunkCoord::from_block(bx + span - 1, bz + span - 1)
    }

    /// Regions overlapped by this tile, row-major.
    pub fn regions(self, regions_per_tile: u32) -> Vec<RegionCoord> {
        let min = RegionCoord::from_chunk(self.min_chunk(regions_per_tile));
        let max = RegionCoord::from_chunk(self.max_chunk(regions_per_tile));
        let mut out = Vec::new();
        for rz in min.rz..=max.rz {
            for rx in min.rx..=max.rx {
                out.push(RegionCoord::new(rx, rz));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_from_negative_chunk_floors() {
        assert_eq!(RegionCoord::from_chunk(ChunkCoord::new(-1, -1)), RegionCoord::new(-1, -1));
        assert_eq!(RegionCoord::from_chunk(ChunkCoord::new(-32, 31)), RegionCoord::new(-1, 0));
        assert_eq!(RegionCoord::from_chunk(ChunkCoord::new(32, -33)), RegionCoord::new(1, -2));
    }

    #[test]
    fn region_chunk_iteration_covers_exactly_once() {
        let region = RegionCoord::new(-1, 2);
        let chunks: Vec<_> = region.chunks().collect();
        assert_eq!(chunks.len(), (REGION_CHUNKS * REGION_CHUNKS) as usize);
        assert_eq!(chunks[0], region.min_chunk());
        assert_eq!(*chunks.last().unwrap(), region.max_chunk());
        for c in &chunks {
            assert!(region.contains(*c));
        }
    }

    #[test]
    fn pixel_offset_tracks_chunk_position() {
        let region = RegionCoord::new(0, 0);
        assert_eq!(region.pixel_offset(ChunkCoord::new(0, 0)), (0, 0));
        assert_eq!(region.pixel_offset(ChunkCoord::new(1, 0)), (16, 0));
        assert_eq!(region.pixel_offset(ChunkCoord::new(31, 31)), (496, 496));
        let neg = RegionCoord::new(-1, -1);
        assert_eq!(neg.pixel_offset(ChunkCoord::new(-32, -32)), (0, 0));
        assert_eq!(neg.pixel_offset(ChunkCoord::new(-1, -1)), (496, 496));
    }

    #[test]
    fn tile_zoom_halves_block_span() {
        let t0 = TileCoord::from_block(0, 0, 0, 2);
        assert_eq!(t0.block_span(2), 1024);
        let t1 = TileCoord::from_block(0, 0, 1, 2);
        assert_eq!(t1.block_span(2), 512);
        // A tile never shrinks below one chunk.
        let t9 = TileCoord::from_block(0, 0, 9, 2);
        assert_eq!(t9.block_span(2), 16);
    }

    #[test]
    fn tile_regions_cover_span() {
        let tile = TileCoord::from_block(0, 0, 0, 2);
        assert_eq!(tile.regions(2).len(), 4);
        let tile = TileCoord::from_block(-1, -1, 0, 2);
        assert_eq!(tile, TileCoord { tx: -1, tz: -1, zoom: 0 });
        assert_eq!(tile.regions(2).len(), 4);
        // Zoomed in past region size: one region.
        let tile = TileCoord::from_block(700, 100, 2, 2);
        assert_eq!(tile.regions(2).len(), 1);
    }
}
