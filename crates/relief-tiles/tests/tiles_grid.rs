use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};
use relief_render::ChunkImage;
use relief_store::{LogAnnouncer, RegionImageStore};
use relief_tiles::{GridRenderer, TileCache, TileId};
use relief_world::{ChunkCoord, DimensionId, MapLayer};

struct TestDir(PathBuf);

impl TestDir {
    fn new(tag: &str) -> Self {
        let path = std::env::temp_dir().join(format!("relief-tiles-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).unwrap();
        TestDir(path)
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

fn store(dir: &TestDir) -> Arc<RegionImageStore> {
    RegionImageStore::new(&dir.0, 16, Duration::from_secs(3600), Arc::new(LogAnnouncer))
}

fn red_chunk(coord: ChunkCoord) -> ChunkImage {
    let mut img = RgbaImage::new(16, 32);
    for y in 0..16 {
        for x in 0..16 {
            img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            img.put_pixel(x, y + 16, Rgba([0, 0, 255, 255]));
        }
    }
    ChunkImage::surface(coord, DimensionId::OVERWORLD, img)
}

#[test]
fn recenter_is_a_no_op_for_same_center_tile() {
    let mut cache = TileCache::new(Duration::from_secs(60));
    let mut grid = GridRenderer::new(3, 2);
    let now = Instant::now();

    assert!(grid.recenter(&mut cache, 100, 100, 0, DimensionId::OVERWORLD, now));
    let populated = cache.len();
    assert_eq!(populated, 9);

    // A small pan inside the same tile identity must rebuild nothing.
    assert!(!grid.recenter(&mut cache, 140, 90, 0, DimensionId::OVERWORLD, now));
    assert_eq!(cache.len(), populated);

    // Crossing into another tile re-centers.
    assert!(grid.recenter(&mut cache, 100 + 1024, 100, 0, DimensionId::OVERWORLD, now));
}

#[test]
fn zoom_change_clears_the_cache() {
    let mut cache = TileCache::new(Duration::from_secs(60));
    let mut grid = GridRenderer::new(3, 2);
    let now = Instant::now();
    grid.recenter(&mut cache, 0, 0, 0, DimensionId::OVERWORLD, now);
    assert_eq!(cache.len(), 9);
    grid.recenter(&mut cache, 0, 0, 2, DimensionId::OVERWORLD, now);
    // Old-zoom tiles were released and dropped; only the new grid remains.
    assert_eq!(cache.len(), 9);
    assert_eq!(grid.center().unwrap().zoom, 2);
}

#[test]
fn visible_tiles_refresh_and_stabilize() {
    let dir = TestDir::new("refresh");
    let store = store(&dir);
    store.insert_chunk(&red_chunk(ChunkCoord::new(0, 0)));

    let mut cache = TileCache::new(Duration::from_secs(60));
    let mut grid = GridRenderer::new(3, 2);
    let now = Instant::now();
    grid.recenter(&mut cache, 8, 8, 0, DimensionId::OVERWORLD, now);

    assert!(grid.refresh_visible(&mut cache, &store, MapLayer::Day, 800, 600, now));
    // Nothing changed since: the second refresh is a no-op.
    assert!(!grid.refresh_visible(&mut cache, &store, MapLayer::Day, 800, 600, now));

    // New chunk data re-dirties the overlapped tile.
    store.insert_chunk(&red_chunk(ChunkCoord::new(1, 0)));
    assert!(grid.refresh_visible(&mut cache, &store, MapLayer::Day, 800, 600, now));

    // Switching layers rebuilds even with unchanged regions.
    assert!(grid.refresh_visible(&mut cache, &store, MapLayer::Night, 800, 600, now));
}

#[test]
fn tile_pixels_come_from_region_store() {
    let dir = TestDir::new("pixels");
    let store = store(&dir);
    store.insert_chunk(&red_chunk(ChunkCoord::new(0, 0)));

    let mut cache = TileCache::new(Duration::from_secs(60));
    let mut grid = GridRenderer::new(3, 2);
    let now = Instant::now();
    grid.recenter(&mut cache, 8, 8, 0, DimensionId::OVERWORLD, now);
    grid.refresh_visible(&mut cache, &store, MapLayer::Day, 800, 600, now);

    let center = grid.center().unwrap();
    let tile = cache.get(center, now).unwrap();
    let pixels = tile.pixels().expect("built tile");
    // Tile spans 1024 blocks into 512 px: a 16-block chunk covers 8 px.
    assert_eq!(pixels.get_pixel(0, 0).0, [255, 0, 0, 255]);
    assert_eq!(pixels.get_pixel(7, 7).0, [255, 0, 0, 255]);
    assert_eq!(pixels.get_pixel(20, 20).0, [0, 0, 0, 0]);
}

#[test]
fn off_screen_grid_members_are_skipped() {
    let dir = TestDir::new("offscreen");
    let store = store(&dir);
    // Data in the center tile and in the east neighbor.
    store.insert_chunk(&red_chunk(ChunkCoord::new(0, 0)));
    store.insert_chunk(&red_chunk(ChunkCoord::new(64, 0)));

    let mut cache = TileCache::new(Duration::from_secs(60));
    let mut grid = GridRenderer::new(3, 2);
    let now = Instant::now();
    // Focus in the middle of tile (0,0); a tiny viewport shows only it.
    grid.recenter(&mut cache, 512, 512, 0, DimensionId::OVERWORLD, now);
    grid.refresh_visible(&mut cache, &store, MapLayer::Day, 100, 100, now);

    let center = grid.center().unwrap();
    assert!(cache.get(center, now).unwrap().has_pixels());
    let east = TileId { tx: center.tx + 1, ..center };
    assert!(
        !cache.get(east, now).unwrap().has_pixels(),
        "off-screen neighbor must not be refreshed"
    );
}

#[test]
fn idle_tiles_expire_and_release() {
    let mut cache = TileCache::new(Duration::from_millis(100));
    let mut grid = GridRenderer::new(3, 2);
    let t0 = Instant::now();
    grid.recenter(&mut cache, 0, 0, 0, DimensionId::OVERWORLD, t0);
    assert_eq!(cache.len(), 9);
    let evicted = cache.sweep(t0 + Duration::from_millis(200));
    assert_eq!(evicted, 9);
    assert!(cache.is_empty());
}
