//! Persistent region image cache: aggregates chunk rasters into region-sized
//! files with dirty tracking, bounded memory, and background flushing.
#![forbid(unsafe_code)]

mod announce;
mod lru;
mod persist;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Sender, select, tick, unbounded};
use image::RgbaImage;
use relief_render::{ChunkImage, ChunkPixels};
use relief_world::{CHUNK_PIXELS, ChunkCoord, DimensionId, MapLayer, REGION_PIXELS, RegionCoord};

pub use crate::announce::{Announcer, LogAnnouncer};
pub use crate::lru::BoundedLru;
pub use crate::persist::{legacy_path, list_regions as list_region_files, region_path};

/// Identity of one persisted region raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegionImageKey {
    pub region: RegionCoord,
    pub dim: DimensionId,
    pub layer: MapLayer,
}

impl RegionImageKey {
    pub fn for_chunk(chunk: ChunkCoord, dim: DimensionId, layer: MapLayer) -> Self {
        Self {
            region: chunk.region(),
            dim,
            layer,
        }
    }
}

/// One in-memory region raster and its persistence state.
struct RegionImage {
    raster: Arc<RgbaImage>,
    dirty: bool,
    /// Never loaded from disk and never written to; not worth flushing.
    blank: bool,
    last_modified: Instant,
    path: PathBuf,
}

impl RegionImage {
    fn blank(path: PathBuf) -> Self {
        Self {
            raster: Arc::new(RgbaImage::new(REGION_PIXELS, REGION_PIXELS)),
            dirty: false,
            blank: true,
            last_modified: Instant::now(),
            path,
        }
    }

    fn loaded(path: PathBuf, raster: RgbaImage) -> Self {
        Self {
            raster: Arc::new(raster),
            dirty: false,
            blank: false,
            last_modified: Instant::now(),
            path,
        }
    }
}

struct StoreState {
    regions: BoundedLru<RegionImageKey, RegionImage>,
    last_flush: Instant,
    io_error_announced: bool,
}

/// Bounded in-memory cache over the persistent region rasters. Shared
/// between the foreground (reads for display) and the background executor
/// (chunk inserts, flushes); all mutation happens under one lock, but disk
/// writes take a cheap `Arc` clone of the raster and run outside it.
pub struct RegionImageStore {
    state: Mutex<StoreState>,
    base: PathBuf,
    flush_interval: Duration,
    announcer: Arc<dyn Announcer>,
    maintenance: Mutex<Option<MaintenanceHandle>>,
}

struct MaintenanceHandle {
    stop_tx: Sender<()>,
    thread: thread::JoinHandle<()>,
}

impl RegionImageStore {
    pub fn new(
        base: impl Into<PathBuf>,
        capacity: usize,
        flush_interval: Duration,
        announcer: Arc<dyn Announcer>,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(StoreState {
                regions: BoundedLru::new(capacity),
                last_flush: Instant::now(),
                io_error_announced: false,
            }),
            base: base.into(),
            flush_interval,
            announcer,
            maintenance: Mutex::new(None),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// Start the cache-maintenance thread: flushes dirty regions every
    /// flush interval so unsaved work never outlives one interval.
    pub fn spawn_maintenance(self: &Arc<Self>) {
        let mut slot = self.maintenance.lock().unwrap();
        if slot.is_some() {
            return;
        }
        let (stop_tx, stop_rx) = unbounded::<()>();
        let store = Arc::clone(self);
        let ticker = tick(self.flush_interval);
        let thread = thread::spawn(move || {
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> _ => {
                        let written = store.flush(false);
                        if written > 0 {
                            log::debug!("region store auto-flushed {written} regions");
                        }
                    }
                }
            }
        });
        *slot = Some(MaintenanceHandle { stop_tx, thread });
    }

    /// Stop maintenance and force a final flush. Called on shutdown.
    pub fn close(&self) {
        let handle = self.maintenance.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.stop_tx.send(());
            let _ = handle.thread.join();
        }
        self.flush(true);
    }

    /// Write a rendered chunk into its region raster(s). A surface image is
    /// cropped into day and night sub-rectangles in one pass.
    pub fn insert_chunk(&self, img: &ChunkImage) {
        let pieces: Vec<(MapLayer, RgbaImage)> = match &img.pixels {
            ChunkPixels::Surface(combined) => {
                let day = image::imageops::crop_imm(combined, 0, 0, CHUNK_PIXELS, CHUNK_PIXELS)
                    .to_image();
                let night =
                    image::imageops::crop_imm(combined, 0, CHUNK_PIXELS, CHUNK_PIXELS, CHUNK_PIXELS)
                        .to_image();
                vec![(MapLayer::Day, day), (MapLayer::Night, night)]
            }
            ChunkPixels::Flat { layer, image } => vec![(*layer, image.clone())],
        };

        let mut evicted: Vec<(PathBuf, Arc<RgbaImage>)> = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            for (layer, piece) in pieces {
                let key = RegionImageKey::for_chunk(img.coord, img.dim, layer);
                self.ensure_loaded(&mut state, key, &mut evicted);
                let (px, pz) = key.region.pixel_offset(img.coord);
                if let Some(entry) = state.regions.get_mut(&key) {
                    let raster = Arc::make_mut(&mut entry.raster);
                    image::imageops::replace(raster, &piece, i64::from(px), i64::from(pz));
                    entry.dirty = true;
                    entry.blank = false;
                    entry.last_modified = Instant::now();
                }
            }
        }
        // Dirty victims evicted above are written now, outside the lock.
        self.write_rasters(evicted);
    }

    /// Raster for a region if it has any content, loading from disk on
    /// first reference. Returns `None` for regions with no data.
    pub fn region_raster(&self, key: RegionImageKey) -> Option<Arc<RgbaImage>> {
        let mut evicted: Vec<(PathBuf, Arc<RgbaImage>)> = Vec::new();
        let raster = {
            let mut state = self.state.lock().unwrap();
            self.ensure_loaded(&mut state, key, &mut evicted);
            state.regions.get(&key).and_then(|entry| {
                if entry.blank {
                    None
                } else {
                    Some(Arc::clone(&entry.raster))
                }
            })
        };
        self.write_rasters(evicted);
        raster
    }

    /// Whether a region changed in memory after `since`. Regions already
    /// evicted were flushed and reload with a fresh instant, so callers see
    /// at least one rebuild signal.
    pub fn modified_since(&self, key: RegionImageKey, since: Instant) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.regions.get(&key) {
            Some(entry) => !entry.blank && entry.last_modified > since,
            None => false,
        }
    }

    /// Flush dirty regions. `force` ignores the flush-interval clock; a
    /// non-forced call is a no-op until an interval has elapsed.
    pub fn flush(&self, force: bool) -> usize {
        let to_write: Vec<(PathBuf, Arc<RgbaImage>)> = {
            let mut state = self.state.lock().unwrap();
            if !force && state.last_flush.elapsed() < self.flush_interval {
                return 0;
            }
            state.last_flush = Instant::now();
            state
                .regions
                .iter_mut()
                .filter(|(_, entry)| entry.dirty)
                .map(|(_, entry)| {
                    entry.dirty = false;
                    (entry.path.clone(), Arc::clone(&entry.raster))
                })
                .collect()
        };
        let count = to_write.len();
        self.write_rasters(to_write);
        count
    }

    /// Flush dirty regions, then drop all in-memory state. Used on world or
    /// dimension change.
    pub fn clear(&self) {
        self.flush(true);
        let mut state = self.state.lock().unwrap();
        state.regions.drain();
    }

    /// Delete persisted map data for one dimension, or all of them. The only
    /// operation that removes region files.
    pub fn delete(&self, dim: Option<DimensionId>) -> io::Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            state
                .regions
                .remove_matching(|key| dim.is_none_or(|d| key.dim == d));
        }
        match dim {
            Some(d) => {
                let dir = self.base.join(d.dir_name());
                if dir.exists() {
                    std::fs::remove_dir_all(&dir)?;
                    log::info!("deleted map data {}", dir.display());
                }
            }
            None => {
                let Ok(entries) = std::fs::read_dir(&self.base) else {
                    return Ok(());
                };
                for entry in entries.flatten() {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if name.starts_with("DIM") && entry.path().is_dir() {
                        std::fs::remove_dir_all(entry.path())?;
                        log::info!("deleted map data {}", entry.path().display());
                    }
                }
            }
        }
        Ok(())
    }

    /// Region coordinates with persisted rasters for a dimension.
    pub fn list_regions(&self, dim: DimensionId) -> Vec<RegionCoord> {
        persist::list_regions(&self.base, dim)
    }

    pub fn dirty_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.regions.iter().filter(|(_, e)| e.dirty).count()
    }

    /// Load a region into the cache on first reference. Dirty entries
    /// evicted to make room are appended to `evicted` for the caller to
    /// write once the store lock is released; eviction always flushes,
    /// never silently drops.
    fn ensure_loaded(
        &self,
        state: &mut StoreState,
        key: RegionImageKey,
        evicted: &mut Vec<(PathBuf, Arc<RgbaImage>)>,
    ) {
        if state.regions.contains(&key) {
            return;
        }
        let path = persist::region_path(&self.base, key.region, key.dim, key.layer);
        let mut io_failed = false;
        if key.layer.is_surface() && !path.exists() {
            if let Err(e) = persist::migrate_legacy(&self.base, key.region, key.dim) {
                log::warn!("legacy migration for {:?} failed: {e}", key.region);
                io_failed = true;
            }
        }
        let entry = match persist::read_raster(&path) {
            Ok(persist::ReadOutcome::Loaded(raster)) => RegionImage::loaded(path, raster),
            Ok(persist::ReadOutcome::Missing) => RegionImage::blank(path),
            Ok(persist::ReadOutcome::Quarantined) => {
                io_failed = true;
                RegionImage::blank(path)
            }
            Err(e) => {
                log::warn!("couldn't read region {}: {e}", path.display());
                io_failed = true;
                RegionImage::blank(path)
            }
        };
        state.regions.insert(key, entry, |_, victim| {
            if victim.dirty {
                evicted.push((victim.path.clone(), victim.raster));
            }
        });
        if io_failed {
            self.announce_io_error(state);
        }
    }

    fn write_rasters(&self, batch: Vec<(PathBuf, Arc<RgbaImage>)>) {
        for (path, raster) in batch {
            if let Err(e) = persist::write_raster(&path, &raster) {
                log::error!("couldn't write region image {}: {e}", path.display());
                let mut state = self.state.lock().unwrap();
                self.announce_io_error(&mut state);
            }
        }
    }

    fn announce_io_error(&self, state: &mut StoreState) {
        if !state.io_error_announced {
            state.io_error_announced = true;
            self.announcer
                .announce("Map image storage hit an I/O problem; some map data may not persist.");
        }
    }
}
