use std::time::{Duration, Instant};

use hashbrown::HashMap;

use crate::tile::{Tile, TileId};

struct CacheEntry {
    tile: Tile,
    last_access: Instant,
}

/// Ephemeral tile cache, bounded by idle time from last access rather than
/// size: tiles rebuild cheaply from the region store, so nothing here needs
/// a disk flush. Eviction always runs the tile's release hook first.
pub struct TileCache {
    entries: HashMap<TileId, CacheEntry>,
    idle: Duration,
}

impl TileCache {
    pub fn new(idle: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            idle,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&mut self, id: TileId, now: Instant) -> Option<&mut Tile> {
        let entry = self.entries.get_mut(&id)?;
        entry.last_access = now;
        Some(&mut entry.tile)
    }

    pub fn get_or_create(&mut self, id: TileId, regions_per_tile: u32, now: Instant) -> &mut Tile {
        let entry = self.entries.entry(id).or_insert_with(|| CacheEntry {
            tile: Tile::new(id, regions_per_tile),
            last_access: now,
        });
        entry.last_access = now;
        &mut entry.tile
    }

    pub fn contains(&self, id: TileId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Expire tiles idle past the window. Returns how many were evicted.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let idle = self.idle;
        let expired: Vec<TileId> = self
            .entries
            .iter()
            .filter(|(_, e)| now.duration_since(e.last_access) >= idle)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            if let Some(mut entry) = self.entries.remove(id) {
                entry.tile.release();
            }
        }
        expired.len()
    }

    /// Release and drop everything. Used on world/dimension change and zoom
    /// change.
    pub fn clear(&mut self) {
        for (_, entry) in self.entries.iter_mut() {
            entry.tile.release();
        }
        self.entries.clear();
    }
}
