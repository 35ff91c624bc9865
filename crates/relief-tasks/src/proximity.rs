use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::HashMap;
use relief_chunk::ChunkSnapshot;
use relief_render::RenderPass;
use relief_store::Announcer;
use relief_world::{ChunkCoord, sort_chunks_by_distance};

use crate::manager::{ControlParams, ManagerKind, TaskManager, WorldSource};
use crate::task::{MappingTask, TaskOutcome};

/// Neighborhood outline revealed around the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealShape {
    Square,
    Circle,
}

#[derive(Clone, Debug)]
pub struct ProximityConfig {
    /// Ring distance always re-examined every poll.
    pub primary_radius: i32,
    /// Outer bound for the secondary catch-up ring.
    pub max_radius: i32,
    pub shape: RevealShape,
    /// Priority-queue drain cap per poll.
    pub max_priority_per_poll: usize,
    /// Polls an out-of-range snapshot survives before being dropped.
    pub grace_polls: u8,
    /// Also map the surface while the player is underground.
    pub always_map_surface: bool,
    pub map_topography: bool,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            primary_radius: 2,
            max_radius: 5,
            shape: RevealShape::Square,
            max_priority_per_poll: 16,
            grace_polls: 3,
            always_map_surface: false,
            map_topography: false,
        }
    }
}

struct CachedSnapshot {
    snap: Arc<ChunkSnapshot>,
    stamp: u64,
    grace: u8,
}

/// Continuous player-following manager: re-renders the neighborhood around
/// the player, reusing snapshots of unchanged chunks and draining externally
/// offered priority chunks first.
pub struct ProximityManager {
    cfg: ProximityConfig,
    enabled: bool,
    /// Ring index -> chunk offsets at that ring, precomputed per shape.
    rings: Vec<Vec<(i32, i32)>>,
    last_player: Option<ChunkCoord>,
    secondary_ring: i32,
    snapshots: HashMap<ChunkCoord, CachedSnapshot>,
    priority: VecDeque<ChunkCoord>,
    pass_rotation: VecDeque<RenderPass>,
}

impl ProximityManager {
    pub fn new(cfg: ProximityConfig) -> Self {
        let max = cfg.max_radius.max(cfg.primary_radius).max(0);
        let rings = (0..=max).map(|r| ring_offsets(r, cfg.shape)).collect();
        Self {
            cfg,
            enabled: false,
            rings,
            last_player: None,
            secondary_ring: 0,
            snapshots: HashMap::new(),
            priority: VecDeque::new(),
            pass_rotation: VecDeque::new(),
        }
    }

    /// Candidate coordinates for one poll: drained priority chunks first
    /// (FIFO, capped), then the neighborhood sorted by ascending Euclidean
    /// distance from the player.
    pub fn candidate_coords(&mut self, player: ChunkCoord) -> Vec<ChunkCoord> {
        let moved = self.last_player != Some(player);
        self.last_player = Some(player);
        let primary = self.cfg.primary_radius.min(self.rings.len() as i32 - 1);
        let max = self.cfg.max_radius.min(self.rings.len() as i32 - 1);
        if moved {
            // Catch-up hint, not a contract: a stationary player lets the
            // secondary ring walk outward; movement restarts it.
            self.secondary_ring = primary;
        } else if self.secondary_ring >= max {
            self.secondary_ring = primary;
        }
        if self.secondary_ring < max {
            self.secondary_ring += 1;
        }

        let mut neighborhood: Vec<ChunkCoord> = Vec::new();
        for r in 0..=primary {
            for &(dx, dz) in &self.rings[r as usize] {
                neighborhood.push(player.offset(dx, dz));
            }
        }
        if self.secondary_ring > primary {
            for &(dx, dz) in &self.rings[self.secondary_ring as usize] {
                neighborhood.push(player.offset(dx, dz));
            }
        }
        sort_chunks_by_distance(&mut neighborhood, player);

        let mut out: Vec<ChunkCoord> = Vec::new();
        let drain = self.priority.len().min(self.cfg.max_priority_per_poll);
        for _ in 0..drain {
            if let Some(coord) = self.priority.pop_front() {
                if !out.contains(&coord) {
                    out.push(coord);
                }
            }
        }
        for coord in neighborhood {
            if !out.contains(&coord) {
                out.push(coord);
            }
        }
        out
    }

    fn next_pass(&mut self, world: &dyn WorldSource) -> RenderPass {
        if self.pass_rotation.is_empty() {
            match world.player_underground() {
                Some(slice) => {
                    self.pass_rotation.push_back(RenderPass::Underground { slice });
                    if self.cfg.always_map_surface {
                        self.pass_rotation.push_back(RenderPass::Surface);
                    }
                }
                None => {
                    self.pass_rotation.push_back(RenderPass::Surface);
                    if self.cfg.map_topography {
                        self.pass_rotation.push_back(RenderPass::Topo);
                    }
                }
            }
        }
        self.pass_rotation.pop_front().unwrap_or(RenderPass::Surface)
    }

    /// Snapshot the batch, reusing cached snapshots whose stamp is
    /// unchanged, and age out-of-range cache entries by grace count.
    fn capture(&mut self, coords: &[ChunkCoord], world: &dyn WorldSource) -> Vec<Arc<ChunkSnapshot>> {
        let mut batch = Vec::with_capacity(coords.len());
        for &coord in coords {
            let Some(stamp) = world.chunk_stamp(coord) else {
                continue;
            };
            if let Some(cached) = self.snapshots.get_mut(&coord) {
                if cached.stamp == stamp {
                    cached.grace = 0;
                    batch.push(Arc::clone(&cached.snap));
                    continue;
                }
            }
            let Some(snap) = world.snapshot(coord) else {
                continue;
            };
            if let Some(old) = self.snapshots.insert(
                coord,
                CachedSnapshot {
                    snap: Arc::clone(&snap),
                    stamp,
                    grace: 0,
                },
            ) {
                old.snap.mark_stale();
            }
            batch.push(snap);
        }

        // Age entries that fell out of this poll's range; a grace window
        // tolerates transient boundary flicker.
        let keep_limit = self.cfg.grace_polls;
        let current: hashbrown::HashSet<ChunkCoord> = coords.iter().copied().collect();
        self.snapshots.retain(|coord, cached| {
            if current.contains(coord) {
                return true;
            }
            cached.grace = cached.grace.saturating_add(1);
            cached.grace <= keep_limit
        });
        batch
    }
}

impl TaskManager for ProximityManager {
    fn kind(&self) -> ManagerKind {
        ManagerKind::Proximity
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn enable(&mut self, _params: ControlParams, _world: &dyn WorldSource) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.snapshots.clear();
        self.priority.clear();
        self.pass_rotation.clear();
        self.last_player = None;
    }

    fn next_task(&mut self, world: &dyn WorldSource) -> Option<MappingTask> {
        let coords = self.candidate_coords(world.player_chunk());
        let snapshots = self.capture(&coords, world);
        if snapshots.is_empty() {
            return None;
        }
        let pass = self.next_pass(world);
        Some(MappingTask {
            dim: world.dimension(),
            pass,
            snapshots,
            flush_when_done: false,
        })
    }

    fn task_done(&mut self, outcome: &TaskOutcome, _announcer: &dyn Announcer) {
        match outcome {
            TaskOutcome::Completed { rendered, skipped } => {
                log::debug!("proximity task mapped {rendered} chunks ({skipped} skipped)");
            }
            other => log::debug!("proximity task ended: {other:?}"),
        }
    }

    fn offer_chunk(&mut self, coord: ChunkCoord) {
        if !self.priority.contains(&coord) {
            self.priority.push_back(coord);
        }
    }
}

fn ring_offsets(ring: i32, shape: RevealShape) -> Vec<(i32, i32)> {
    if ring == 0 {
        return vec![(0, 0)];
    }
    let mut out = Vec::new();
    for dz in -ring..=ring {
        for dx in -ring..=ring {
            if dx.abs().max(dz.abs()) != ring {
                continue;
            }
            if shape == RevealShape::Circle {
                let dist = ((dx * dx + dz * dz) as f64).sqrt();
                // Let in chunks halfway across the perimeter for fuller circles.
                if dist - f64::from(ring) > 0.5 {
                    continue;
                }
            }
            out.push((dx, dz));
        }
    }
    out
}
