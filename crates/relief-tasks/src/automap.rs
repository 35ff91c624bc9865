use std::collections::VecDeque;
use std::sync::Arc;

use relief_chunk::ChunkSnapshot;
use relief_render::RenderPass;
use relief_store::Announcer;
use relief_world::{DimensionId, RegionCoord, sort_regions_by_distance};

use crate::manager::{ControlParams, ManagerKind, TaskManager, WorldSource};
use crate::task::{MappingTask, TaskOutcome};

struct DimRun {
    dim: DimensionId,
    /// Regions sorted by ascending distance, reversed so `pop` yields the
    /// nearest remaining region.
    stack: Vec<RegionCoord>,
    total: usize,
    done: usize,
}

/// One-shot operator-initiated manager: maps every on-disk region of the
/// target dimension(s), nearest first, one region per task.
pub struct AutomapManager {
    dims_remaining: VecDeque<DimensionId>,
    current: Option<DimRun>,
    active: bool,
}

impl AutomapManager {
    pub fn new() -> Self {
        Self {
            dims_remaining: VecDeque::new(),
            current: None,
            active: false,
        }
    }

    fn begin_dimension(&mut self, world: &dyn WorldSource) -> bool {
        while let Some(dim) = self.dims_remaining.pop_front() {
            let mut regions = world.regions_with_data(dim);
            if regions.is_empty() {
                log::info!("automap: no region data for {dim}");
                continue;
            }
            let reference = if dim == world.dimension() {
                world.player_chunk()
            } else {
                relief_world::ChunkCoord::new(0, 0)
            };
            sort_regions_by_distance(&mut regions, reference);
            regions.reverse();
            let total = regions.len();
            self.current = Some(DimRun {
                dim,
                stack: regions,
                total,
                done: 0,
            });
            return true;
        }
        false
    }

    fn snapshot_region(
        region: RegionCoord,
        world: &dyn WorldSource,
    ) -> Vec<Arc<ChunkSnapshot>> {
        region.chunks().filter_map(|coord| world.snapshot(coord)).collect()
    }
}

impl Default for AutomapManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskManager for AutomapManager {
    fn kind(&self) -> ManagerKind {
        ManagerKind::Automap
    }

    fn is_enabled(&self) -> bool {
        self.active
    }

    fn enable(&mut self, params: ControlParams, world: &dyn WorldSource) {
        let dims = match params {
            ControlParams::Automap { dim: Some(dim) } => vec![dim],
            ControlParams::Automap { dim: None } => world.dimensions(),
            ControlParams::None => vec![world.dimension()],
        };
        self.dims_remaining = dims.into();
        self.current = None;
        self.active = true;
        log::info!("automap started for {} dimension(s)", self.dims_remaining.len());
    }

    fn disable(&mut self) {
        self.active = false;
        self.current = None;
        self.dims_remaining.clear();
    }

    fn next_task(&mut self, world: &dyn WorldSource) -> Option<MappingTask> {
        if !self.active {
            return None;
        }
        loop {
            if self.current.is_none() && !self.begin_dimension(world) {
                self.active = false;
                return None;
            }
            let run = self.current.as_mut()?;
            let Some(region) = run.stack.pop() else {
                self.current = None;
                continue;
            };
            let snapshots = Self::snapshot_region(region, world);
            if snapshots.is_empty() {
                // Nothing loadable in this region; count it and move on.
                run.done += 1;
                continue;
            }
            log::info!(
                "automap {}: mapping region ({}, {}) with {} chunks",
                run.dim,
                region.rx,
                region.rz,
                snapshots.len()
            );
            return Some(MappingTask {
                dim: run.dim,
                pass: RenderPass::Surface,
                snapshots,
                // Each region task flushes the store when it completes, so
                // finished work reaches disk as the sweep progresses.
                flush_when_done: true,
            });
        }
    }

    fn task_done(&mut self, outcome: &TaskOutcome, announcer: &dyn Announcer) {
        match outcome {
            TaskOutcome::Completed { .. } => {
                let Some(run) = self.current.as_mut() else {
                    return;
                };
                run.done += 1;
                let percent = run.done * 100 / run.total.max(1);
                announcer.announce(&format!("Automap {}: {percent}% complete", run.dim));
                if run.stack.is_empty() && run.done >= run.total {
                    announcer.announce(&format!("Automap finished for {}", run.dim));
                    self.current = None;
                    if self.dims_remaining.is_empty() {
                        self.active = false;
                    }
                }
            }
            TaskOutcome::Cancelled | TaskOutcome::Stale => {
                announcer.announce("Automap stopped");
                self.disable();
            }
            TaskOutcome::Failed(e) => {
                announcer.announce(&format!("Automap task failed: {e}"));
                self.disable();
            }
        }
    }
}
