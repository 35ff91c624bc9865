use std::sync::Arc;

use relief_chunk::ChunkSnapshot;
use relief_store::Announcer;
use relief_world::{ChunkCoord, DimensionId, RegionCoord};

use crate::task::{MappingTask, TaskOutcome};

/// World/chunk-access collaborator. Only ever called from the foreground
/// (simulation) thread; snapshots it returns are handed to the background
/// executor as immutable values.
pub trait WorldSource {
    fn dimension(&self) -> DimensionId;
    fn dimensions(&self) -> Vec<DimensionId>;
    fn player_chunk(&self) -> ChunkCoord;
    /// Vertical slice the player occupies when underground, else `None`.
    fn player_underground(&self) -> Option<i32>;
    /// Modification stamp for a loaded chunk; `None` when not loaded.
    fn chunk_stamp(&self, coord: ChunkCoord) -> Option<u64>;
    fn snapshot(&self, coord: ChunkCoord) -> Option<Arc<ChunkSnapshot>>;
    /// Region coordinates with generated world data on disk.
    fn regions_with_data(&self, dim: DimensionId) -> Vec<RegionCoord>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManagerKind {
    Proximity,
    Automap,
}

/// Parameters carried by an operator enable request.
#[derive(Clone, Copy, Debug, Default)]
pub enum ControlParams {
    #[default]
    None,
    /// Automap one dimension, or every dimension with data when `None`.
    Automap { dim: Option<DimensionId> },
}

/// A source of background mapping work, polled by the scheduler in
/// registration order. At most one manager's task runs at a time.
pub trait TaskManager {
    fn kind(&self) -> ManagerKind;
    fn is_enabled(&self) -> bool;
    fn enable(&mut self, params: ControlParams, world: &dyn WorldSource);
    fn disable(&mut self);
    /// Next unit of work, with snapshots captured now, or `None` when idle.
    fn next_task(&mut self, world: &dyn WorldSource) -> Option<MappingTask>;
    fn task_done(&mut self, outcome: &TaskOutcome, announcer: &dyn Announcer);
    /// Externally-requested priority coordinate (e.g. a chunk finished
    /// loading). Default: ignored.
    fn offer_chunk(&mut self, _coord: ChunkCoord) {}
}
