use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use relief_chunk::ChunkSnapshot;
use relief_render::RenderPass;
use relief_world::DimensionId;

/// Cooperative cancellation: set by the scheduler on world/dimension change,
/// checked by the executor at each chunk boundary.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// One unit of background mapping work. Snapshots were captured on the
/// foreground thread; the task owns them exclusively from here on.
pub struct MappingTask {
    pub dim: DimensionId,
    pub pass: RenderPass,
    pub snapshots: Vec<Arc<ChunkSnapshot>>,
    pub flush_when_done: bool,
}

impl MappingTask {
    pub fn chunk_count(&self) -> usize {
        self.snapshots.len()
    }
}

/// How a dispatched task ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed { rendered: usize, skipped: usize },
    /// Cancel token fired mid-task; partial work was kept.
    Cancelled,
    /// The live world/dimension no longer matches the task's target. A
    /// race, not an error: partial work is discarded silently.
    Stale,
    Failed(String),
}
