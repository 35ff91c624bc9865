use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use relief_render::ChunkRenderer;
use relief_store::{Announcer, RegionImageStore};
use relief_world::{ChunkCoord, DimensionId};

use crate::manager::{ControlParams, ManagerKind, TaskManager, WorldSource};
use crate::task::{CancelToken, MappingTask, TaskOutcome};

struct Job {
    task: MappingTask,
    token: CancelToken,
    manager_idx: usize,
}

struct JobResult {
    manager_idx: usize,
    outcome: TaskOutcome,
}

struct InFlight {
    manager_idx: usize,
    token: CancelToken,
}

/// Polls task managers in registration order and runs their tasks on a
/// single background worker thread. At most one task is ever in flight;
/// that is the scheduler's whole backpressure story.
pub struct TaskScheduler {
    managers: Vec<Box<dyn TaskManager>>,
    job_tx: Option<Sender<Job>>,
    res_rx: Receiver<JobResult>,
    worker: Option<thread::JoinHandle<()>>,
    in_flight: Option<InFlight>,
    live_dim: Arc<AtomicI32>,
    announcer: Arc<dyn Announcer>,
    dispatched: u64,
    completed: u64,
}

impl TaskScheduler {
    pub fn new(
        renderer: Arc<ChunkRenderer>,
        store: Arc<RegionImageStore>,
        announcer: Arc<dyn Announcer>,
    ) -> Self {
        let (job_tx, job_rx) = unbounded::<Job>();
        let (res_tx, res_rx) = unbounded::<JobResult>();
        let live_dim = Arc::new(AtomicI32::new(0));
        let worker_live_dim = Arc::clone(&live_dim);
        let worker = thread::spawn(move || {
            while let Ok(job) = job_rx.recv() {
                let outcome = run_task(&job.task, &job.token, &worker_live_dim, &renderer, &store);
                // Palette additions ride along on the worker so foreground
                // frames never pay for palette disk writes.
                if renderer.palette().is_dirty() {
                    if let Err(e) = renderer.palette().persist() {
                        log::error!("couldn't persist color palette: {e}");
                    }
                }
                if res_tx
                    .send(JobResult {
                        manager_idx: job.manager_idx,
                        outcome,
                    })
                    .is_err()
                {
                    break;
                }
            }
        });
        Self {
            managers: Vec::new(),
            job_tx: Some(job_tx),
            res_rx,
            worker: Some(worker),
            in_flight: None,
            live_dim,
            announcer,
            dispatched: 0,
            completed: 0,
        }
    }

    /// Managers are polled in the order they were registered.
    pub fn register(&mut self, manager: Box<dyn TaskManager>) {
        self.managers.push(manager);
    }

    pub fn set_enabled(
        &mut self,
        kind: ManagerKind,
        enable: bool,
        params: ControlParams,
        world: &dyn WorldSource,
    ) {
        for (idx, manager) in self.managers.iter_mut().enumerate() {
            if manager.kind() != kind {
                continue;
            }
            if enable {
                manager.enable(params, world);
            } else {
                manager.disable();
                // Stopping a manager cancels its in-flight task.
                if let Some(in_flight) = &self.in_flight {
                    if in_flight.manager_idx == idx {
                        in_flight.token.cancel();
                    }
                }
            }
            return;
        }
        log::warn!("no {kind:?} manager registered");
    }

    pub fn is_enabled(&self, kind: ManagerKind) -> bool {
        self.managers
            .iter()
            .any(|m| m.kind() == kind && m.is_enabled())
    }

    pub fn offer_chunk(&mut self, coord: ChunkCoord) {
        for manager in self.managers.iter_mut() {
            manager.offer_chunk(coord);
        }
    }

    pub fn has_task_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn tasks_dispatched(&self) -> u64 {
        self.dispatched
    }

    pub fn tasks_completed(&self) -> u64 {
        self.completed
    }

    /// Foreground poll: report finished work back to its manager, then
    /// dispatch from the first enabled manager with work if the single
    /// in-flight slot is free.
    pub fn poll(&mut self, world: &dyn WorldSource) {
        while let Ok(result) = self.res_rx.try_recv() {
            self.in_flight = None;
            self.completed += 1;
            if let Some(manager) = self.managers.get_mut(result.manager_idx) {
                manager.task_done(&result.outcome, self.announcer.as_ref());
            }
        }
        if self.in_flight.is_some() {
            return;
        }
        self.live_dim.store(world.dimension().0, Ordering::Release);
        for idx in 0..self.managers.len() {
            if !self.managers[idx].is_enabled() {
                continue;
            }
            let Some(task) = self.managers[idx].next_task(world) else {
                continue;
            };
            let token = CancelToken::new();
            let job = Job {
                task,
                token: token.clone(),
                manager_idx: idx,
            };
            let Some(tx) = &self.job_tx else {
                return;
            };
            if tx.send(job).is_ok() {
                self.dispatched += 1;
                self.in_flight = Some(InFlight {
                    manager_idx: idx,
                    token,
                });
            }
            return;
        }
    }

    /// World or dimension changed: cancel the in-flight task cooperatively
    /// and retarget the live-dimension check. Callers also clear the tile
    /// and region caches.
    pub fn world_changed(&mut self, new_dim: DimensionId) {
        self.live_dim.store(new_dim.0, Ordering::Release);
        if let Some(in_flight) = &self.in_flight {
            in_flight.token.cancel();
        }
    }

    /// Stop accepting work and join the worker.
    pub fn shutdown(&mut self) {
        if let Some(in_flight) = &self.in_flight {
            in_flight.token.cancel();
        }
        self.job_tx = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Executor body. Never panics and never lets an error escape to the
/// foreground: per-chunk failures are skipped, task-level failures become a
/// `Failed` outcome the scheduler reports back to the owning manager.
fn run_task(
    task: &MappingTask,
    token: &CancelToken,
    live_dim: &AtomicI32,
    renderer: &ChunkRenderer,
    store: &RegionImageStore,
) -> TaskOutcome {
    let mut rendered = 0usize;
    let mut skipped = 0usize;
    let mut outcome = None;

    for snap in &task.snapshots {
        if token.is_cancelled() {
            outcome = Some(TaskOutcome::Cancelled);
            break;
        }
        if live_dim.load(Ordering::Acquire) != task.dim.0 {
            // The world moved on underneath us; a race, not an error.
            outcome = Some(TaskOutcome::Stale);
            break;
        }
        if snap.is_stale() {
            skipped += 1;
            continue;
        }
        match renderer.render(snap, task.pass) {
            Ok(img) => {
                store.insert_chunk(&img);
                rendered += 1;
            }
            Err(e) => {
                // Treated as missing for this chunk: skip and continue.
                log::debug!("chunk {:?} render failed: {e}", snap.coord());
                skipped += 1;
            }
        }
    }

    if task.flush_when_done {
        store.flush(true);
    }
    outcome.unwrap_or(TaskOutcome::Completed { rendered, skipped })
}
