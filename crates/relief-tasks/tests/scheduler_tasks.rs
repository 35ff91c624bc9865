use std::cell::Cell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use relief_blocks::{BiomeCatalog, Block, BlockRegistry};
use relief_chunk::{ChunkSnapshot, SnapshotBuilder};
use relief_palette::{ColorPalette, ColorSource, PaletteProvenance, ResolvedColor};
use relief_render::{ChunkRenderer, RenderOptions};
use relief_store::{Announcer, RegionImageStore, region_path};
use relief_tasks::{
    AutomapManager, ControlParams, ManagerKind, ProximityConfig, ProximityManager, RevealShape,
    TaskManager, TaskScheduler, WorldSource,
};
use relief_world::{ChunkCoord, DimensionId, MapLayer, RegionCoord};

struct TestDir(PathBuf);

impl TestDir {
    fn new(tag: &str) -> Self {
        let path = std::env::temp_dir().join(format!("relief-tasks-{tag}-{}", std::process::id()));
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

#[derive(Default)]
struct RecordingAnnouncer(Mutex<Vec<String>>);

impl Announcer for RecordingAnnouncer {
    fn announce(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

/// Flat single-layer world; every listed chunk is loadable with the given
/// stamp.
struct TestWorld {
    dim: DimensionId,
    player: ChunkCoord,
    stamps: HashMap<ChunkCoord, u64>,
    regions: Vec<RegionCoord>,
    snapshot_calls: Cell<usize>,
}

impl TestWorld {
    fn with_loaded(coords: impl IntoIterator<Item = ChunkCoord>) -> Self {
        Self {
            dim: DimensionId::OVERWORLD,
            player: ChunkCoord::new(0, 0),
            stamps: coords.into_iter().map(|c| (c, 1)).collect(),
            regions: Vec::new(),
            snapshot_calls: Cell::new(0),
        }
    }

    fn make_snapshot(&self, coord: ChunkCoord) -> Arc<ChunkSnapshot> {
        let mut blocks = vec![Block::AIR; 16 * 16 * 16];
        for i in 0..(16 * 16) {
            blocks[i] = Block { id: 1, state: 0 };
        }
        Arc::new(
            SnapshotBuilder::new(coord, self.dim, *self.stamps.get(&coord).unwrap_or(&0))
                .heights(vec![0; 256])
                .section(0, blocks, vec![15; 16 * 16 * 16])
                .build(),
        )
    }
}

impl WorldSource for TestWorld {
    fn dimension(&self) -> DimensionId {
        self.dim
    }

    fn dimensions(&self) -> Vec<DimensionId> {
        vec![self.dim]
    }

    fn player_chunk(&self) -> ChunkCoord {
        self.player
    }

    fn player_underground(&self) -> Option<i32> {
        None
    }

    fn chunk_stamp(&self, coord: ChunkCoord) -> Option<u64> {
        self.stamps.get(&coord).copied()
    }

    fn snapshot(&self, coord: ChunkCoord) -> Option<Arc<ChunkSnapshot>> {
        if !self.stamps.contains_key(&coord) {
            return None;
        }
        self.snapshot_calls.set(self.snapshot_calls.get() + 1);
        Some(self.make_snapshot(coord))
    }

    fn regions_with_data(&self, _dim: DimensionId) -> Vec<RegionCoord> {
        self.regions.clone()
    }
}

struct FixedSource;

impl ColorSource for FixedSource {
    fn sample(&self, _block: Block) -> Option<ResolvedColor> {
        Some(ResolvedColor {
            rgb: [100, 110, 120],
            alpha: None,
        })
    }
}

fn renderer(dir: &TestDir) -> Arc<ChunkRenderer> {
    let registry = Arc::new(
        BlockRegistry::from_toml_str(
            r#"
            [[blocks]]
            name = "air"
            id = 0
            alpha = 0

            [[blocks]]
            name = "stone"
        "#,
        )
        .unwrap(),
    );
    let (palette, _) = ColorPalette::load_or_create(
        &dir.0.join("palette.json"),
        &dir.0.join("standard.json"),
        PaletteProvenance::default(),
        &registry,
    );
    Arc::new(ChunkRenderer::new(
        registry,
        Arc::new(BiomeCatalog::new()),
        Arc::new(palette),
        Arc::new(FixedSource),
        RenderOptions::default(),
    ))
}

fn store(dir: &TestDir) -> Arc<RegionImageStore> {
    RegionImageStore::new(
        dir.0.join("maps"),
        32,
        Duration::from_secs(3600),
        Arc::new(RecordingAnnouncer::default()),
    )
}

fn proximity(primary: i32, max: i32) -> ProximityManager {
    ProximityManager::new(ProximityConfig {
        primary_radius: primary,
        max_radius: max,
        shape: RevealShape::Square,
        max_priority_per_poll: 2,
        grace_polls: 2,
        always_map_surface: false,
        map_topography: false,
    })
}

#[test]
fn proximity_radius_one_produces_nine_sorted_candidates() {
    let mut manager = proximity(1, 1);
    let player = ChunkCoord::new(64, 64);
    let coords = manager.candidate_coords(player);
    assert_eq!(coords.len(), 9);
    assert_eq!(coords[0], player);
    let mut last = 0i64;
    for coord in &coords {
        let d = player.distance_sq(*coord);
        assert!(d >= last, "distances must ascend: {coords:?}");
        last = d;
    }
}

#[test]
fn proximity_reuses_snapshots_for_unchanged_chunks() {
    let mut world = TestWorld::with_loaded(
        (-2..=2).flat_map(|z| (-2..=2).map(move |x| ChunkCoord::new(x, z))),
    );
    let mut manager = proximity(1, 1);
    manager.enable(ControlParams::None, &world);

    let first = manager.next_task(&world).expect("task");
    assert_eq!(first.chunk_count(), 9);
    assert_eq!(world.snapshot_calls.get(), 9);

    // Unchanged stamps: the second poll re-uses every snapshot.
    let second = manager.next_task(&world).expect("task");
    assert_eq!(second.chunk_count(), 9);
    assert_eq!(world.snapshot_calls.get(), 9);

    // One chunk changes; only it is re-captured, and its old snapshot is
    // marked stale for whoever still holds it.
    let changed = ChunkCoord::new(1, 0);
    let old = first
        .snapshots
        .iter()
        .find(|s| s.coord() == changed)
        .unwrap()
        .clone();
    world.stamps.insert(changed, 2);
    let third = manager.next_task(&world).expect("task");
    assert_eq!(third.chunk_count(), 9);
    assert_eq!(world.snapshot_calls.get(), 10);
    assert!(old.is_stale());
}

#[test]
fn priority_chunks_drain_first_with_cap() {
    let world = TestWorld::with_loaded(
        (-8..=8).flat_map(|z| (-8..=8).map(move |x| ChunkCoord::new(x, z))),
    );
    let mut manager = proximity(1, 1);
    manager.enable(ControlParams::None, &world);
    manager.offer_chunk(ChunkCoord::new(7, 7));
    manager.offer_chunk(ChunkCoord::new(6, 6));
    manager.offer_chunk(ChunkCoord::new(5, 5));

    let coords = manager.candidate_coords(ChunkCoord::new(0, 0));
    // Cap is 2: the first two offered chunks lead, the third waits.
    assert_eq!(&coords[..2], &[ChunkCoord::new(7, 7), ChunkCoord::new(6, 6)]);
    let next = manager.candidate_coords(ChunkCoord::new(0, 0));
    assert_eq!(next[0], ChunkCoord::new(5, 5));
}

#[test]
fn scheduler_never_has_two_tasks_in_flight() {
    let dir = TestDir::new("inflight");
    let renderer = renderer(&dir);
    let store = store(&dir);
    let world = TestWorld::with_loaded(
        (-3..=3).flat_map(|z| (-3..=3).map(move |x| ChunkCoord::new(x, z))),
    );

    let mut scheduler = TaskScheduler::new(renderer, store, Arc::new(RecordingAnnouncer::default()));
    scheduler.register(Box::new(proximity(2, 2)));
    scheduler.set_enabled(ManagerKind::Proximity, true, ControlParams::None, &world);

    let deadline = Instant::now() + Duration::from_secs(10);
    while scheduler.tasks_completed() < 3 && Instant::now() < deadline {
        scheduler.poll(&world);
        assert!(
            scheduler.tasks_dispatched() - scheduler.tasks_completed() <= 1,
            "more than one mapping task in flight"
        );
        std::thread::sleep(Duration::from_millis(2));
    }
    assert!(scheduler.tasks_completed() >= 3, "worker made no progress");
    scheduler.shutdown();
}

#[test]
fn automap_four_regions_reports_progress_to_completion() {
    let dir = TestDir::new("automap");
    let renderer = renderer(&dir);
    let store = store(&dir);
    let announcer = Arc::new(RecordingAnnouncer::default());

    // Four discovered regions; one loadable chunk in each.
    let regions = vec![
        RegionCoord::new(0, 0),
        RegionCoord::new(1, 0),
        RegionCoord::new(0, 1),
        RegionCoord::new(-1, -1),
    ];
    let mut world = TestWorld::with_loaded(regions.iter().map(|r| r.min_chunk()));
    world.regions = regions.clone();

    let mut scheduler = TaskScheduler::new(renderer, store, announcer.clone());
    scheduler.register(Box::new(AutomapManager::new()));
    scheduler.set_enabled(
        ManagerKind::Automap,
        true,
        ControlParams::Automap { dim: Some(DimensionId::OVERWORLD) },
        &world,
    );

    let deadline = Instant::now() + Duration::from_secs(10);
    while scheduler.is_enabled(ManagerKind::Automap) && Instant::now() < deadline {
        scheduler.poll(&world);
        std::thread::sleep(Duration::from_millis(2));
    }
    assert!(!scheduler.is_enabled(ManagerKind::Automap), "automap never finished");
    assert_eq!(scheduler.tasks_dispatched(), 4);

    let messages = announcer.0.lock().unwrap().clone();
    for expected in ["25%", "50%", "75%", "100%"] {
        assert!(
            messages.iter().any(|m| m.contains(expected)),
            "missing {expected} in {messages:?}"
        );
    }
    assert!(messages.iter().any(|m| m.contains("finished")));

    // flush_when_done pushed each mapped region to disk.
    assert!(
        region_path(&dir.0.join("maps"), RegionCoord::new(0, 0), DimensionId::OVERWORLD, MapLayer::Day)
            .exists()
    );
    scheduler.shutdown();
}

#[test]
fn dimension_change_turns_task_stale_without_error() {
    let dir = TestDir::new("stale");
    let renderer = renderer(&dir);
    let store = store(&dir);
    let world = TestWorld::with_loaded(
        (-2..=2).flat_map(|z| (-2..=2).map(move |x| ChunkCoord::new(x, z))),
    );

    let mut scheduler = TaskScheduler::new(renderer, store, Arc::new(RecordingAnnouncer::default()));
    scheduler.register(Box::new(proximity(2, 2)));
    scheduler.set_enabled(ManagerKind::Proximity, true, ControlParams::None, &world);
    scheduler.poll(&world);
    assert!(scheduler.has_task_in_flight() || scheduler.tasks_completed() > 0);

    // Switching dimensions cancels cooperatively; the scheduler keeps
    // polling without surfacing any error. Disable the manager so no new
    // work is dispatched while we wait for the slot to clear.
    scheduler.world_changed(DimensionId(1));
    scheduler.set_enabled(ManagerKind::Proximity, false, ControlParams::None, &world);
    let deadline = Instant::now() + Duration::from_secs(5);
    while scheduler.has_task_in_flight() && Instant::now() < deadline {
        scheduler.poll(&world);
        std::thread::sleep(Duration::from_millis(2));
    }
    assert!(!scheduler.has_task_in_flight());
    scheduler.shutdown();
}
