//! Incremental world-map rendering core.
//!
//! Renders a chunk-subdivided voxel world into a pannable, zoomable map:
//! per-chunk snapshots are rasterized in the background, aggregated into
//! persistent region images, and composited into short-lived display tiles.
//! The embedding application supplies the world/chunk access, texture
//! sampling, and draw-call collaborators; everything here stays off the
//! foreground render path for disk I/O.
//!
//! Construct one [`MapService`] per loaded world and drive it with
//! [`MapService::tick`] from the simulation loop.
#![forbid(unsafe_code)]

mod config;
mod service;

pub use config::{MapConfig, RevealShapeCfg};
pub use service::MapService;

pub use relief_blocks::{BiomeCatalog, Block, BlockRegistry};
pub use relief_chunk::{ChunkSnapshot, SnapshotBuilder};
pub use relief_palette::{ColorPalette, ColorSource, PaletteProvenance, ResolvedColor};
pub use relief_render::{ChunkImage, ChunkRenderer, RenderOptions, RenderPass};
pub use relief_store::{Announcer, LogAnnouncer, RegionImageKey, RegionImageStore};
pub use relief_tasks::{ManagerKind, TaskOutcome, WorldSource};
pub use relief_tiles::{GridRenderer, Tile, TileCache, TileId};
pub use relief_world::{ChunkCoord, DimensionId, MapLayer, RegionCoord, TileCoord};
