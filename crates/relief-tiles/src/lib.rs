//! Ephemeral display tiles: a time-bounded cache over the region store and
//! the grid arrangement used for on-screen composition.
#![forbid(unsafe_code)]

mod cache;
mod grid;
mod tile;

pub use cache::TileCache;
pub use grid::GridRenderer;
pub use tile::{Tile, TileId};
