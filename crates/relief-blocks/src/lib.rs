//! Block and biome registry crate.
#![forbid(unsafe_code)]

pub mod biome;
pub mod config;
pub mod registry;
pub mod types;

pub use biome::{BiomeCatalog, BiomeTint};
pub use registry::{BlockRegistry, BlockType};
pub use types::{Block, BlockId, BlockState, TintClass, format_hex_rgb, parse_hex_rgb};
