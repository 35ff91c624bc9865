use serde::Deserialize;
use std::collections::HashMap;

use crate::types::TintClass;

// Top-level blocks config file
#[derive(Deserialize, Debug)]
pub struct BlocksConfig {
    pub blocks: Vec<BlockDef>,
    // Optional name of a block used as the fallback when a requested block
    // is unavailable. If absent or not found, fallbacks use `air`.
    #[serde(default)]
    pub unknown_block: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BlockDef {
    pub name: String,
    #[serde(default)]
    pub id: Option<u16>,
    // 0 = fully transparent, 255 = opaque. Default opaque.
    #[serde(default)]
    pub alpha: Option<u8>,
    #[serde(default)]
    pub tint: Option<TintClass>,
    // Whether the block terminates a surface column scan.
    #[serde(default)]
    pub surface: Option<bool>,
    // Whether the block counts toward topographic elevation.
    #[serde(default)]
    pub topo_relevant: Option<bool>,
    #[serde(default)]
    pub display_name: Option<String>,
}

// Top-level biomes config file
#[derive(Deserialize, Debug)]
pub struct BiomesConfig {
    pub biomes: HashMap<String, BiomeDef>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BiomeDef {
    pub id: u16,
    // Multiplier colors as "#rrggbb"; identity when absent.
    #[serde(default)]
    pub grass: Option<String>,
    #[serde(default)]
    pub foliage: Option<String>,
    #[serde(default)]
    pub water: Option<String>,
}
