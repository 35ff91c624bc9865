use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use crate::config::{BlockDef, BlocksConfig};
use crate::types::{Block, BlockId, TintClass};

/// Compiled per-block attributes the renderer consults per column.
#[derive(Clone, Debug)]
pub struct BlockType {
    pub id: BlockId,
    pub name: String,
    pub display_name: Option<String>,
    pub alpha: u8,
    pub tint: TintClass,
    pub surface: bool,
    pub topo_relevant: bool,
}

impl BlockType {
    fn placeholder(id: BlockId) -> Self {
        BlockType {
            id,
            name: String::new(),
            display_name: None,
            alpha: 255,
            tint: TintClass::None,
            surface: false,
            topo_relevant: false,
        }
    }

    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.alpha == 255
    }

    #[inline]
    pub fn is_translucent(&self) -> bool {
        self.alpha > 0 && self.alpha < 255
    }
}

#[derive(Default, Clone, Debug)]
pub struct BlockRegistry {
    pub blocks: Vec<BlockType>,
    pub by_name: HashMap<String, BlockId>,
    pub unknown_block_id: Option<BlockId>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            by_name: HashMap::new(),
            unknown_block_id: None,
        }
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> Option<&BlockType> {
        self.blocks.get(id as usize)
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    /// Name used in palette files and reports; stable for unconfigured ids.
    pub fn name_of(&self, id: BlockId) -> String {
        match self.get(id) {
            Some(ty) if !ty.name.is_empty() => ty.name.clone(),
            _ => format!("block:{id}"),
        }
    }

    pub fn load_from_path(blocks_path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let blocks_toml = fs::read_to_string(blocks_path)?;
        Self::from_toml_str(&blocks_toml)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: BlocksConfig = toml::from_str(toml_str)?;
        Self::from_config(cfg)
    }

    pub fn from_config(cfg: BlocksConfig) -> Result<Self, Box<dyn Error>> {
        let mut reg = BlockRegistry::new();
        let unknown_name = cfg.unknown_block.clone();
        for def in cfg.blocks.into_iter() {
            let BlockDef {
                name,
                id,
                alpha,
                tint,
                surface,
                topo_relevant,
                display_name,
            } = def;
            let id = id.unwrap_or(reg.blocks.len() as u16);
            let ty = BlockType {
                id,
                name,
                display_name,
                alpha: alpha.unwrap_or(255),
                tint: tint.unwrap_or_default(),
                // Air (id 0) never terminates a column scan.
                surface: surface.unwrap_or(id != 0),
                topo_relevant: topo_relevant.unwrap_or(id != 0),
            };
            if reg.blocks.len() <= id as usize {
                reg.blocks.resize(id as usize + 1, BlockType::placeholder(id));
            }
            reg.blocks[id as usize] = ty;
        }
        reg.by_name = reg
            .blocks
            .iter()
            .filter(|t| !t.name.is_empty())
            .map(|t| (t.name.clone(), t.id))
            .collect();
        if let Some(name) = unknown_name {
            reg.unknown_block_id = reg.id_by_name(&name);
            if reg.unknown_block_id.is_none() {
                log::warn!("unknown_block '{name}' is not defined in blocks config");
            }
        }
        Ok(reg)
    }

    pub fn make_block_by_name(&self, name: &str) -> Option<Block> {
        let id = self.id_by_name(name)?;
        Some(Block { id, state: 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CFG: &str = r#"
        unknown_block = "stone"

        [[blocks]]
        name = "air"
        id = 0
        alpha = 0

        [[blocks]]
        name = "stone"

        [[blocks]]
        name = "water"
        alpha = 160
        tint = "water"

        [[blocks]]
        name = "tall_grass"
        alpha = 0
        tint = "grass"
        surface = false
    "#;

    #[test]
    fn ids_assigned_in_declaration_order() {
        let reg = BlockRegistry::from_toml_str(CFG).expect("registry");
        assert_eq!(reg.id_by_name("air"), Some(0));
        assert_eq!(reg.id_by_name("stone"), Some(1));
        assert_eq!(reg.id_by_name("water"), Some(2));
        assert_eq!(reg.unknown_block_id, Some(1));
    }

    #[test]
    fn compiled_flags() {
        let reg = BlockRegistry::from_toml_str(CFG).expect("registry");
        let water = reg.get(reg.id_by_name("water").unwrap()).unwrap();
        assert!(water.is_translucent());
        assert_eq!(water.tint, TintClass::Water);
        let air = reg.get(0).unwrap();
        assert!(!air.surface);
        let grass = reg.get(reg.id_by_name("tall_grass").unwrap()).unwrap();
        assert!(!grass.surface);
    }

    #[test]
    fn name_of_falls_back_for_unconfigured_ids() {
        let reg = BlockRegistry::from_toml_str(CFG).expect("registry");
        assert_eq!(reg.name_of(1), "stone");
        assert_eq!(reg.name_of(999), "block:999");
    }
}
