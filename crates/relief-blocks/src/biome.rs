use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use crate::config::BiomesConfig;
use crate::types::{TintClass, parse_hex_rgb};

/// Multiplier colors for one biome. Identity (white) channels mean "no tint".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BiomeTint {
    pub grass: [u8; 3],
    pub foliage: [u8; 3],
    pub water: [u8; 3],
}

pub const IDENTITY_TINT: BiomeTint = BiomeTint {
    grass: [255, 255, 255],
    foliage: [255, 255, 255],
    water: [255, 255, 255],
};

impl Default for BiomeTint {
    fn default() -> Self {
        IDENTITY_TINT
    }
}

impl BiomeTint {
    /// Multiplier for a tint class; crops share the foliage channel.
    #[inline]
    pub fn for_class(&self, class: TintClass) -> [u8; 3] {
        match class {
            TintClass::Grass => self.grass,
            TintClass::Foliage | TintClass::Crop => self.foliage,
            TintClass::Water => self.water,
            TintClass::None => [255, 255, 255],
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct BiomeCatalog {
    tints: HashMap<u16, BiomeTint>,
    names: HashMap<u16, String>,
}

impl BiomeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tint for a biome id; unknown biomes get identity multipliers.
    #[inline]
    pub fn tint(&self, biome_id: u16) -> BiomeTint {
        self.tints.get(&biome_id).copied().unwrap_or(IDENTITY_TINT)
    }

    pub fn name(&self, biome_id: u16) -> Option<&str> {
        self.names.get(&biome_id).map(|s| s.as_str())
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: BiomesConfig = toml::from_str(toml_str)?;
        let mut catalog = BiomeCatalog::new();
        // HashMap iteration order is nondeterministic; sort keys so conflicts
        // resolve the same way every load.
        let mut entries: Vec<_> = cfg.biomes.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, def) in entries {
            let parse = |field: &Option<String>, what: &str| -> [u8; 3] {
                match field {
                    Some(s) => parse_hex_rgb(s).unwrap_or_else(|| {
                        log::warn!("biome '{name}': bad {what} color '{s}', using identity");
                        [255, 255, 255]
                    }),
                    None => [255, 255, 255],
                }
            };
            let tint = BiomeTint {
                grass: parse(&def.grass, "grass"),
                foliage: parse(&def.foliage, "foliage"),
                water: parse(&def.water, "water"),
            };
            catalog.tints.insert(def.id, tint);
            catalog.names.insert(def.id, name);
        }
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_falls_back() {
        let catalog = BiomeCatalog::from_toml_str(
            r##"
            [biomes.plains]
            id = 1
            grass = "#91bd59"

            [biomes.swamp]
            id = 6
            grass = "#6a7039"
            foliage = "#6a7039"
            water = "#617b64"
        "##,
        )
        .unwrap();
        assert_eq!(catalog.tint(1).grass, [0x91, 0xbd, 0x59]);
        assert_eq!(catalog.tint(1).water, [255, 255, 255]);
        assert_eq!(catalog.tint(99), IDENTITY_TINT);
        assert_eq!(catalog.name(6), Some("swamp"));
    }

    #[test]
    fn crop_shares_foliage_channel() {
        let tint = BiomeTint {
            grass: [1, 2, 3],
            foliage: [4, 5, 6],
            water: [7, 8, 9],
        };
        assert_eq!(tint.for_class(TintClass::Crop), tint.for_class(TintClass::Foliage));
        assert_eq!(tint.for_class(TintClass::None), [255, 255, 255]);
    }
}
