use serde::{Deserialize, Serialize};

/// A named, independent world layer (overworld, nether, ...).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DimensionId(pub i32);

impl DimensionId {
    pub const OVERWORLD: DimensionId = DimensionId(0);

    /// On-disk directory name for this dimension's map data.
    pub fn dir_name(self) -> String {
        format!("DIM{}", self.0)
    }
}

impl std::fmt::Display for DimensionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DIM{}", self.0)
    }
}

/// One persisted map variant. The underground variant carries its vertical
/// slice so a single value keys palettes, region files, and tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapLayer {
    Day,
    Night,
    Topo,
    Underground { slice: i32 },
}

impl MapLayer {
    #[inline]
    pub fn is_surface(self) -> bool {
        matches!(self, MapLayer::Day | MapLayer::Night)
    }

    #[inline]
    pub fn is_underground(self) -> bool {
        matches!(self, MapLayer::Underground { .. })
    }

    #[inline]
    pub fn slice(self) -> Option<i32> {
        match self {
            MapLayer::Underground { slice } => Some(slice),
            _ => None,
        }
    }

    /// Per-layer subdirectory under a dimension's map directory.
    pub fn dir_name(self) -> String {
        match self {
            MapLayer::Day => "day".to_string(),
            MapLayer::Night => "night".to_string(),
            MapLayer::Topo => "topo".to_string(),
            MapLayer::Underground { slice } => format!("underground/{slice}"),
        }
    }
}

impl std::fmt::Display for MapLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapLayer::Day => write!(f, "day"),
            MapLayer::Night => write!(f, "night"),
            MapLayer::Topo => write!(f, "topo"),
            MapLayer::Underground { slice } => write!(f, "underground[{slice}]"),
        }
    }
}
