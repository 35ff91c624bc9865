use relief_blocks::{BiomeTint, BlockType, TintClass};

pub type TintPredicate = fn(&BlockType) -> bool;
pub type TintApply = fn([u8; 3], &BiomeTint) -> [u8; 3];

/// One biome-driven color override.
pub struct TintRule {
    pub name: &'static str,
    pub applies: TintPredicate,
    pub apply: TintApply,
}

/// Ordered (predicate, override) pairs; the first matching rule wins.
pub struct TintRegistry {
    rules: Vec<TintRule>,
}

#[inline]
fn multiply(rgb: [u8; 3], mult: [u8; 3]) -> [u8; 3] {
    [
        ((u16::from(rgb[0]) * u16::from(mult[0])) / 255) as u8,
        ((u16::from(rgb[1]) * u16::from(mult[1])) / 255) as u8,
        ((u16::from(rgb[2]) * u16::from(mult[2])) / 255) as u8,
    ]
}

impl TintRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The stock grass/foliage/crop/water rules, in that order.
    pub fn standard() -> Self {
        let mut reg = Self::new();
        reg.register(TintRule {
            name: "grass",
            applies: |ty| ty.tint == TintClass::Grass,
            apply: |rgb, tint| multiply(rgb, tint.for_class(TintClass::Grass)),
        });
        reg.register(TintRule {
            name: "foliage",
            applies: |ty| ty.tint == TintClass::Foliage,
            apply: |rgb, tint| multiply(rgb, tint.for_class(TintClass::Foliage)),
        });
        reg.register(TintRule {
            name: "crop",
            applies: |ty| ty.tint == TintClass::Crop,
            apply: |rgb, tint| multiply(rgb, tint.for_class(TintClass::Crop)),
        });
        reg.register(TintRule {
            name: "water",
            applies: |ty| ty.tint == TintClass::Water,
            apply: |rgb, tint| multiply(rgb, tint.for_class(TintClass::Water)),
        });
        reg
    }

    pub fn register(&mut self, rule: TintRule) {
        self.rules.push(rule);
    }

    /// Apply the first matching rule, or return the color untouched.
    pub fn apply(&self, ty: &BlockType, rgb: [u8; 3], tint: &BiomeTint) -> [u8; 3] {
        for rule in &self.rules {
            if (rule.applies)(ty) {
                return (rule.apply)(rgb, tint);
            }
        }
        rgb
    }
}

impl Default for TintRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
