//! Pure chunk rendering: one snapshot in, one colored raster out.
#![forbid(unsafe_code)]

mod chunk_image;
pub mod tint;

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use relief_blocks::{BiomeCatalog, BiomeTint, BlockRegistry};
use relief_chunk::{CHUNK_SIZE, ChunkSnapshot, SECTION_HEIGHT, WORLD_HEIGHT};
use relief_palette::{ColorPalette, ColorSource};
use relief_world::CHUNK_PIXELS;

pub use crate::chunk_image::{ChunkImage, ChunkPixels};
pub use crate::tint::{TintRegistry, TintRule};

/// One render pass. A surface pass emits day and night together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderPass {
    Surface,
    Underground { slice: i32 },
    Topo,
}

impl fmt::Display for RenderPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderPass::Surface => write!(f, "surface"),
            RenderPass::Underground { slice } => write!(f, "underground[{slice}]"),
            RenderPass::Topo => write!(f, "topo"),
        }
    }
}

#[derive(Debug)]
pub enum RenderError {
    /// Snapshot has no populated sections; nothing to draw.
    EmptyChunk,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::EmptyChunk => write!(f, "chunk snapshot has no populated sections"),
        }
    }
}

impl Error for RenderError {}

/// Color used for a column whose block color could not be resolved. One bad
/// column never discards the other 255.
pub const NEUTRAL_COLOR: [u8; 3] = [0x7f, 0x7f, 0x7f];

#[derive(Clone, Debug)]
pub struct RenderOptions {
    /// Slope-based light/dark bevel on surface and topo layers.
    pub shading: bool,
    /// Attenuate underground colors by stored block light.
    pub cave_lighting: bool,
    /// Block-height covered by one topo elevation band.
    pub topo_band_span: i32,
    /// Elevation band colors, low to high.
    pub topo_bands: Vec<[u8; 3]>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            shading: true,
            cave_lighting: true,
            topo_band_span: 16,
            topo_bands: vec![
                [0x31, 0x4f, 0x3a],
                [0x3d, 0x63, 0x42],
                [0x4c, 0x77, 0x48],
                [0x62, 0x8a, 0x51],
                [0x7d, 0x9c, 0x5c],
                [0x9c, 0xa8, 0x6b],
                [0xb5, 0xa8, 0x78],
                [0xc2, 0x9d, 0x76],
                [0xc4, 0x8d, 0x6e],
                [0xbd, 0x7f, 0x6a],
                [0xb3, 0x77, 0x70],
                [0xb5, 0x85, 0x85],
                [0xc2, 0x9e, 0x9e],
                [0xd1, 0xbc, 0xbc],
                [0xe3, 0xda, 0xda],
                [0xf4, 0xf2, 0xf2],
            ],
        }
    }
}

/// Renders chunk snapshots into colored rasters. Pure with respect to its
/// inputs except that color lookups may populate the palette.
pub struct ChunkRenderer {
    registry: Arc<BlockRegistry>,
    biomes: Arc<BiomeCatalog>,
    palette: Arc<ColorPalette>,
    source: Arc<dyn ColorSource>,
    tints: TintRegistry,
    opts: RenderOptions,
}

impl ChunkRenderer {
    pub fn new(
        registry: Arc<BlockRegistry>,
        biomes: Arc<BiomeCatalog>,
        palette: Arc<ColorPalette>,
        source: Arc<dyn ColorSource>,
        opts: RenderOptions,
    ) -> Self {
        Self {
            registry,
            biomes,
            palette,
            source,
            tints: TintRegistry::standard(),
            opts,
        }
    }

    pub fn with_tints(mut self, tints: TintRegistry) -> Self {
        self.tints = tints;
        self
    }

    pub fn palette(&self) -> &Arc<ColorPalette> {
        &self.palette
    }

    pub fn render(&self, snap: &ChunkSnapshot, pass: RenderPass) -> Result<ChunkImage, RenderError> {
        if !snap.has_any_section() {
            return Err(RenderError::EmptyChunk);
        }
        match pass {
            RenderPass::Surface => Ok(self.render_surface(snap)),
            RenderPass::Underground { slice } => Ok(self.render_underground(snap, slice)),
            RenderPass::Topo => Ok(self.render_topo(snap)),
        }
    }

    fn render_surface(&self, snap: &ChunkSnapshot) -> ChunkImage {
        let mut img = RgbaImage::new(CHUNK_PIXELS, CHUNK_PIXELS * 2);
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let (day, night) = self.surface_column(snap, x, z);
                img.put_pixel(x as u32, z as u32, Rgba([day[0], day[1], day[2], 255]));
                img.put_pixel(
                    x as u32,
                    (z + CHUNK_SIZE) as u32,
                    Rgba([night[0], night[1], night[2], 255]),
                );
            }
        }
        ChunkImage::surface(snap.coord(), snap.dimension(), img)
    }

    /// Day and night colors for one column: top-strata scan, translucent
    /// "over" compositing, biome tint, slope bevel, light attenuation.
    fn surface_column(&self, snap: &ChunkSnapshot, x: usize, z: usize) -> ([u8; 3], [u8; 3]) {
        let biome_tint = self.biomes.tint(snap.biome(x, z));
        let top = snap.height(x, z).min(WORLD_HEIGHT - 1);

        // Walk down collecting translucent strata until an opaque floor.
        let mut strata: Vec<([u8; 3], u8)> = Vec::new();
        let mut base: Option<[u8; 3]> = None;
        let mut surface_y = top;
        let mut failed = false;
        for y in (0..=top).rev() {
            let block = snap.block(x, y, z);
            if block.is_air() {
                continue;
            }
            let Some(ty) = self.registry.get(block.id) else {
                failed = true;
                break;
            };
            if !ty.surface || ty.alpha == 0 {
                continue;
            }
            let name = self.registry.name_of(block.id);
            let Some(entry) = self.palette.resolve(block, &name, self.source.as_ref()) else {
                failed = true;
                break;
            };
            let rgb = self.tints.apply(ty, entry.rgb, &biome_tint);
            let alpha = entry.alpha.unwrap_or(ty.alpha);
            if strata.is_empty() {
                surface_y = y;
            }
            if alpha < 255 {
                strata.push((rgb, alpha));
                continue;
            }
            base = Some(rgb);
            break;
        }

        let day = if failed {
            log::debug!(
                "column ({x},{z}) of {:?}: color unresolved, using placeholder",
                snap.coord()
            );
            NEUTRAL_COLOR
        } else {
            let mut acc = base.unwrap_or(NEUTRAL_COLOR);
            // Strata were collected top-down; blend bottom-up so the topmost
            // layer is applied last.
            for (rgb, alpha) in strata.iter().rev() {
                acc = over(*rgb, *alpha, acc);
            }
            if self.opts.shading {
                scale(acc, self.slope_factor(snap, x, z))
            } else {
                acc
            }
        };

        let light = snap.light(x, (surface_y + 1).min(WORLD_HEIGHT - 1), z);
        let night = scale(day, night_factor(light));
        (day, night)
    }

    fn render_underground(&self, snap: &ChunkSnapshot, slice: i32) -> ChunkImage {
        let y_max = ((slice + 1) * SECTION_HEIGHT as i32 - 1).clamp(0, WORLD_HEIGHT - 1);
        let y_min = (slice * SECTION_HEIGHT as i32).clamp(0, WORLD_HEIGHT - 1);

        // First pass: the highest in-band floor (a block with air above it)
        // per column, so shading can use floor deltas.
        let mut floors = [[None::<i32>; CHUNK_SIZE]; CHUNK_SIZE];
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                for y in (y_min..=y_max).rev() {
                    if !snap.block(x, y, z).is_air() && snap.block(x, y + 1, z).is_air() {
                        floors[z][x] = Some(y);
                        break;
                    }
                }
            }
        }

        let mut img = RgbaImage::new(CHUNK_PIXELS, CHUNK_PIXELS);
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let pixel = match floors[z][x] {
                    None => Rgba([0, 0, 0, 0]),
                    Some(y) => {
                        let block = snap.block(x, y, z);
                        let biome_tint = self.biomes.tint(snap.biome(x, z));
                        let rgb = self
                            .column_color(block, &biome_tint)
                            .unwrap_or(NEUTRAL_COLOR);
                        let rgb = if self.opts.cave_lighting {
                            scale(rgb, cave_factor(snap.light(x, y + 1, z)))
                        } else {
                            rgb
                        };
                        Rgba([rgb[0], rgb[1], rgb[2], 255])
                    }
                };
                img.put_pixel(x as u32, z as u32, pixel);
            }
        }
        ChunkImage::flat(
            snap.coord(),
            snap.dimension(),
            relief_world::MapLayer::Underground { slice },
            img,
        )
    }

    fn render_topo(&self, snap: &ChunkSnapshot) -> ChunkImage {
        let span = self.opts.topo_band_span.max(1);
        let fallback = [NEUTRAL_COLOR];
        let bands: &[[u8; 3]] = if self.opts.topo_bands.is_empty() {
            &fallback
        } else {
            &self.opts.topo_bands
        };
        let band_of = |h: i32| -> usize { ((h.max(0) / span) as usize).min(bands.len() - 1) };

        let mut img = RgbaImage::new(CHUNK_PIXELS, CHUNK_PIXELS);
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let h = self.topo_height(snap, x, z);
                let band = band_of(h);
                let mut rgb = bands[band];
                let hw = self.topo_height(snap, x.saturating_sub(1), z);
                let hn = self.topo_height(snap, x, z.saturating_sub(1));
                if band_of(hw) != band || band_of(hn) != band {
                    // Contour line between bands.
                    rgb = scale(rgb, 0.6);
                } else if self.opts.shading {
                    rgb = scale(rgb, self.slope_factor(snap, x, z));
                }
                img.put_pixel(x as u32, z as u32, Rgba([rgb[0], rgb[1], rgb[2], 255]));
            }
        }
        ChunkImage::flat(
            snap.coord(),
            snap.dimension(),
            relief_world::MapLayer::Topo,
            img,
        )
    }

    /// Height of the topmost topo-relevant block; water and scatter don't
    /// create phantom cliffs.
    fn topo_height(&self, snap: &ChunkSnapshot, x: usize, z: usize) -> i32 {
        let top = snap.height(x, z).min(WORLD_HEIGHT - 1);
        for y in (0..=top).rev() {
            let block = snap.block(x, y, z);
            if block.is_air() {
                continue;
            }
            match self.registry.get(block.id) {
                Some(ty) if ty.topo_relevant => return y,
                Some(_) => continue,
                None => return y,
            }
        }
        0
    }

    fn column_color(&self, block: relief_blocks::Block, biome_tint: &BiomeTint) -> Option<[u8; 3]> {
        let ty = self.registry.get(block.id)?;
        let name = self.registry.name_of(block.id);
        let entry = self.palette.resolve(block, &name, self.source.as_ref())?;
        Some(self.tints.apply(ty, entry.rgb, biome_tint))
    }

    /// Light/dark bevel from west and north height deltas, clamped so a
    /// cliff doesn't blow out the color.
    fn slope_factor(&self, snap: &ChunkSnapshot, x: usize, z: usize) -> f32 {
        let h = snap.height(x, z);
        // Columns on the chunk's west/north edge compare against themselves.
        let hw = snap.height(x.saturating_sub(1), z);
        let hn = snap.height(x, z.saturating_sub(1));
        let delta = (h - hw) + (h - hn);
        (1.0 + 0.06 * delta as f32).clamp(0.7, 1.3)
    }
}

#[inline]
fn over(top: [u8; 3], alpha: u8, under: [u8; 3]) -> [u8; 3] {
    let a = u16::from(alpha);
    let blend = |t: u8, u: u8| -> u8 {
        ((u16::from(t) * a + u16::from(u) * (255 - a)) / 255) as u8
    };
    [
        blend(top[0], under[0]),
        blend(top[1], under[1]),
        blend(top[2], under[2]),
    ]
}

#[inline]
fn scale(rgb: [u8; 3], factor: f32) -> [u8; 3] {
    let apply = |c: u8| -> u8 { (f32::from(c) * factor).round().clamp(0.0, 255.0) as u8 };
    [apply(rgb[0]), apply(rgb[1]), apply(rgb[2])]
}

/// Moonlight floor plus block-light contribution.
#[inline]
fn night_factor(light: u8) -> f32 {
    0.18 + 0.82 * f32::from(light.min(15)) / 15.0
}

#[inline]
fn cave_factor(light: u8) -> f32 {
    0.10 + 0.90 * f32::from(light.min(15)) / 15.0
}
