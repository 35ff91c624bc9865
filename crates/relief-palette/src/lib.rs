//! Persistent block-color palette: versioned, file-backed, lazily populated
//! from a texture-sampling collaborator.
#![forbid(unsafe_code)]

mod file;

use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use relief_blocks::{Block, BlockId, BlockRegistry, BlockState, format_hex_rgb, parse_hex_rgb};

use crate::file::{EntryJson, PaletteFile};

/// Bumped whenever the derivation algorithm or file format changes in a way
/// that invalidates stored colors. Older files are archived, never upgraded.
pub const PALETTE_VERSION: u32 = 3;

/// Flat composite key: one entry per (block type, variant).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey {
    pub id: BlockId,
    pub variant: BlockState,
}

impl BlockKey {
    #[inline]
    pub fn of(block: Block) -> Self {
        Self {
            id: block.id,
            variant: block.state,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaletteEntry {
    pub rgb: [u8; 3],
    pub alpha: Option<u8>,
    /// Human-readable block name recorded at derivation time.
    pub name: String,
}

/// Color produced by the texture-sampling collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedColor {
    pub rgb: [u8; 3],
    pub alpha: Option<u8>,
}

/// Texture/color-source collaborator; safe to call from the background
/// thread. `None` means derivation failed and the lookup should be retried
/// on a later encounter.
pub trait ColorSource: Send + Sync {
    fn sample(&self, block: Block) -> Option<ResolvedColor>;
}

/// Identifies which textures and content packs a palette was derived from.
/// A mismatch on load forces a full rebuild.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaletteProvenance {
    pub texture_fingerprint: String,
    pub pack_fingerprint: String,
}

/// Where the active palette came from on startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaletteOrigin {
    WorldFile,
    StandardFile,
    Fresh,
}

struct PaletteState {
    entries: HashMap<BlockKey, PaletteEntry>,
    dirty: bool,
}

pub struct ColorPalette {
    inner: RwLock<PaletteState>,
    path: PathBuf,
    report_path: PathBuf,
    provenance: PaletteProvenance,
    generated: String,
}

impl ColorPalette {
    /// Select and load the active palette: the world-specific file if it is
    /// usable, else the shared standard file, else a fresh empty palette.
    /// Files with an older format version are archived (renamed with a
    /// version suffix) and discarded.
    pub fn load_or_create(
        world_file: &Path,
        standard_file: &Path,
        provenance: PaletteProvenance,
        registry: &BlockRegistry,
    ) -> (Self, PaletteOrigin) {
        let mut origin = PaletteOrigin::Fresh;
        let mut entries = HashMap::new();

        for (candidate, candidate_origin) in [
            (world_file, PaletteOrigin::WorldFile),
            (standard_file, PaletteOrigin::StandardFile),
        ] {
            match Self::try_load(candidate, &provenance, registry) {
                LoadResult::Loaded(map) => {
                    entries = map;
                    origin = candidate_origin;
                    break;
                }
                LoadResult::Unusable | LoadResult::Absent => {}
            }
        }

        let palette = Self {
            inner: RwLock::new(PaletteState {
                entries,
                dirty: false,
            }),
            path: world_file.to_path_buf(),
            report_path: world_file.with_extension("report.txt"),
            generated: format!("relief palette format v{PALETTE_VERSION}"),
            provenance,
        };
        (palette, origin)
    }

    fn try_load(
        path: &Path,
        provenance: &PaletteProvenance,
        registry: &BlockRegistry,
    ) -> LoadResult {
        let json = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(_) => return LoadResult::Absent,
        };
        let parsed: PaletteFile = match serde_json::from_str(&json) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("palette {}: unreadable ({e}), ignoring", path.display());
                return LoadResult::Unusable;
            }
        };
        if parsed.version < PALETTE_VERSION {
            // Obsolete format: archive under a version suffix, never upgrade
            // in place.
            let archived = archive_path(path, parsed.version);
            log::warn!(
                "palette {} has obsolete version {} (need {PALETTE_VERSION}); archiving to {}",
                path.display(),
                parsed.version,
                archived.display()
            );
            if let Err(e) = fs::rename(path, &archived) {
                log::warn!("couldn't archive palette {}: {e}", path.display());
            }
            return LoadResult::Unusable;
        }
        if parsed.version > PALETTE_VERSION {
            log::warn!(
                "palette {} is from a newer format ({}), ignoring",
                path.display(),
                parsed.version
            );
            return LoadResult::Unusable;
        }
        if parsed.texture_fingerprint != provenance.texture_fingerprint
            || parsed.pack_fingerprint != provenance.pack_fingerprint
        {
            log::info!(
                "palette {} was derived from different textures; forcing rebuild",
                path.display()
            );
            return LoadResult::Unusable;
        }

        let mut entries = HashMap::new();
        for (name, variants) in parsed.blocks {
            let Some(id) = registry.id_by_name(&name) else {
                log::debug!("palette entry for unknown block '{name}' skipped");
                continue;
            };
            for (variant_str, entry) in variants {
                let Ok(variant) = variant_str.parse::<BlockState>() else {
                    log::debug!("palette entry {name}[{variant_str}]: bad variant key");
                    continue;
                };
                let Some(rgb) = parse_hex_rgb(&entry.color) else {
                    log::debug!("palette entry {name}[{variant}]: bad color '{}'", entry.color);
                    continue;
                };
                entries.insert(
                    BlockKey { id, variant },
                    PaletteEntry {
                        rgb,
                        alpha: entry.alpha,
                        name: name.clone(),
                    },
                );
            }
        }
        LoadResult::Loaded(entries)
    }

    /// Resolved color for a block, deriving and recording it on first
    /// encounter. Failed derivation caches nothing so it is retried later.
    pub fn resolve(
        &self,
        block: Block,
        name: &str,
        source: &dyn ColorSource,
    ) -> Option<PaletteEntry> {
        let key = BlockKey::of(block);
        {
            let state = self.inner.read().unwrap();
            if let Some(entry) = state.entries.get(&key) {
                return Some(entry.clone());
            }
        }
        let derived = source.sample(block)?;
        let entry = PaletteEntry {
            rgb: derived.rgb,
            alpha: derived.alpha,
            name: name.to_string(),
        };
        let mut state = self.inner.write().unwrap();
        // Re-check: another thread may have derived the same key between the
        // read unlock and here. First writer wins; entries are append-only.
        if let Some(existing) = state.entries.get(&key) {
            return Some(existing.clone());
        }
        state.entries.insert(key, entry.clone());
        state.dirty = true;
        Some(entry)
    }

    pub fn get(&self, key: BlockKey) -> Option<PaletteEntry> {
        self.inner.read().unwrap().entries.get(&key).cloned()
    }

    /// Record an entry directly. Existing entries are never overwritten;
    /// returns whether the entry was inserted.
    pub fn upsert(&self, key: BlockKey, rgb: [u8; 3], alpha: Option<u8>, name: &str) -> bool {
        let mut state = self.inner.write().unwrap();
        if state.entries.contains_key(&key) {
            return false;
        }
        state.entries.insert(
            key,
            PaletteEntry {
                rgb,
                alpha,
                name: name.to_string(),
            },
        );
        state.dirty = true;
        true
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.read().unwrap().dirty
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries for an operator-forced rebuild. The cleared palette
    /// is dirty so the empty state reaches disk.
    pub fn clear_for_rebuild(&self) {
        let mut state = self.inner.write().unwrap();
        state.entries.clear();
        state.dirty = true;
    }

    /// Write the palette JSON and its companion report, then clear the dirty
    /// flag. Keys are written sorted so output is deterministic.
    pub fn persist(&self) -> Result<(), Box<dyn Error>> {
        let (blocks, report) = {
            let state = self.inner.read().unwrap();
            let mut blocks: BTreeMap<String, BTreeMap<String, EntryJson>> = BTreeMap::new();
            let mut sorted: Vec<(&BlockKey, &PaletteEntry)> = state.entries.iter().collect();
            sorted.sort_by_key(|(k, _)| **k);
            let mut report = String::new();
            for (key, entry) in sorted {
                blocks.entry(entry.name.clone()).or_default().insert(
                    key.variant.to_string(),
                    EntryJson {
                        color: format_hex_rgb(entry.rgb),
                        alpha: entry.alpha,
                    },
                );
                report.push_str(&format!(
                    "{}[{}] {} alpha={}\n",
                    entry.name,
                    key.variant,
                    format_hex_rgb(entry.rgb),
                    entry.alpha.unwrap_or(255)
                ));
            }
            (blocks, report)
        };

        let doc = PaletteFile {
            version: PALETTE_VERSION,
            texture_fingerprint: self.provenance.texture_fingerprint.clone(),
            pack_fingerprint: self.provenance.pack_fingerprint.clone(),
            generated: self.generated.clone(),
            blocks,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&doc)?;
        let mut f = fs::File::create(&self.path)?;
        f.write_all(json.as_bytes())?;
        fs::write(&self.report_path, report)?;

        self.inner.write().unwrap().dirty = false;
        log::debug!("palette persisted to {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

enum LoadResult {
    Loaded(HashMap<BlockKey, PaletteEntry>),
    Unusable,
    Absent,
}

fn archive_path(path: &Path, version: u32) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{name}.v{version}"))
}
