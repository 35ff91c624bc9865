use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Serialized palette document. Both map levels are ordered so the written
/// JSON is stable and diffs cleanly.
#[derive(Serialize, Deserialize, Debug)]
pub struct PaletteFile {
    pub version: u32,
    pub texture_fingerprint: String,
    pub pack_fingerprint: String,
    #[serde(default)]
    pub generated: String,
    /// block name -> variant (decimal string) -> entry
    pub blocks: BTreeMap<String, BTreeMap<String, EntryJson>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EntryJson {
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<u8>,
}
