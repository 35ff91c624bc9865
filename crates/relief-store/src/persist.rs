use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use relief_world::{DimensionId, MapLayer, REGION_PIXELS, RegionCoord};

/// `{base}/DIM{d}/{layer}/r{rx},{rz}.png`
pub fn region_path(base: &Path, region: RegionCoord, dim: DimensionId, layer: MapLayer) -> PathBuf {
    base.join(dim.dir_name())
        .join(layer.dir_name())
        .join(format!("r{},{}.png", region.rx, region.rz))
}

/// Obsolete combined file at the dimension root: day stacked above night.
pub fn legacy_path(base: &Path, region: RegionCoord, dim: DimensionId) -> PathBuf {
    base.join(dim.dir_name())
        .join(format!("r{},{}.png", region.rx, region.rz))
}

/// Result of loading a region raster from disk.
pub enum ReadOutcome {
    Missing,
    Loaded(RgbaImage),
    /// File was unreadable and has been renamed to a `<name>.bad` sidecar.
    Quarantined,
}

/// Read a region raster, quarantining unreadable files so a corrupt file is
/// surfaced once instead of failing every load.
pub fn read_raster(path: &Path) -> io::Result<ReadOutcome> {
    if !path.exists() {
        return Ok(ReadOutcome::Missing);
    }
    match image::open(path) {
        Ok(img) => {
            let img = img.to_rgba8();
            if img.width() == REGION_PIXELS && img.height() == REGION_PIXELS {
                Ok(ReadOutcome::Loaded(img))
            } else {
                log::warn!(
                    "region image {} has unexpected size {}x{}",
                    path.display(),
                    img.width(),
                    img.height()
                );
                quarantine(path)?;
                Ok(ReadOutcome::Quarantined)
            }
        }
        Err(e) => {
            log::warn!("couldn't read region image {}: {e}", path.display());
            quarantine(path)?;
            Ok(ReadOutcome::Quarantined)
        }
    }
}

/// Write a raster via a temp file and rename so a crash mid-write never
/// leaves a truncated region file behind.
pub fn write_raster(path: &Path, raster: &RgbaImage) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("png.tmp");
    raster
        .save_with_format(&tmp, image::ImageFormat::Png)
        .map_err(|e| io::Error::other(format!("encode {}: {e}", tmp.display())))?;
    fs::rename(&tmp, path)
}

fn quarantine(path: &Path) -> io::Result<()> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let bad = path.with_file_name(format!("{name}.bad"));
    fs::rename(path, bad)
}

/// Split a legacy combined raster into day/night files. The legacy file is
/// deleted only after both replacements are written.
pub fn migrate_legacy(
    base: &Path,
    region: RegionCoord,
    dim: DimensionId,
) -> io::Result<bool> {
    let legacy = legacy_path(base, region, dim);
    if !legacy.exists() {
        return Ok(false);
    }
    let combined = match image::open(&legacy) {
        Ok(img) => img.to_rgba8(),
        Err(e) => {
            log::warn!("couldn't read legacy region {}: {e}", legacy.display());
            quarantine(&legacy)?;
            return Ok(false);
        }
    };
    if combined.width() != REGION_PIXELS || combined.height() != REGION_PIXELS * 2 {
        log::warn!(
            "legacy region {} has unexpected size {}x{}",
            legacy.display(),
            combined.width(),
            combined.height()
        );
        quarantine(&legacy)?;
        return Ok(false);
    }
    let day = image::imageops::crop_imm(&combined, 0, 0, REGION_PIXELS, REGION_PIXELS).to_image();
    let night =
        image::imageops::crop_imm(&combined, 0, REGION_PIXELS, REGION_PIXELS, REGION_PIXELS)
            .to_image();
    write_raster(&region_path(base, region, dim, MapLayer::Day), &day)?;
    write_raster(&region_path(base, region, dim, MapLayer::Night), &night)?;
    fs::remove_file(&legacy)?;
    log::info!("migrated legacy region file {}", legacy.display());
    Ok(true)
}

/// Region coordinates with any persisted raster for a dimension, across the
/// surface/topo layer directories and legacy root files.
pub fn list_regions(base: &Path, dim: DimensionId) -> Vec<RegionCoord> {
    let dim_dir = base.join(dim.dir_name());
    let mut found = Vec::new();
    let mut scan = |dir: &Path| {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            if let Some(region) = parse_region_file_name(&entry.file_name().to_string_lossy()) {
                if !found.contains(&region) {
                    found.push(region);
                }
            }
        }
    };
    scan(&dim_dir);
    for layer in [MapLayer::Day, MapLayer::Night, MapLayer::Topo] {
        scan(&dim_dir.join(layer.dir_name()));
    }
    found
}

fn parse_region_file_name(name: &str) -> Option<RegionCoord> {
    let stem = name.strip_suffix(".png")?;
    let rest = stem.strip_prefix('r')?;
    let (rx, rz) = rest.split_once(',')?;
    Some(RegionCoord::new(rx.parse().ok()?, rz.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_file_names_parse() {
        assert_eq!(parse_region_file_name("r0,0.png"), Some(RegionCoord::new(0, 0)));
        assert_eq!(parse_region_file_name("r-3,12.png"), Some(RegionCoord::new(-3, 12)));
        assert_eq!(parse_region_file_name("r0,0.png.bad"), None);
        assert_eq!(parse_region_file_name("notes.txt"), None);
    }

    #[test]
    fn paths_follow_layout() {
        let base = Path::new("/maps");
        assert_eq!(
            region_path(base, RegionCoord::new(-1, 2), DimensionId(0), MapLayer::Day),
            Path::new("/maps/DIM0/day/r-1,2.png")
        );
        assert_eq!(
            region_path(
                base,
                RegionCoord::new(0, 0),
                DimensionId(-1),
                MapLayer::Underground { slice: 4 }
            ),
            Path::new("/maps/DIM-1/underground/4/r0,0.png")
        );
        assert_eq!(
            legacy_path(base, RegionCoord::new(5, 5), DimensionId(0)),
            Path::new("/maps/DIM0/r5,5.png")
        );
    }
}
