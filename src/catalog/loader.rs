use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use sgp4::Elements;

use super::error::CatalogError;
use super::parsing::{classify_object, parse_multi_tle};
use super::types::{CatalogEntry, OrbitalElement};

/// Reads catalog entries from `.tle`/`.txt` files in a folder.
pub struct TleLoader {
    tle_dir: PathBuf,
}

impl TleLoader {
    pub fn new(tle_dir: PathBuf) -> Self {
        Self { tle_dir }
    }

    /// Load every TLE file in the folder. Files that fail to parse are skipped.
    pub fn load_all(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        if !self.tle_dir.exists() {
            return Err(CatalogError::DirectoryNotFound(
                self.tle_dir.display().to_string(),
            ));
        }

        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.tle_dir)? {
            let path = dir_entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(ext) = path.extension() else {
                continue;
            };
            if ext != "tle" && ext != "txt" {
                continue;
            }

            match load_file(&path) {
                Ok(file_entries) => entries.extend(file_entries),
                Err(e) => {
                    log::warn!("Failed to parse TLE file {}: {}", path.display(), e);
                }
            }
        }

        entries.sort_by_key(|e| e.norad_id);
        Ok(entries)
    }
}

/// Parse a single TLE file (may contain multiple objects).
pub fn load_file(path: &Path) -> Result<Vec<CatalogEntry>, CatalogError> {
    let content = fs::read_to_string(path)?;
    let filename = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    parse_multi_tle(&content)
        .into_iter()
        .map(|element| validated_entry(element, &filename))
        .collect()
}

fn validated_entry(element: OrbitalElement, source: &str) -> Result<CatalogEntry, CatalogError> {
    let elements = Elements::from_tle(
        Some(element.name.clone()),
        element.line1.as_bytes(),
        element.line2.as_bytes(),
    )
    .map_err(|e| CatalogError::InvalidTle {
        source_name: source.to_string(),
        message: format!("{}: {}", element.name, e),
    })?;

    let now = Utc::now();
    Ok(CatalogEntry {
        norad_id: elements.norad_id as u32,
        object_type: classify_object(&element.name),
        element,
        source: source.to_string(),
        created_at: now,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ObjectType;

    const ISS: &str = "ISS (ZARYA)
1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992
2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008
";

    const DEBRIS: &str = "TEST DEB
1 48274U 21035A   20194.50000000  .00000000  00000-0  00000-0 0  9997
2 48274  97.4000 100.0000 0001000  90.0000 270.0000 15.21930000  1009
";

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tle-loader-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn loads_all_tle_files_and_skips_broken_ones() {
        let dir = temp_dir();
        fs::write(dir.join("stations.tle"), ISS).unwrap();
        fs::write(dir.join("debris.txt"), DEBRIS).unwrap();
        fs::write(dir.join("notes.md"), "ignored").unwrap();
        // Checksum digit corrupted
        fs::write(dir.join("broken.tle"), ISS.replace("0  9992", "0  9993")).unwrap();

        let entries = TleLoader::new(dir.clone()).load_all().unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].norad_id, 25544);
        assert_eq!(entries[0].object_type, ObjectType::Payload);
        assert_eq!(entries[0].source, "stations.tle");
        assert_eq!(entries[1].norad_id, 48274);
        assert_eq!(entries[1].object_type, ObjectType::Debris);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_directory_is_an_error() {
        let loader = TleLoader::new(PathBuf::from("/nonexistent/tle/folder"));
        assert!(matches!(
            loader.load_all(),
            Err(CatalogError::DirectoryNotFound(_))
        ));
    }
}
