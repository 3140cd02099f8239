//! Reading the loader descriptor embedded in a mod archive.
//!
//! Three layouts are recognised, checked in this order:
//! - `fabric.mod.json` (Fabric/Quilt-compatible), JSON with top-level `id` and `name`
//! - `META-INF/neoforge.mods.toml`, TOML with `[[mods]]` entries (`modId`, `displayName`)
//! - `META-INF/mods.toml`, Forge's older variant of the same TOML shape

use crate::models::ManifestInfo;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

pub const FABRIC_MANIFEST: &str = "fabric.mod.json";
pub const NEOFORGE_MANIFEST: &str = "META-INF/neoforge.mods.toml";
pub const FORGE_MANIFEST: &str = "META-INF/mods.toml";

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read archive {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a readable zip archive {path:?}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("No recognised mod descriptor in {path:?}")]
    UnsupportedArchiveFormat { path: PathBuf },

    #[error("Malformed {entry} in {path:?}: {reason}")]
    Malformed {
        path: PathBuf,
        entry: &'static str,
        reason: String,
    },
}

/// Extracts identity metadata from an archive on disk
pub trait ManifestReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<ManifestInfo, ManifestError>;
}

/// Reads descriptors straight out of the jar's zip directory
#[derive(Debug, Default, Clone, Copy)]
pub struct JarManifestReader;

impl ManifestReader for JarManifestReader {
    fn read(&self, path: &Path) -> Result<ManifestInfo, ManifestError> {
        read_manifest(path)
    }
}

#[derive(Deserialize)]
struct FabricModJson {
    id: String,
    name: Option<String>,
}

#[derive(Deserialize)]
struct ModsToml {
    #[serde(default)]
    mods: Vec<ModsTomlEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModsTomlEntry {
    mod_id: String,
    display_name: Option<String>,
}

pub fn read_manifest(path: &Path) -> Result<ManifestInfo, ManifestError> {
    let file = File::open(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(file).map_err(|source| ManifestError::Zip {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(content) = read_entry(&mut archive, path, FABRIC_MANIFEST)? {
        log::debug!("[Manifest] {:?} carries {}", path, FABRIC_MANIFEST);
        return parse_fabric(path, &content);
    }

    for entry in [NEOFORGE_MANIFEST, FORGE_MANIFEST] {
        if let Some(content) = read_entry(&mut archive, path, entry)? {
            log::debug!("[Manifest] {:?} carries {}", path, entry);
            return parse_mods_toml(path, entry, &content);
        }
    }

    Err(ManifestError::UnsupportedArchiveFormat {
        path: path.to_path_buf(),
    })
}

fn read_entry(
    archive: &mut ZipArchive<File>,
    path: &Path,
    name: &'static str,
) -> Result<Option<String>, ManifestError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(source) => {
            return Err(ManifestError::Zip {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|e| ManifestError::Malformed {
            path: path.to_path_buf(),
            entry: name,
            reason: e.to_string(),
        })?;
    Ok(Some(content))
}

fn parse_fabric(path: &Path, content: &str) -> Result<ManifestInfo, ManifestError> {
    // Some mods ship control characters inside string literals; strict JSON rejects them
    let cleaned: String = content
        .chars()
        .map(|c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
        .collect();
    let parsed: FabricModJson =
        serde_json::from_str(&cleaned).map_err(|e| ManifestError::Malformed {
            path: path.to_path_buf(),
            entry: FABRIC_MANIFEST,
            reason: e.to_string(),
        })?;

    Ok(ManifestInfo {
        display_name: parsed.name.unwrap_or_else(|| parsed.id.clone()),
        embedded_id: parsed.id,
    })
}

fn parse_mods_toml(
    path: &Path,
    entry: &'static str,
    content: &str,
) -> Result<ManifestInfo, ManifestError> {
    let parsed: ModsToml = toml::from_str(content).map_err(|e| ManifestError::Malformed {
        path: path.to_path_buf(),
        entry,
        reason: e.to_string(),
    })?;

    let first = parsed
        .mods
        .into_iter()
        .next()
        .ok_or_else(|| ManifestError::Malformed {
            path: path.to_path_buf(),
            entry,
            reason: "no [[mods]] entry".to_string(),
        })?;

    Ok(ManifestInfo {
        display_name: first.display_name.unwrap_or_else(|| first.mod_id.clone()),
        embedded_id: first.mod_id,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;

    /// Build a jar containing the given `(entry name, content)` pairs
    pub(crate) fn write_jar(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (entry, content) in entries {
            zip.start_file::<&str, ()>(*entry, FileOptions::default())
                .unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    #[test]
    fn reads_fabric_manifest() {
        let dir = TempDir::new().unwrap();
        let jar = write_jar(
            dir.path(),
            "sodium.jar",
            &[(FABRIC_MANIFEST, r#"{"schemaVersion": 1, "id": "sodium", "name": "Sodium"}"#)],
        );
        let info = JarManifestReader.read(&jar).unwrap();
        assert_eq!(info.embedded_id, "sodium");
        assert_eq!(info.display_name, "Sodium");
    }

    #[test]
    fn tolerates_raw_newlines_in_fabric_strings() {
        let dir = TempDir::new().unwrap();
        let jar = write_jar(
            dir.path(),
            "lithium.jar",
            &[(
                FABRIC_MANIFEST,
                "{\"id\": \"lithium\", \"name\": \"Lithium\", \"description\": \"line one\nline two\"}",
            )],
        );
        assert_eq!(read_manifest(&jar).unwrap().embedded_id, "lithium");
    }

    #[test]
    fn prefers_neoforge_over_legacy_forge() {
        let dir = TempDir::new().unwrap();
        let jar = write_jar(
            dir.path(),
            "jei.jar",
            &[
                (
                    FORGE_MANIFEST,
                    "modLoader=\"javafml\"\n[[mods]]\nmodId=\"jei_forge\"\ndisplayName=\"JEI Forge\"\n",
                ),
                (
                    NEOFORGE_MANIFEST,
                    "modLoader=\"javafml\"\nloaderVersion=\"[4,)\"\n[[mods]]\nmodId=\"jei\"\ndisplayName=\"Just Enough Items\"\n",
                ),
            ],
        );
        let info = read_manifest(&jar).unwrap();
        assert_eq!(info.embedded_id, "jei");
        assert_eq!(info.display_name, "Just Enough Items");
    }

    #[test]
    fn reads_legacy_forge_manifest() {
        let dir = TempDir::new().unwrap();
        let jar = write_jar(
            dir.path(),
            "create.jar",
            &[(FORGE_MANIFEST, "[[mods]]\nmodId=\"create\"\n")],
        );
        let info = read_manifest(&jar).unwrap();
        assert_eq!(info.embedded_id, "create");
        // display name falls back to the id
        assert_eq!(info.display_name, "create");
    }

    #[test]
    fn unknown_layout_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let jar = write_jar(dir.path(), "plain.jar", &[("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\n")]);
        assert!(matches!(
            read_manifest(&jar),
            Err(ManifestError::UnsupportedArchiveFormat { .. })
        ));
    }

    #[test]
    fn non_zip_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jar");
        std::fs::write(&path, b"definitely not a zip").unwrap();
        assert!(matches!(read_manifest(&path), Err(ManifestError::Zip { .. })));
    }

    #[test]
    fn empty_mods_list_is_malformed() {
        let dir = TempDir::new().unwrap();
        let jar = write_jar(dir.path(), "empty.jar", &[(FORGE_MANIFEST, "modLoader=\"javafml\"\n")]);
        assert!(matches!(
            read_manifest(&jar),
            Err(ManifestError::Malformed { .. })
        ));
    }
}
