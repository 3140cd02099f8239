use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn is_mod_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("jar"))
        .unwrap_or(false)
}

/// List the mod archives directly inside `dir`, sorted by file name.
///
/// Only regular files ending in `.jar` count; the index file and in-flight `.part`
/// downloads never match. Unreadable entries are skipped with a warning.
pub fn scan_mods_dir(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Mods directory {:?} does not exist or is not a directory", dir);
    }
    log::debug!("[Scan] Scanning {:?}", dir);

    let mut archives = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("[Scan] Skipping unreadable entry in {:?}: {}", dir, e);
                continue;
            }
        };
        if entry.file_type().is_file() && is_mod_archive(entry.path()) {
            archives.push(entry.into_path());
        }
    }

    archives.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    log::info!("[Scan] Found {} archives in {:?}", archives.len(), dir);
    Ok(archives)
}
