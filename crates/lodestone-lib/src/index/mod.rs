//! Persisted hash → (project, version) index.
//!
//! On disk this is a flat JSON array of `{"modID", "sha512", "version"}` objects that
//! lives next to the mods. It is loaded once at batch start and saved once at batch end.
//! At most one entry exists per content hash.

use crate::models::IndexEntry;
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Failed to access index {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Index {path:?} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

#[derive(Debug, Clone)]
pub struct LocalIndex {
    path: PathBuf,
    entries: Vec<IndexEntry>,
}

impl LocalIndex {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    /// Load the index. A missing or empty file yields an empty index.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, IndexError> {
        let path = path.into();
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("[Index] No index at {:?}, starting empty", path);
                return Ok(Self::empty(path));
            }
            Err(source) => return Err(IndexError::Io { path, source }),
        };

        if contents.trim().is_empty() {
            return Ok(Self::empty(path));
        }

        let raw: Vec<IndexEntry> =
            serde_json::from_str(&contents).map_err(|e| IndexError::Corrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let mut index = Self::empty(path);
        for entry in raw {
            index.upsert(entry);
        }
        log::debug!("[Index] Loaded {} entries from {:?}", index.len(), index.path);
        Ok(index)
    }

    /// Like [`LocalIndex::load`], but a corrupt file is reported, moved aside to
    /// `<name>.corrupt`, and replaced by an empty index instead of failing the run.
    pub async fn load_or_recover(path: impl Into<PathBuf>) -> Result<Self, IndexError> {
        let path = path.into();
        match Self::load(&path).await {
            Err(IndexError::Corrupt { path, reason }) => {
                log::error!("[Index] {:?} is corrupt ({}), starting from an empty index", path, reason);
                let mut aside = path.clone().into_os_string();
                aside.push(".corrupt");
                if let Err(e) = fs::rename(&path, &aside).await {
                    log::warn!("[Index] Could not move corrupt index aside: {}", e);
                }
                Ok(Self::empty(path))
            }
            other => other,
        }
    }

    /// Like [`LocalIndex::load_or_recover`], but a corrupt file is left where it is
    pub async fn load_or_empty(path: impl Into<PathBuf>) -> Result<Self, IndexError> {
        let path = path.into();
        match Self::load(&path).await {
            Err(IndexError::Corrupt { path, reason }) => {
                log::warn!("[Index] {:?} is corrupt ({}), ignoring it for this run", path, reason);
                Ok(Self::empty(path))
            }
            other => other,
        }
    }

    /// Write an empty array if no index file exists yet
    pub async fn ensure_exists(&self) -> Result<(), IndexError> {
        if fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(());
        }
        self.save().await
    }

    pub async fn save(&self) -> Result<(), IndexError> {
        let io_err = |source| IndexError::Io {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| IndexError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        fs::write(&tmp, json).await.map_err(io_err)?;
        fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        log::debug!("[Index] Saved {} entries to {:?}", self.entries.len(), self.path);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find_by_hash(&self, content_hash: &str) -> Option<&IndexEntry> {
        self.entries
            .iter()
            .find(|e| e.content_hash.eq_ignore_ascii_case(content_hash))
    }

    /// All recorded versions of one project
    pub fn find_by_project<'a>(&'a self, project_id: &'a str) -> impl Iterator<Item = &'a IndexEntry> {
        self.entries.iter().filter(move |e| e.project_id == project_id)
    }

    /// Insert or overwrite the entry for `entry.content_hash`. An overwrite keeps the
    /// entry's position so replaying the same writes leaves the file byte-identical.
    pub fn upsert(&mut self, entry: IndexEntry) {
        match self
            .entries
            .iter()
            .position(|e| e.content_hash.eq_ignore_ascii_case(&entry.content_hash))
        {
            Some(pos) => self.entries[pos] = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn remove_hash(&mut self, content_hash: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !e.content_hash.eq_ignore_ascii_case(content_hash));
        self.entries.len() != before
    }
}
