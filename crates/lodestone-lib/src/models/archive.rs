use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// One physical mod file under management
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    pub path: PathBuf,
    /// Hex SHA-512 of the full file content
    pub content_hash: String,
}

impl ArchiveRecord {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Metadata read from the loader descriptor embedded in an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestInfo {
    /// Loader-internal mod id. Often, but not always, equal to the remote project slug.
    pub embedded_id: String,
    pub display_name: String,
}

/// Outcome of identity resolution for one archive or dependency request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub project_id: String,
    pub version_id: Option<String>,
    /// None for dependencies that are not installed yet
    pub content_hash: Option<String>,
    pub is_dependency: bool,
    pub requested_version_id: Option<String>,
    pub parent_project_ids: BTreeSet<String>,
}

impl ResolvedIdentity {
    pub fn for_archive(project_id: String, version_id: Option<String>, content_hash: String) -> Self {
        Self {
            project_id,
            version_id,
            content_hash: Some(content_hash),
            is_dependency: false,
            requested_version_id: None,
            parent_project_ids: BTreeSet::new(),
        }
    }
}

impl From<&DependencyRequest> for ResolvedIdentity {
    fn from(request: &DependencyRequest) -> Self {
        Self {
            project_id: request.project_id.clone(),
            version_id: None,
            content_hash: None,
            is_dependency: true,
            requested_version_id: request.pinned_version_id.clone(),
            parent_project_ids: request.parent_project_ids.clone(),
        }
    }
}

/// A required dependency that still has to be resolved and installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRequest {
    pub project_id: String,
    pub pinned_version_id: Option<String>,
    pub parent_project_ids: BTreeSet<String>,
}

/// One row of the persisted local index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(rename = "sha512")]
    pub content_hash: String,
    #[serde(rename = "modID")]
    pub project_id: String,
    #[serde(rename = "version")]
    pub version_id: String,
}

/// A pending file replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub url: String,
    pub target_filename: String,
    /// None means a fresh install with nothing to delete
    pub old_filename: Option<String>,
    pub expected_sha512: String,
}

impl DownloadTask {
    /// The file to delete once the download lands, if any.
    /// A re-download under the same name overwrites in place and deletes nothing.
    pub fn stale_file(&self) -> Option<&str> {
        self.old_filename
            .as_deref()
            .filter(|old| *old != self.target_filename)
    }
}
