//! Per-file failure taxonomy of a sync batch.
//!
//! Every variant is scoped to one archive or dependency request; none of them abort the
//! batch. Fatal conditions (unusable mods directory, bad config) surface as `anyhow`
//! errors from the orchestrator instead.

use crate::api::CatalogError;
use crate::manifest::ManifestError;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("No recognised mod descriptor in {path:?}")]
    UnsupportedArchiveFormat { path: PathBuf },

    #[error("Could not identify {path:?}: {reason}")]
    IdentityResolutionFailure { path: PathBuf, reason: String },

    #[error("No compatible version of {project_id} for {loader} {game_version}")]
    NoCompatibleVersion {
        project_id: String,
        loader: String,
        game_version: String,
    },

    #[error("Remote catalog unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Not found: {0}")]
    ResourceNotFound(String),

    #[error("Version {version_id} of {project_id} has no primary file")]
    MissingPrimaryFile {
        project_id: String,
        version_id: String,
    },

    #[error("Version {version_id} of {project_id} names an unsafe file {filename:?}")]
    UnsafeFileName {
        project_id: String,
        version_id: String,
        filename: String,
    },

    #[error("I/O error on {path:?}: {reason}")]
    Io { path: PathBuf, reason: String },
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: impl ToString) -> Self {
        SyncError::Io {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

impl From<CatalogError> for SyncError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound { resource } => SyncError::ResourceNotFound(resource),
            other => SyncError::RemoteUnavailable(other.to_string()),
        }
    }
}

impl From<ManifestError> for SyncError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::UnsupportedArchiveFormat { path } => {
                SyncError::UnsupportedArchiveFormat { path }
            }
            ManifestError::Io { path, source } => SyncError::io(path, source),
            ManifestError::Zip { path, source } => SyncError::IdentityResolutionFailure {
                path,
                reason: source.to_string(),
            },
            ManifestError::Malformed {
                path,
                entry,
                reason,
            } => SyncError::IdentityResolutionFailure {
                path,
                reason: format!("malformed {}: {}", entry, reason),
            },
        }
    }
}
