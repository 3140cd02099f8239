//! Working out which remote project and version a local archive is.
//!
//! Strategies run in order and stop at the first success:
//! 1. content hash found in the local index (no network)
//! 2. embedded manifest id used as a project id, versions scanned for the hash
//! 3. catalog search by the manifest's display name, top candidates scanned concurrently
//!
//! When several search candidates contain the hash, whichever scan finishes first wins.

use crate::api::{CatalogError, CatalogSource};
use crate::config::VersionConstraints;
use crate::error::SyncError;
use crate::index::LocalIndex;
use crate::manifest::ManifestReader;
use crate::models::{ArchiveRecord, ManifestInfo, RemoteVersion, ResolvedIdentity, SearchQuery};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;

pub struct IdentityResolver {
    catalog: Arc<dyn CatalogSource>,
    manifest_reader: Arc<dyn ManifestReader>,
    search_depth: u32,
    constraints: VersionConstraints,
}

impl IdentityResolver {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        manifest_reader: Arc<dyn ManifestReader>,
        search_depth: u32,
        constraints: VersionConstraints,
    ) -> Self {
        Self {
            catalog,
            manifest_reader,
            search_depth,
            constraints,
        }
    }

    pub async fn resolve(
        &self,
        archive: &ArchiveRecord,
        index: &LocalIndex,
    ) -> Result<ResolvedIdentity, SyncError> {
        if let Some(entry) = index.find_by_hash(&archive.content_hash) {
            log::debug!(
                "[IdentityResolver] {} found in index as {}@{}",
                archive.file_name(),
                entry.project_id,
                entry.version_id
            );
            return Ok(ResolvedIdentity::for_archive(
                entry.project_id.clone(),
                Some(entry.version_id.clone()),
                archive.content_hash.clone(),
            ));
        }

        let manifest = self.read_manifest(archive).await?;

        match self
            .find_in_project(&manifest.embedded_id, &archive.content_hash)
            .await
        {
            Ok(Some(version)) => {
                log::debug!(
                    "[IdentityResolver] {} matched embedded id '{}' -> {}@{}",
                    archive.file_name(),
                    manifest.embedded_id,
                    version.project_id,
                    version.version_id
                );
                return Ok(identity_from(version, archive));
            }
            Ok(None) => log::debug!(
                "[IdentityResolver] No version of '{}' carries the hash of {}",
                manifest.embedded_id,
                archive.file_name()
            ),
            Err(e) => log::debug!(
                "[IdentityResolver] Direct lookup of '{}' failed: {}",
                manifest.embedded_id,
                e
            ),
        }

        match self.search(&manifest, archive).await {
            Some(version) => {
                log::debug!(
                    "[IdentityResolver] {} matched search for '{}' -> {}@{}",
                    archive.file_name(),
                    manifest.display_name,
                    version.project_id,
                    version.version_id
                );
                Ok(identity_from(version, archive))
            }
            None => {
                log::warn!(
                    "[IdentityResolver] Could not identify {} (id '{}', name '{}')",
                    archive.file_name(),
                    manifest.embedded_id,
                    manifest.display_name
                );
                Err(SyncError::IdentityResolutionFailure {
                    path: archive.path.clone(),
                    reason: format!(
                        "no catalog project carries this file (id '{}', name '{}')",
                        manifest.embedded_id, manifest.display_name
                    ),
                })
            }
        }
    }

    async fn read_manifest(&self, archive: &ArchiveRecord) -> Result<ManifestInfo, SyncError> {
        let reader = self.manifest_reader.clone();
        let path = archive.path.clone();
        let result = tokio::task::spawn_blocking(move || reader.read(&path))
            .await
            .map_err(|e| SyncError::io(&archive.path, e))?;

        result.map_err(SyncError::from)
    }

    /// The version of `project_id` whose primary file has `content_hash`, if any
    async fn find_in_project(
        &self,
        project_id: &str,
        content_hash: &str,
    ) -> Result<Option<RemoteVersion>, CatalogError> {
        let versions = self.catalog.list_versions(project_id).await?;
        Ok(versions
            .into_iter()
            .find(|v| v.primary_hash_matches(content_hash)))
    }

    async fn search(&self, manifest: &ManifestInfo, archive: &ArchiveRecord) -> Option<RemoteVersion> {
        let query = SearchQuery::for_mod(
            &manifest.display_name,
            &self.constraints.loader,
            &self.constraints.game_version,
            self.search_depth,
        );
        let hits = match self.catalog.search_projects(&query).await {
            Ok(hits) => hits,
            Err(e) => {
                log::debug!(
                    "[IdentityResolver] Search for '{}' failed: {}",
                    manifest.display_name,
                    e
                );
                return None;
            }
        };

        let mut candidates: FuturesUnordered<_> = hits
            .iter()
            .take(self.search_depth as usize)
            .map(|hit| async move {
                let found = self.find_in_project(&hit.project_id, &archive.content_hash).await;
                (hit, found)
            })
            .collect();

        while let Some((hit, found)) = candidates.next().await {
            match found {
                Ok(Some(version)) => return Some(version),
                Ok(None) => {}
                Err(e) => log::debug!(
                    "[IdentityResolver] Candidate {} ({}) failed: {}",
                    hit.slug,
                    hit.project_id,
                    e
                ),
            }
        }
        None
    }
}

fn identity_from(version: RemoteVersion, archive: &ArchiveRecord) -> ResolvedIdentity {
    ResolvedIdentity::for_archive(
        version.project_id,
        Some(version.version_id),
        archive.content_hash.clone(),
    )
}
