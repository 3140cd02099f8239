//! One sync batch over a mods directory.
//!
//! The batch runs in waves, each fully awaited before the next starts:
//! discovery (hash + identify), resolution (pick target versions), dependency waves
//! until no new required projects appear, then downloads. The index is only touched
//! between waves and written once at the end.

use super::dependency::{expand, merge_wave, KnownProjects};
use super::identity::IdentityResolver;
use super::report::{ArchiveReport, SyncReport};
use super::state::ArchiveState;
use super::version::resolve_target;
use crate::api::{CatalogSource, ModrinthClient, HASH_ALGORITHM};
use crate::config::{SyncConfig, VersionConstraints};
use crate::error::SyncError;
use crate::index::LocalIndex;
use crate::manifest::{JarManifestReader, ManifestReader};
use crate::models::{
    ArchiveRecord, DependencyRequest, DownloadTask, IndexEntry, RemoteVersion, ResolvedIdentity,
};
use crate::scan::scan_mods_dir;
use crate::utils::hash::calculate_sha512_async;
use anyhow::{Context, Result};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Per-item batch state owned by the orchestrator
struct Tracked {
    report: ArchiveReport,
    record: Option<ArchiveRecord>,
    target: Option<RemoteVersion>,
    task: Option<DownloadTask>,
}

impl Tracked {
    fn discovered(name: String) -> Self {
        Self {
            report: ArchiveReport {
                name,
                identity: None,
                target_version_id: None,
                installed_file: None,
                removed_file: None,
                state: ArchiveState::Discovered,
                error: None,
            },
            record: None,
            target: None,
            task: None,
        }
    }

    fn dependency(request: &DependencyRequest) -> Self {
        let mut tracked = Self::discovered(request.project_id.clone());
        tracked.report.identity = Some(ResolvedIdentity::from(request));
        tracked.advance(ArchiveState::Identified);
        tracked
    }

    fn state(&self) -> ArchiveState {
        self.report.state
    }

    fn project_id(&self) -> Option<&str> {
        self.report.identity.as_ref().map(|i| i.project_id.as_str())
    }

    fn advance(&mut self, next: ArchiveState) {
        debug_assert!(
            self.report.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.report.state,
            next
        );
        log::debug!("[Sync] {}: {} -> {}", self.report.name, self.report.state, next);
        self.report.state = next;
    }

    fn fail(&mut self, err: SyncError) {
        log::warn!("[Sync] {}: {}", self.report.name, err);
        self.advance(ArchiveState::Failed);
        self.report.error = Some(err);
    }
}

pub struct SyncOrchestrator {
    config: SyncConfig,
    constraints: VersionConstraints,
    catalog: Arc<dyn CatalogSource>,
    resolver: IdentityResolver,
}

impl SyncOrchestrator {
    pub fn new(
        config: SyncConfig,
        catalog: Arc<dyn CatalogSource>,
        manifest_reader: Arc<dyn ManifestReader>,
    ) -> Self {
        let constraints = config.constraints();
        let resolver = IdentityResolver::new(
            catalog.clone(),
            manifest_reader,
            config.search_depth,
            constraints.clone(),
        );
        Self {
            config,
            constraints,
            catalog,
            resolver,
        }
    }

    /// Orchestrator backed by the Modrinth HTTP client and the jar manifest reader
    pub fn from_config(config: SyncConfig) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        let client = ModrinthClient::from_config(&config).context("Failed to build catalog client")?;
        Ok(Self::new(config, Arc::new(client), Arc::new(JarManifestReader)))
    }

    pub async fn run(&self) -> Result<SyncReport> {
        let mods_dir = &self.config.mods_dir;
        let dry_run = self.config.dry_run;

        let mut index = if dry_run {
            LocalIndex::load_or_empty(self.config.index_path())
                .await
                .context("Failed to load local index")?
        } else {
            tokio::fs::create_dir_all(mods_dir)
                .await
                .with_context(|| format!("Failed to create mods directory {:?}", mods_dir))?;
            let index = LocalIndex::load_or_recover(self.config.index_path())
                .await
                .context("Failed to load local index")?;
            index
                .ensure_exists()
                .await
                .context("Failed to initialise local index")?;
            index
        };

        let paths = if dry_run && !mods_dir.exists() {
            log::info!("[Sync] Would create mods directory {:?}", mods_dir);
            Vec::new()
        } else {
            scan_mods_dir(mods_dir)?
        };
        log::info!(
            "[Sync] Synchronizing {} archives for {} {}{}",
            paths.len(),
            self.constraints.loader,
            self.constraints.game_version,
            if dry_run { " (dry run)" } else { "" }
        );

        // Discovery wave
        let mut tracked: Vec<Tracked> =
            join_all(paths.iter().map(|path| self.discover(path, &index))).await;

        for item in &tracked {
            if let (Some(identity), Some(record)) = (&item.report.identity, &item.record) {
                if let Some(version_id) = &identity.version_id {
                    index.upsert(IndexEntry {
                        content_hash: record.content_hash.clone(),
                        project_id: identity.project_id.clone(),
                        version_id: version_id.clone(),
                    });
                }
            }
        }

        // Resolution wave
        let bulk = if self.config.bulk_update_check {
            self.bulk_targets(&tracked).await
        } else {
            HashMap::new()
        };
        let targets = join_all(tracked.iter().map(|item| self.resolve_archive(item, &bulk))).await;
        for (item, target) in tracked.iter_mut().zip(targets) {
            match target {
                Some(Ok(version)) => self.plan(item, version),
                Some(Err(e)) => item.fail(e),
                None => {}
            }
        }

        self.expand_dependencies(&mut tracked, &index).await;

        if dry_run {
            for task in tracked.iter().filter_map(|t| t.task.as_ref()) {
                log::info!(
                    "[Sync] Would download {}{}",
                    task.target_filename,
                    task.stale_file()
                        .map(|old| format!(" and remove {}", old))
                        .unwrap_or_default()
                );
            }
        } else {
            self.download_wave(&mut tracked, &mut index).await;
            index
                .save()
                .await
                .context("Failed to write local index")?;
        }

        let report = SyncReport {
            archives: tracked.into_iter().map(|t| t.report).collect(),
            dry_run,
        };
        log::info!("[Sync] {}", report.summary());
        Ok(report)
    }

    async fn discover(&self, path: &Path, index: &LocalIndex) -> Tracked {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut item = Tracked::discovered(name);

        let content_hash = match calculate_sha512_async(path.to_path_buf()).await {
            Ok(hash) => hash,
            Err(e) => {
                item.fail(SyncError::io(path, format!("{:#}", e)));
                return item;
            }
        };
        let record = ArchiveRecord {
            path: path.to_path_buf(),
            content_hash,
        };

        match self.resolver.resolve(&record, index).await {
            Ok(identity) => {
                item.report.identity = Some(identity);
                item.advance(ArchiveState::Identified);
            }
            Err(e) => item.fail(e),
        }
        item.record = Some(record);
        item
    }

    /// Latest allowed versions from a single bulk lookup, keyed by content hash
    async fn bulk_targets(&self, tracked: &[Tracked]) -> HashMap<String, RemoteVersion> {
        let hashes: Vec<String> = tracked
            .iter()
            .filter(|t| t.state() == ArchiveState::Identified)
            .filter_map(|t| t.record.as_ref().map(|r| r.content_hash.clone()))
            .collect();
        if hashes.is_empty() {
            return HashMap::new();
        }

        let result = self
            .catalog
            .bulk_latest_by_hash(
                &hashes,
                HASH_ALGORITHM,
                &[self.constraints.loader.clone()],
                &[self.constraints.game_version.clone()],
            )
            .await;
        match result {
            Ok(found) => {
                let hits: HashMap<_, _> = found
                    .into_iter()
                    .filter_map(|(hash, version)| version.map(|v| (hash, v)))
                    .filter(|(_, v)| {
                        self.constraints
                            .allowed_version_types
                            .contains(&v.version_type)
                    })
                    .collect();
                log::debug!(
                    "[Sync] Bulk update check covered {}/{} archives",
                    hits.len(),
                    hashes.len()
                );
                hits
            }
            Err(e) => {
                log::warn!(
                    "[Sync] Bulk update check failed, falling back to per-project lookups: {}",
                    e
                );
                HashMap::new()
            }
        }
    }

    async fn resolve_archive(
        &self,
        item: &Tracked,
        bulk: &HashMap<String, RemoteVersion>,
    ) -> Option<Result<RemoteVersion, SyncError>> {
        if item.state() != ArchiveState::Identified {
            return None;
        }
        let project_id = item.project_id()?;

        let bulk_hit = item
            .record
            .as_ref()
            .and_then(|r| bulk.get(&r.content_hash))
            .filter(|v| v.project_id == project_id);
        if let Some(version) = bulk_hit {
            return Some(Ok(version.clone()));
        }

        Some(resolve_target(self.catalog.as_ref(), project_id, None, &self.constraints).await)
    }

    /// Move a resolved item to `UpToDate` or `DownloadPending`
    fn plan(&self, item: &mut Tracked, version: RemoteVersion) {
        item.advance(ArchiveState::VersionResolved);
        item.report.target_version_id = Some(version.version_id.clone());

        let Some(file) = version.primary_file() else {
            item.fail(SyncError::MissingPrimaryFile {
                project_id: version.project_id.clone(),
                version_id: version.version_id.clone(),
            });
            return;
        };
        if !file.has_plain_filename() {
            item.fail(SyncError::UnsafeFileName {
                project_id: version.project_id.clone(),
                version_id: version.version_id.clone(),
                filename: file.filename.clone(),
            });
            return;
        }

        let current_hash = item.record.as_ref().map(|r| r.content_hash.as_str());
        if current_hash.is_some_and(|hash| version.primary_hash_matches(hash)) {
            item.advance(ArchiveState::UpToDate);
        } else {
            item.task = Some(DownloadTask {
                url: file.url.clone(),
                target_filename: file.filename.clone(),
                old_filename: item.record.as_ref().map(|r| r.file_name()),
                expected_sha512: file.sha512.clone(),
            });
            item.advance(ArchiveState::DownloadPending);
        }
        item.target = Some(version);
    }

    /// Resolve required dependencies wave by wave until nothing new is requested.
    /// Each project id is requested at most once per run.
    async fn expand_dependencies(&self, tracked: &mut Vec<Tracked>, index: &LocalIndex) {
        let mut known = KnownProjects::from_index(index);
        let mut seen: HashSet<String> = HashSet::new();
        for item in tracked.iter() {
            if let Some(project_id) = item.project_id() {
                seen.insert(project_id.to_string());
            }
            if let Some(target) = &item.target {
                known.insert(&target.project_id, &target.version_id);
            }
        }

        let mut frontier: Vec<RemoteVersion> = tracked
            .iter()
            .filter(|t| t.state() != ArchiveState::Failed)
            .filter_map(|t| t.target.clone())
            .collect();
        let mut wave = 0;

        loop {
            let requests = merge_wave(frontier.iter().map(|v| expand(v, &known)), &mut seen);
            if requests.is_empty() {
                break;
            }
            wave += 1;
            log::info!(
                "[Sync] Dependency wave {}: {} project(s)",
                wave,
                requests.len()
            );

            let results = join_all(requests.iter().map(|request| {
                resolve_target(
                    self.catalog.as_ref(),
                    &request.project_id,
                    request.pinned_version_id.as_deref(),
                    &self.constraints,
                )
            }))
            .await;

            frontier = Vec::new();
            for (request, result) in requests.iter().zip(results) {
                let mut item = Tracked::dependency(request);
                match result {
                    Ok(version) => {
                        known.insert(&request.project_id, &version.version_id);
                        known.insert(&version.project_id, &version.version_id);
                        seen.insert(version.project_id.clone());
                        if let Some(identity) = item.report.identity.as_mut() {
                            identity.version_id = Some(version.version_id.clone());
                        }
                        self.plan(&mut item, version);
                        if let Some(target) = item.target.as_ref() {
                            frontier.push(target.clone());
                        }
                    }
                    Err(e) => item.fail(e),
                }
                tracked.push(item);
            }
        }
    }

    async fn download_wave(&self, tracked: &mut [Tracked], index: &mut LocalIndex) {
        // Items resolving to the same file share one download
        let mut slots: Vec<(DownloadTask, Vec<usize>)> = Vec::new();
        for (i, item) in tracked.iter().enumerate() {
            let Some(task) = &item.task else { continue };
            match slots
                .iter_mut()
                .find(|(t, _)| t.target_filename == task.target_filename)
            {
                Some((_, owners)) => owners.push(i),
                None => slots.push((task.clone(), vec![i])),
            }
        }
        if slots.is_empty() {
            return;
        }

        let mods_dir = &self.config.mods_dir;
        let results: Vec<(usize, Result<(), SyncError>)> = stream::iter(slots.iter().enumerate())
            .map(|(slot, (task, _))| async move {
                log::info!("[Sync] Downloading {}", task.target_filename);
                let dest = mods_dir.join(&task.target_filename);
                let result = self
                    .catalog
                    .download(&task.url, &dest, &task.expected_sha512)
                    .await
                    .map_err(SyncError::from);
                (slot, result)
            })
            .buffer_unordered(self.config.concurrent_downloads)
            .collect()
            .await;

        for (slot, result) in results {
            for &i in &slots[slot].1 {
                match &result {
                    Ok(()) => self.finish(&mut tracked[i], index).await,
                    Err(e) => tracked[i].fail(e.clone()),
                }
            }
        }
    }

    /// Remove the replaced file and record the new one
    async fn finish(&self, item: &mut Tracked, index: &mut LocalIndex) {
        let (Some(task), Some(target)) = (item.task.as_ref(), item.target.as_ref()) else {
            return;
        };

        if let Some(stale) = task.stale_file() {
            let stale_path = self.config.mods_dir.join(stale);
            match tokio::fs::remove_file(&stale_path).await {
                Ok(()) => {
                    log::info!("[Sync] Removed {}", stale);
                    item.report.removed_file = Some(stale.to_string());
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("[Sync] Could not remove {:?}: {}", stale_path, e),
            }
        }

        if let Some(record) = &item.record {
            index.remove_hash(&record.content_hash);
        }
        index.upsert(IndexEntry {
            content_hash: task.expected_sha512.to_ascii_lowercase(),
            project_id: target.project_id.clone(),
            version_id: target.version_id.clone(),
        });

        item.report.installed_file = Some(task.target_filename.clone());
        item.advance(ArchiveState::Done);
    }
}
