//! In-memory catalog and manifest doubles for the sync tests.

use crate::api::{CatalogError, CatalogSource};
use crate::manifest::{JarManifestReader, ManifestError, ManifestReader};
use crate::models::{
    DependencyType, ManifestInfo, RemoteVersion, SearchHit, SearchQuery, VersionDependency,
    VersionFile, VersionType,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A compatible (fabric, 1.21.8, release) version with one primary file
pub fn version(project_id: &str, version_id: &str, published: &str, sha512: &str) -> RemoteVersion {
    RemoteVersion {
        version_id: version_id.to_string(),
        project_id: project_id.to_string(),
        version_number: version_id.to_string(),
        game_versions: vec!["1.21.8".to_string()],
        loaders: vec!["fabric".to_string()],
        version_type: VersionType::Release,
        date_published: published.parse().unwrap(),
        files: vec![VersionFile {
            filename: format!("{}-{}.jar", project_id, version_id),
            url: download_url(project_id, version_id),
            sha512: sha512.to_string(),
            is_primary: true,
        }],
        dependencies: Vec::new(),
    }
}

pub fn download_url(project_id: &str, version_id: &str) -> String {
    format!("https://cdn.test/{}/{}.jar", project_id, version_id)
}

impl RemoteVersion {
    pub fn release(mut self) -> Self {
        self.version_type = VersionType::Release;
        self
    }

    pub fn beta(mut self) -> Self {
        self.version_type = VersionType::Beta;
        self
    }

    pub fn alpha(mut self) -> Self {
        self.version_type = VersionType::Alpha;
        self
    }

    pub fn loaders(mut self, loaders: &[&str]) -> Self {
        self.loaders = loaders.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn game_versions(mut self, game_versions: &[&str]) -> Self {
        self.game_versions = game_versions.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn filename(mut self, name: &str) -> Self {
        for file in self.files.iter_mut().filter(|f| f.is_primary) {
            file.filename = name.to_string();
        }
        self
    }

    pub fn without_primary(mut self) -> Self {
        for file in &mut self.files {
            file.is_primary = false;
        }
        self
    }

    pub fn depends_on(mut self, project_id: &str, kind: DependencyType, pin: Option<&str>) -> Self {
        self.dependencies.push(VersionDependency {
            project_id: project_id.to_string(),
            dependency_type: kind,
            pinned_version_id: pin.map(str::to_string),
        });
        self
    }

    pub fn requires(self, project_id: &str) -> Self {
        self.depends_on(project_id, DependencyType::Required, None)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallCounts {
    pub search: usize,
    pub list_versions: usize,
    pub get_version: usize,
    pub bulk: usize,
    pub download: usize,
}

#[derive(Default)]
pub struct FakeCatalog {
    versions: HashMap<String, Vec<RemoteVersion>>,
    search_results: HashMap<String, Vec<SearchHit>>,
    bulk_results: HashMap<String, RemoteVersion>,
    files: HashMap<String, Vec<u8>>,
    unavailable: Vec<String>,
    calls: Mutex<CallCounts>,
    searched: Mutex<Vec<SearchQuery>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_versions(mut self, project_id: &str, versions: Vec<RemoteVersion>) -> Self {
        self.versions.insert(project_id.to_string(), versions);
        self
    }

    /// Register search hits for a display name, in ranking order
    pub fn with_search(mut self, text: &str, project_ids: &[&str]) -> Self {
        let hits = project_ids
            .iter()
            .map(|id| SearchHit {
                project_id: id.to_string(),
                slug: id.to_string(),
                title: text.to_string(),
            })
            .collect();
        self.search_results.insert(text.to_string(), hits);
        self
    }

    pub fn with_bulk_hit(mut self, hash: &str, version: RemoteVersion) -> Self {
        self.bulk_results.insert(hash.to_string(), version);
        self
    }

    pub fn with_file(mut self, url: &str, bytes: &[u8]) -> Self {
        self.files.insert(url.to_string(), bytes.to_vec());
        self
    }

    /// Every call touching this project fails as if retries were exhausted
    pub fn with_unavailable(mut self, project_id: &str) -> Self {
        self.unavailable.push(project_id.to_string());
        self
    }

    pub fn calls(&self) -> CallCounts {
        self.calls.lock().unwrap().clone()
    }

    pub fn searches(&self) -> Vec<SearchQuery> {
        self.searched.lock().unwrap().clone()
    }

    fn check_available(&self, project_id: &str) -> Result<(), CatalogError> {
        if self.unavailable.iter().any(|p| p == project_id) {
            return Err(CatalogError::unavailable(
                &format!("fake://project/{}", project_id),
                "503 Service Unavailable",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn search_projects(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, CatalogError> {
        self.calls.lock().unwrap().search += 1;
        self.searched.lock().unwrap().push(query.clone());
        let mut hits = self
            .search_results
            .get(&query.text)
            .cloned()
            .unwrap_or_default();
        hits.truncate(query.limit as usize);
        Ok(hits)
    }

    async fn list_versions(&self, project_id: &str) -> Result<Vec<RemoteVersion>, CatalogError> {
        self.calls.lock().unwrap().list_versions += 1;
        self.check_available(project_id)?;
        self.versions
            .get(project_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound {
                resource: format!("project/{}", project_id),
            })
    }

    async fn get_version(
        &self,
        project_id: &str,
        version_id: &str,
    ) -> Result<RemoteVersion, CatalogError> {
        self.calls.lock().unwrap().get_version += 1;
        self.check_available(project_id)?;
        self.versions
            .get(project_id)
            .and_then(|vs| vs.iter().find(|v| v.version_id == version_id))
            .cloned()
            .ok_or_else(|| CatalogError::NotFound {
                resource: format!("project/{}/version/{}", project_id, version_id),
            })
    }

    async fn bulk_latest_by_hash(
        &self,
        hashes: &[String],
        _algorithm: &str,
        _loaders: &[String],
        _game_versions: &[String],
    ) -> Result<HashMap<String, Option<RemoteVersion>>, CatalogError> {
        self.calls.lock().unwrap().bulk += 1;
        Ok(hashes
            .iter()
            .map(|h| (h.clone(), self.bulk_results.get(h).cloned()))
            .collect())
    }

    async fn download(
        &self,
        url: &str,
        dest: &Path,
        _expected_sha512: &str,
    ) -> Result<(), CatalogError> {
        self.calls.lock().unwrap().download += 1;
        let bytes = self
            .files
            .get(url)
            .ok_or_else(|| CatalogError::unavailable(url, "connection reset"))?;
        std::fs::write(dest, bytes).map_err(|e| CatalogError::unavailable(url, e))
    }
}

/// Real jar reader that counts how often it is consulted
#[derive(Default)]
pub struct CountingManifestReader {
    reads: AtomicUsize,
}

impl CountingManifestReader {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl ManifestReader for CountingManifestReader {
    fn read(&self, path: &Path) -> Result<ManifestInfo, ManifestError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        JarManifestReader.read(path)
    }
}

/// Fabric descriptor declaring `id` and `name`
pub fn fabric_manifest(id: &str, name: &str) -> String {
    format!(r#"{{"schemaVersion": 1, "id": "{}", "name": "{}"}}"#, id, name)
}
