use crate::api::{CatalogError, CatalogSource, RetryPolicy};
use crate::config::SyncConfig;
use crate::models::{
    DependencyType, RemoteVersion, SearchHit, SearchQuery, VersionDependency, VersionFile,
    VersionType,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;

pub const MODRINTH_API_BASE: &str = "https://api.modrinth.com/v2";
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Deserialize)]
struct ModrinthSearchResult {
    hits: Vec<ModrinthProjectHit>,
}

#[derive(Deserialize)]
struct ModrinthProjectHit {
    project_id: String,
    slug: String,
    title: String,
}

#[derive(Deserialize)]
struct ModrinthVersion {
    id: String,
    project_id: String,
    version_number: String,
    game_versions: Vec<String>,
    loaders: Vec<String>,
    files: Vec<ModrinthFile>,
    version_type: String,
    #[serde(default)]
    dependencies: Vec<ModrinthDependency>,
    date_published: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ModrinthDependency {
    version_id: Option<String>,
    project_id: Option<String>,
    dependency_type: String,
}

#[derive(Deserialize)]
struct ModrinthFile {
    url: String,
    filename: String,
    hashes: ModrinthHashes,
    #[serde(default)]
    primary: bool,
}

#[derive(Deserialize)]
struct ModrinthHashes {
    #[serde(default)]
    sha512: String,
}

#[derive(Serialize)]
struct BulkUpdateRequest<'a> {
    hashes: &'a [String],
    algorithm: &'a str,
    loaders: &'a [String],
    game_versions: &'a [String],
}

impl From<ModrinthVersion> for RemoteVersion {
    fn from(v: ModrinthVersion) -> Self {
        let dependencies = v
            .dependencies
            .into_iter()
            .filter_map(|d| {
                let Some(project_id) = d.project_id else {
                    log::debug!(
                        "[Modrinth] Skipping version-only dependency {:?} of {}",
                        d.version_id,
                        v.id
                    );
                    return None;
                };
                Some(VersionDependency {
                    project_id,
                    pinned_version_id: d.version_id,
                    dependency_type: match d.dependency_type.as_str() {
                        "required" => DependencyType::Required,
                        "optional" => DependencyType::Optional,
                        "incompatible" => DependencyType::Incompatible,
                        "embedded" => DependencyType::Embedded,
                        _ => DependencyType::Optional,
                    },
                })
            })
            .collect();

        RemoteVersion {
            version_id: v.id,
            project_id: v.project_id,
            version_number: v.version_number,
            game_versions: v.game_versions,
            loaders: v.loaders,
            version_type: match v.version_type.as_str() {
                "release" => VersionType::Release,
                "beta" => VersionType::Beta,
                "alpha" => VersionType::Alpha,
                _ => VersionType::Release,
            },
            date_published: v.date_published,
            files: v
                .files
                .into_iter()
                .map(|f| VersionFile {
                    filename: f.filename,
                    url: f.url,
                    sha512: f.hashes.sha512,
                    is_primary: f.primary,
                })
                .collect(),
            dependencies,
        }
    }
}

/// Modrinth v2 API client
pub struct ModrinthClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl ModrinthClient {
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self, CatalogError> {
        Self::new(&config.api_base_url, &config.user_agent)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Send a request built by `build`, retrying per policy, and decode the JSON body
    async fn request_json<T, F>(&self, label: &str, url: &str, build: F) -> Result<T, CatalogError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let build = &build;
        let client = &self.client;
        self.retry
            .run(label, move || async move {
                let response = build(client)
                    .send()
                    .await
                    .map_err(|e| CatalogError::unavailable(url, e))?;

                let status = response.status();
                if status == StatusCode::NOT_FOUND {
                    log::debug!("[Modrinth] 404 for {}", url);
                    return Err(CatalogError::NotFound {
                        resource: url.to_string(),
                    });
                }
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(CatalogError::unavailable(url, format!("{}: {}", status, body)));
                }

                response.json::<T>().await.map_err(|e| CatalogError::Decode {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            })
            .await
    }

    async fn download_once(
        &self,
        url: &str,
        dest: &Path,
        expected_sha512: &str,
    ) -> Result<(), CatalogError> {
        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::unavailable(url, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound {
                resource: url.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(CatalogError::unavailable(url, format!("HTTP {}", response.status())));
        }

        // Stage into a sibling .part file so a failed transfer never clobbers the destination
        let tmp_name = format!(
            "{}.part",
            dest.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("download")
        );
        let tmp_path = dest.with_file_name(tmp_name);
        let io_err = |e: std::io::Error| CatalogError::unavailable(url, e);

        let mut file = tokio::fs::File::create(&tmp_path).await.map_err(io_err)?;
        let written = write_verified(&mut file, response, url, expected_sha512).await;
        drop(file);
        let staged = match written {
            Ok(downloaded) => tokio::fs::rename(&tmp_path, dest)
                .await
                .map(|()| downloaded)
                .map_err(io_err),
            Err(e) => Err(e),
        };
        let downloaded = match staged {
            Ok(downloaded) => downloaded,
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                return Err(e);
            }
        };

        log::info!(
            "[Modrinth] Downloaded {} ({} bytes, {:.2}s)",
            url,
            downloaded,
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }
}

/// Stream the body into `file`, returning the byte count once the SHA-512 matches
async fn write_verified(
    file: &mut tokio::fs::File,
    response: reqwest::Response,
    url: &str,
    expected_sha512: &str,
) -> Result<u64, CatalogError> {
    let io_err = |e: std::io::Error| CatalogError::unavailable(url, e);
    let mut hasher = Sha512::new();
    let mut downloaded: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| CatalogError::unavailable(url, e))?;
        file.write_all(&chunk).await.map_err(io_err)?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
    }
    file.flush().await.map_err(io_err)?;
    file.sync_all().await.map_err(io_err)?;

    let computed = hex::encode(hasher.finalize());
    if !computed.eq_ignore_ascii_case(expected_sha512) {
        return Err(CatalogError::unavailable(
            url,
            format!("SHA-512 mismatch: expected {}, got {}", expected_sha512, computed),
        ));
    }
    Ok(downloaded)
}

#[async_trait]
impl CatalogSource for ModrinthClient {
    async fn search_projects(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, CatalogError> {
        let url = self.endpoint("search");
        let facets = serde_json::to_string(&query.facets).map_err(|e| CatalogError::Decode {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        let limit = query.limit.to_string();

        let result: ModrinthSearchResult = self
            .request_json("search", &url, |client| {
                client.get(&url).query(&[
                    ("query", query.text.as_str()),
                    ("index", "relevance"),
                    ("limit", limit.as_str()),
                    ("facets", facets.as_str()),
                ])
            })
            .await?;

        log::debug!(
            "[Modrinth] Search '{}' returned {} hits",
            query.text,
            result.hits.len()
        );

        Ok(result
            .hits
            .into_iter()
            .map(|hit| SearchHit {
                project_id: hit.project_id,
                slug: hit.slug,
                title: hit.title,
            })
            .collect())
    }

    async fn list_versions(&self, project_id: &str) -> Result<Vec<RemoteVersion>, CatalogError> {
        let url = self.endpoint(&format!("project/{}/version", project_id));
        let versions: Vec<ModrinthVersion> = self
            .request_json("list versions", &url, |client| client.get(&url))
            .await?;
        Ok(versions.into_iter().map(RemoteVersion::from).collect())
    }

    async fn get_version(
        &self,
        project_id: &str,
        version_id: &str,
    ) -> Result<RemoteVersion, CatalogError> {
        let url = self.endpoint(&format!("project/{}/version/{}", project_id, version_id));
        let version: ModrinthVersion = self
            .request_json("get version", &url, |client| client.get(&url))
            .await?;
        Ok(version.into())
    }

    async fn bulk_latest_by_hash(
        &self,
        hashes: &[String],
        algorithm: &str,
        loaders: &[String],
        game_versions: &[String],
    ) -> Result<HashMap<String, Option<RemoteVersion>>, CatalogError> {
        if hashes.is_empty() {
            return Ok(HashMap::new());
        }

        let url = self.endpoint("version_files/update");
        let body = BulkUpdateRequest {
            hashes,
            algorithm,
            loaders,
            game_versions,
        };
        let mut found: HashMap<String, ModrinthVersion> = self
            .request_json("bulk update lookup", &url, |client| client.post(&url).json(&body))
            .await?;

        Ok(hashes
            .iter()
            .map(|hash| (hash.clone(), found.remove(hash).map(RemoteVersion::from)))
            .collect())
    }

    async fn download(
        &self,
        url: &str,
        dest: &Path,
        expected_sha512: &str,
    ) -> Result<(), CatalogError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CatalogError::unavailable(url, e))?;
        }
        self.retry
            .run("download", move || self.download_once(url, dest, expected_sha512))
            .await
    }
}
