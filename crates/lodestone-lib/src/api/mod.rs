//! Remote catalog access.
//!
//! The sync core only ever talks to a [`CatalogSource`]; [`ModrinthClient`] is the
//! HTTP implementation. Retry/backoff lives behind this seam, so callers see either a
//! value, a definitive [`CatalogError::NotFound`], or a retry-exhausted failure.

use crate::models::{RemoteVersion, SearchHit, SearchQuery};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

pub mod error;
pub mod modrinth;
pub mod retry;

pub use error::CatalogError;
pub use modrinth::ModrinthClient;
pub use retry::RetryPolicy;

pub const HASH_ALGORITHM: &str = "sha512";

#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Ranked by the service's relevance ordering
    async fn search_projects(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, CatalogError>;

    async fn list_versions(&self, project_id: &str) -> Result<Vec<RemoteVersion>, CatalogError>;

    async fn get_version(
        &self,
        project_id: &str,
        version_id: &str,
    ) -> Result<RemoteVersion, CatalogError>;

    /// Latest compatible version per file hash. Every requested hash is present in the
    /// returned map; hashes the service does not know map to `None`.
    async fn bulk_latest_by_hash(
        &self,
        hashes: &[String],
        algorithm: &str,
        loaders: &[String],
        game_versions: &[String],
    ) -> Result<HashMap<String, Option<RemoteVersion>>, CatalogError>;

    /// Download `url` to `dest`, rejecting content whose SHA-512 differs from `expected_sha512`
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        expected_sha512: &str,
    ) -> Result<(), CatalogError>;
}
