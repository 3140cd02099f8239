use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

/// Release channel of a published version
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VersionType {
    Release,
    Beta,
    Alpha,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    Required,
    Optional,
    Incompatible,
    Embedded,
}

/// One downloadable file attached to a version
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct VersionFile {
    pub filename: String,
    pub url: String,
    pub sha512: String,
    pub is_primary: bool,
}

impl VersionFile {
    /// True if `filename` is one plain path component, so it stays inside the directory
    /// it is joined onto.
    pub fn has_plain_filename(&self) -> bool {
        if self.filename.contains(['/', '\\']) {
            return false;
        }
        let mut components = Path::new(&self.filename).components();
        matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct VersionDependency {
    pub project_id: String,
    pub dependency_type: DependencyType,
    pub pinned_version_id: Option<String>,
}

/// A version record as returned by the remote catalog
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RemoteVersion {
    pub version_id: String,
    pub project_id: String,
    pub version_number: String,
    pub game_versions: Vec<String>,
    pub loaders: Vec<String>,
    pub version_type: VersionType,
    pub date_published: DateTime<Utc>,
    pub files: Vec<VersionFile>,
    pub dependencies: Vec<VersionDependency>,
}

impl RemoteVersion {
    /// The first file flagged as primary. Versions without one have nothing installable.
    pub fn primary_file(&self) -> Option<&VersionFile> {
        self.files.iter().find(|f| f.is_primary)
    }

    /// True if this version's primary file has exactly the given content hash
    pub fn primary_hash_matches(&self, sha512: &str) -> bool {
        self.primary_file()
            .map(|f| f.sha512.eq_ignore_ascii_case(sha512))
            .unwrap_or(false)
    }

    pub fn required_dependencies(&self) -> impl Iterator<Item = &VersionDependency> {
        self.dependencies
            .iter()
            .filter(|d| d.dependency_type == DependencyType::Required)
    }
}

/// Search request against the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub project_type: String,
    pub limit: u32,
    /// Outer list is AND, inner lists are OR (`[["project_type:mod"],["categories:fabric"]]`)
    pub facets: Vec<Vec<String>>,
}

impl SearchQuery {
    /// Mod search restricted to one loader and game version
    pub fn for_mod(text: &str, loader: &str, game_version: &str, limit: u32) -> Self {
        Self {
            text: text.to_string(),
            project_type: "mod".to_string(),
            limit,
            facets: vec![
                vec!["project_type:mod".to_string()],
                vec![format!("categories:{}", loader)],
                vec![format!("versions:{}", game_version)],
            ],
        }
    }
}

/// One ranked search result
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub project_id: String,
    pub slug: String,
    pub title: String,
}
