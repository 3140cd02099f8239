use crate::index::LocalIndex;
use crate::models::{DependencyRequest, RemoteVersion};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Projects already present locally, with every version they are known at
#[derive(Debug, Default, Clone)]
pub struct KnownProjects {
    versions: HashMap<String, HashSet<String>>,
}

impl KnownProjects {
    pub fn from_index(index: &LocalIndex) -> Self {
        let mut known = Self::default();
        for entry in index.entries() {
            known.insert(&entry.project_id, &entry.version_id);
        }
        known
    }

    pub fn insert(&mut self, project_id: &str, version_id: &str) {
        self.versions
            .entry(project_id.to_string())
            .or_default()
            .insert(version_id.to_string());
    }

    /// True if the project is present and, when a pin is given, present at that version
    pub fn satisfies(&self, project_id: &str, pinned_version_id: Option<&str>) -> bool {
        match (self.versions.get(project_id), pinned_version_id) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(known), Some(pin)) => known.contains(pin),
        }
    }
}

/// Required dependencies of `version` that are not yet satisfied locally.
///
/// Optional, incompatible and embedded dependencies are never requested. A project
/// listed more than once yields a single request (the first pin wins).
pub fn expand(version: &RemoteVersion, known: &KnownProjects) -> Vec<DependencyRequest> {
    let mut requests: Vec<DependencyRequest> = Vec::new();
    for dep in version.required_dependencies() {
        if dep.project_id == version.project_id {
            continue;
        }
        if known.satisfies(&dep.project_id, dep.pinned_version_id.as_deref()) {
            log::debug!(
                "[DependencyExpander] {} already satisfied for {}",
                dep.project_id,
                version.project_id
            );
            continue;
        }
        if requests.iter().any(|r| r.project_id == dep.project_id) {
            continue;
        }
        requests.push(DependencyRequest {
            project_id: dep.project_id.clone(),
            pinned_version_id: dep.pinned_version_id.clone(),
            parent_project_ids: BTreeSet::from([version.project_id.clone()]),
        });
    }
    requests
}

/// Fold the requests of one wave together, dropping projects already `seen` this run.
///
/// The same project requested by several parents becomes one request carrying every
/// parent; the first pin encountered is kept. Accepted ids are added to `seen`.
pub fn merge_wave(
    batches: impl IntoIterator<Item = Vec<DependencyRequest>>,
    seen: &mut HashSet<String>,
) -> Vec<DependencyRequest> {
    let mut merged: Vec<DependencyRequest> = Vec::new();
    for request in batches.into_iter().flatten() {
        if let Some(existing) = merged.iter_mut().find(|r| r.project_id == request.project_id) {
            existing.parent_project_ids.extend(request.parent_project_ids);
            if existing.pinned_version_id.is_none() {
                existing.pinned_version_id = request.pinned_version_id;
            }
            continue;
        }
        if seen.contains(&request.project_id) {
            continue;
        }
        merged.push(request);
    }
    seen.extend(merged.iter().map(|r| r.project_id.clone()));
    merged
}
