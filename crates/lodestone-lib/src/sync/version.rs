use crate::api::CatalogSource;
use crate::config::VersionConstraints;
use crate::error::SyncError;
use crate::models::RemoteVersion;

pub fn is_compatible(version: &RemoteVersion, constraints: &VersionConstraints) -> bool {
    version
        .game_versions
        .iter()
        .any(|v| *v == constraints.game_version)
        && version.loaders.iter().any(|l| *l == constraints.loader)
        && constraints
            .allowed_version_types
            .contains(&version.version_type)
}

/// Newest compatible version by publish date.
///
/// Ties keep the earliest entry in list order. Returns `None` when nothing passes the
/// game version, loader and release channel filters.
pub fn select_target<'a>(
    versions: &'a [RemoteVersion],
    constraints: &VersionConstraints,
) -> Option<&'a RemoteVersion> {
    let mut best: Option<&RemoteVersion> = None;
    for version in versions.iter().filter(|v| is_compatible(v, constraints)) {
        match best {
            Some(current) if version.date_published <= current.date_published => {}
            _ => best = Some(version),
        }
    }
    best
}

/// Choose the version to install for a project.
///
/// A pinned version is fetched as-is, without compatibility filtering.
pub async fn resolve_target(
    catalog: &dyn CatalogSource,
    project_id: &str,
    pinned_version_id: Option<&str>,
    constraints: &VersionConstraints,
) -> Result<RemoteVersion, SyncError> {
    if let Some(version_id) = pinned_version_id {
        log::debug!("[VersionResolver] {} is pinned to {}", project_id, version_id);
        return Ok(catalog.get_version(project_id, version_id).await?);
    }

    let versions = catalog.list_versions(project_id).await?;
    match select_target(&versions, constraints) {
        Some(target) => {
            log::debug!(
                "[VersionResolver] {} -> {} ({} candidates)",
                project_id,
                target.version_id,
                versions.len()
            );
            Ok(target.clone())
        }
        None => Err(SyncError::NoCompatibleVersion {
            project_id: project_id.to_string(),
            loader: constraints.loader.clone(),
            game_version: constraints.game_version.clone(),
        }),
    }
}
