use super::state::ArchiveState;
use crate::error::SyncError;
use crate::models::ResolvedIdentity;
use std::fmt;

/// Final outcome for one archive or installed dependency
#[derive(Debug, Clone)]
pub struct ArchiveReport {
    /// File name for scanned archives, project id for dependencies
    pub name: String,
    pub identity: Option<ResolvedIdentity>,
    pub target_version_id: Option<String>,
    /// File written by this run, if any
    pub installed_file: Option<String>,
    /// File removed by this run, if any
    pub removed_file: Option<String>,
    pub state: ArchiveState,
    pub error: Option<SyncError>,
}

impl ArchiveReport {
    pub fn is_dependency(&self) -> bool {
        self.identity.as_ref().map(|i| i.is_dependency).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub archives: Vec<ArchiveReport>,
    pub dry_run: bool,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.archives.len()
    }

    pub fn succeeded(&self) -> usize {
        self.archives.iter().filter(|a| a.state.is_success()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ArchiveReport> {
        self.archives
            .iter()
            .filter(|a| a.state == ArchiveState::Failed)
    }

    pub fn downloaded(&self) -> impl Iterator<Item = &ArchiveReport> {
        self.archives.iter().filter(|a| a.state == ArchiveState::Done)
    }

    /// Downloads planned but not performed (dry runs)
    pub fn pending(&self) -> impl Iterator<Item = &ArchiveReport> {
        self.archives
            .iter()
            .filter(|a| a.state == ArchiveState::DownloadPending)
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &ArchiveReport> {
        self.archives.iter().filter(|a| a.is_dependency())
    }

    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}/{} archives synchronized",
            self.succeeded(),
            self.total()
        );
        let pending = self.pending().count();
        if self.dry_run && pending > 0 {
            line.push_str(&format!(", {} update(s) pending (dry run)", pending));
        }
        line
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for archive in &self.archives {
            let tag = if archive.is_dependency() { " (dependency)" } else { "" };
            write!(f, "{:<16} {}{}", archive.state.to_string(), archive.name, tag)?;
            if let Some(version) = &archive.target_version_id {
                write!(f, " -> {}", version)?;
            }
            if let Some(err) = &archive.error {
                write!(f, ": {}", err)?;
            }
            writeln!(f)?;
        }
        write!(f, "{}", self.summary())
    }
}
