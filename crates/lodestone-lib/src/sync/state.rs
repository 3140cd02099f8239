use std::fmt;

/// Lifecycle of one archive or dependency within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveState {
    Discovered,
    Identified,
    VersionResolved,
    UpToDate,
    DownloadPending,
    Done,
    Failed,
}

impl ArchiveState {
    pub fn can_transition_to(&self, next: ArchiveState) -> bool {
        use ArchiveState::*;
        matches!(
            (self, next),
            (Discovered, Identified)
                | (Discovered, Failed)
                | (Identified, VersionResolved)
                | (Identified, Failed)
                | (VersionResolved, UpToDate)
                | (VersionResolved, DownloadPending)
                | (VersionResolved, Failed)
                | (DownloadPending, Done)
                | (DownloadPending, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ArchiveState::UpToDate | ArchiveState::Done | ArchiveState::Failed
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ArchiveState::UpToDate | ArchiveState::Done)
    }
}

impl fmt::Display for ArchiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ArchiveState::Discovered => "discovered",
            ArchiveState::Identified => "identified",
            ArchiveState::VersionResolved => "version resolved",
            ArchiveState::UpToDate => "up to date",
            ArchiveState::DownloadPending => "download pending",
            ArchiveState::Done => "updated",
            ArchiveState::Failed => "failed",
        };
        f.write_str(label)
    }
}
