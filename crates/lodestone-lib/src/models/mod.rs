pub mod archive;
pub mod catalog;

pub use archive::{
    ArchiveRecord, DependencyRequest, DownloadTask, IndexEntry, ManifestInfo, ResolvedIdentity,
};
pub use catalog::{
    DependencyType, RemoteVersion, SearchHit, SearchQuery, VersionDependency, VersionFile,
    VersionType,
};
