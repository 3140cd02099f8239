//! Keeps a directory of mod archives in sync with the latest compatible releases on
//! Modrinth.

pub mod api;
pub mod config;
pub mod error;
pub mod index;
pub mod manifest;
pub mod models;
pub mod scan;
pub mod sync;
pub mod utils;

pub use api::{CatalogError, CatalogSource, ModrinthClient, RetryPolicy};
pub use config::{ConfigError, SyncConfig, VersionConstraints};
pub use error::SyncError;
pub use index::{IndexError, LocalIndex};
pub use manifest::{JarManifestReader, ManifestError, ManifestReader};
pub use sync::{ArchiveState, SyncOrchestrator, SyncReport};
