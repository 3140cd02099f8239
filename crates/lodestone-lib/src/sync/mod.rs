//! The identification and resolution pipeline.

pub mod dependency;
pub mod identity;
pub mod orchestrator;
pub mod report;
pub mod state;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use dependency::{expand, KnownProjects};
pub use identity::IdentityResolver;
pub use orchestrator::SyncOrchestrator;
pub use report::{ArchiveReport, SyncReport};
pub use state::ArchiveState;
pub use version::{resolve_target, select_target};
