//! Trawl Collector
//!
//! Discovers the files an agent run left behind. Collection is a pure
//! function of the filesystem: the same workspace always yields the same
//! artifacts in the same order, independent of any upload side effect.
//!
//! Two kinds of location are scanned:
//! - the workspace root, skipping tool and cache directories
//! - known artifact subdirectories where automation tools drop their own
//!   output (traces, screenshots)
//!
//! [`Snapshot`] records modification times so a run can publish only the
//! files it created or changed.

mod artifact;
mod error;
mod scan;
mod snapshot;

pub use artifact::{Artifact, ArtifactKind, Artifacts, Category};
pub use error::WorkspaceError;
pub use scan::{ALLOWED_EXTENSIONS, Collector, EXCLUDED_DIRS, collect};
pub use snapshot::Snapshot;
