//! Runtime error types.

use trawl_artifact::StoreError;
use trawl_collector::WorkspaceError;
use trawl_config::ConfigError;
use trawl_dataset::DatasetError;

/// Errors that abort a run.
///
/// Per-artifact upload failures are not errors at this level; they are
/// collected into the [`ResultRecord`](crate::ResultRecord).
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// The request or configuration was rejected before anything ran.
  #[error("configuration error: {0}")]
  Config(#[from] ConfigError),

  /// The workspace could not be prepared or scanned.
  #[error("workspace error: {0}")]
  Workspace(#[from] WorkspaceError),

  /// The key-value store could not be opened or read.
  #[error("store error: {0}")]
  Store(#[from] StoreError),

  /// The result could not be appended to the dataset.
  #[error("dataset error: {0}")]
  Dataset(#[from] DatasetError),
}
