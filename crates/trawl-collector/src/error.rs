use std::path::PathBuf;

use thiserror::Error;

/// Errors that prevent a well-defined scan of the workspace.
///
/// Any of these is fatal to the run: a partial listing is never returned.
#[derive(Debug, Error)]
pub enum WorkspaceError {
  /// Reading a directory or file metadata failed.
  #[error("failed to read '{}': {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The workspace root exists but is not a directory.
  #[error("workspace root '{}' is not a directory", path.display())]
  NotADirectory { path: PathBuf },

  /// An artifact directory resolves outside the workspace root.
  #[error("artifact directory '{}' is outside workspace '{}'", path.display(), root.display())]
  OutsideWorkspace { path: PathBuf, root: PathBuf },
}

impl WorkspaceError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }
}
