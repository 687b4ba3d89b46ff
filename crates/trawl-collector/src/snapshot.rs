//! Modification-time snapshots.

use std::collections::BTreeMap;

use crate::artifact::Artifact;
use crate::error::WorkspaceError;
use crate::scan::Collector;

/// Relative path to modification time, taken before the agent runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
  entries: BTreeMap<String, Option<u128>>,
}

impl Snapshot {
  /// Record the current state of everything the collector would return.
  pub fn capture(collector: &Collector) -> Result<Self, WorkspaceError> {
    Ok(Self::from_artifacts(collector.collect()?))
  }

  pub fn from_artifacts(artifacts: impl IntoIterator<Item = Artifact>) -> Self {
    Self {
      entries: artifacts
        .into_iter()
        .map(|a| (a.relative_path, a.modified_ns))
        .collect(),
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Whether `artifact` is new or was modified since the snapshot.
  ///
  /// Files without a readable modification time always count as changed.
  pub fn is_changed(&self, artifact: &Artifact) -> bool {
    match self.entries.get(&artifact.relative_path) {
      None => true,
      Some(None) => true,
      Some(Some(before)) => artifact.modified_ns != Some(*before),
    }
  }
}
