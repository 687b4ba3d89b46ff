//! Artifact types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;

/// Where an artifact was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
  /// Written into the workspace by the agent.
  Workspace,
  /// Dropped by the browser automation server into its artifact directory.
  Playwright,
}

impl Category {
  pub fn as_str(&self) -> &'static str {
    match self {
      Category::Workspace => "workspace",
      Category::Playwright => "playwright",
    }
  }
}

/// Broad file kind, inferred from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
  Document,
  Data,
  Image,
  Markup,
  Archive,
}

impl ArtifactKind {
  /// Classify a lowercase extension (without the dot).
  pub fn from_extension(ext: &str) -> Option<Self> {
    let kind = match ext {
      "md" | "markdown" | "txt" | "pdf" => ArtifactKind::Document,
      "json" | "csv" | "yaml" | "yml" => ArtifactKind::Data,
      "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "svg" => ArtifactKind::Image,
      "html" | "htm" => ArtifactKind::Markup,
      "zip" => ArtifactKind::Archive,
      _ => return None,
    };
    Some(kind)
  }
}

/// A file discovered in the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
  /// Absolute location on disk.
  pub path: PathBuf,
  /// Path relative to the workspace root, `/`-separated.
  pub relative_path: String,
  /// Path relative to the directory it was scanned from, `/`-separated.
  ///
  /// Equal to `relative_path` for workspace files; for tool artifacts it
  /// drops the artifact directory prefix.
  pub source_path: String,
  pub category: Category,
  pub kind: ArtifactKind,
  pub size: u64,
  /// Modification time in nanoseconds since the epoch, when available.
  pub modified_ns: Option<u128>,
}

impl Artifact {
  /// Lowercase extension without the dot.
  pub fn extension(&self) -> Option<String> {
    Path::new(&self.source_path)
      .extension()
      .and_then(|e| e.to_str())
      .map(|e| e.to_ascii_lowercase())
  }
}

/// The result of a scan: an ordered, single-pass sequence of artifacts.
///
/// The listing behind it is complete; iterating only hands the artifacts out.
#[derive(Debug)]
pub struct Artifacts {
  inner: std::vec::IntoIter<Artifact>,
}

impl Artifacts {
  pub(crate) fn new(mut artifacts: Vec<Artifact>) -> Self {
    artifacts.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    artifacts.dedup_by(|a, b| a.relative_path == b.relative_path);
    Self {
      inner: artifacts.into_iter(),
    }
  }

  pub fn empty() -> Self {
    Self::new(Vec::new())
  }

  /// Keep only artifacts that are new or modified relative to `baseline`.
  pub fn changed_since(self, baseline: &Snapshot) -> Self {
    Self {
      inner: self
        .inner
        .filter(|a| baseline.is_changed(a))
        .collect::<Vec<_>>()
        .into_iter(),
    }
  }
}

impl Iterator for Artifacts {
  type Item = Artifact;

  fn next(&mut self) -> Option<Artifact> {
    self.inner.next()
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    self.inner.size_hint()
  }
}

impl ExactSizeIterator for Artifacts {}
