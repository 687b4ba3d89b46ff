//! Workspace scanning.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use tracing::debug;

use crate::artifact::{Artifact, ArtifactKind, Artifacts, Category};
use crate::error::WorkspaceError;

/// File extensions eligible for publishing.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
  "html", "htm", "md", "markdown", "txt", "json", "csv", "yaml", "yml", "pdf", "png", "jpg",
  "jpeg", "gif", "webp", "bmp", "svg", "zip",
];

/// Directory names never descended into when scanning the workspace root.
pub const EXCLUDED_DIRS: &[&str] = &[
  ".apify_storage",
  ".cache",
  ".config",
  ".git",
  ".local",
  ".npm",
  ".playwright-mcp",
  ".venv",
  "__pycache__",
  "node_modules",
  "src",
  "storage",
  "venv",
];

/// Scans a workspace for artifacts.
///
/// ```text
/// {root}/
/// ├── report.md            -> workspace
/// ├── palette.json         -> workspace
/// ├── node_modules/...     (excluded)
/// └── .playwright-mcp/     (artifact dir, scanned without exclusions)
///     └── trace.png        -> playwright
/// ```
#[derive(Debug, Clone)]
pub struct Collector {
  root: PathBuf,
  artifact_dirs: Vec<PathBuf>,
  allowed: BTreeSet<String>,
  excluded: BTreeSet<String>,
}

impl Collector {
  /// Create a collector for the given workspace root with the default
  /// extension allow-list and exclusions.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      artifact_dirs: Vec::new(),
      allowed: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
      excluded: EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect(),
    }
  }

  /// Add a known artifact directory. Relative paths are taken relative to
  /// the workspace root.
  pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.artifact_dirs.push(dir.into());
    self
  }

  /// Replace the extension allow-list. Extensions are matched case-insensitively.
  pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    self.allowed = extensions
      .into_iter()
      .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
      .collect();
    self
  }

  /// Replace the set of excluded directory names.
  pub fn with_excluded_dirs<I, S>(mut self, dirs: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    self.excluded = dirs.into_iter().map(|d| d.as_ref().to_string()).collect();
    self
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Scan the workspace.
  ///
  /// A missing root yields an empty listing. Anything else that prevents a
  /// complete scan is an error.
  pub fn collect(&self) -> Result<Artifacts, WorkspaceError> {
    match fs::metadata(&self.root) {
      Ok(meta) if !meta.is_dir() => {
        return Err(WorkspaceError::NotADirectory {
          path: self.root.clone(),
        });
      }
      Ok(_) => {}
      Err(e) if e.kind() == ErrorKind::NotFound => {
        debug!(root = %self.root.display(), "workspace_missing");
        return Ok(Artifacts::empty());
      }
      Err(e) => return Err(WorkspaceError::io(&self.root, e)),
    }

    let root = fs::canonicalize(&self.root).map_err(|e| WorkspaceError::io(&self.root, e))?;
    let artifact_dirs = self.resolve_artifact_dirs(&root)?;

    let mut found = Vec::new();
    let no_exclusions = BTreeSet::new();

    self.walk(
      &root,
      &root,
      Category::Workspace,
      &self.excluded,
      &artifact_dirs,
      &mut found,
    )?;

    for dir in &artifact_dirs {
      self.walk(
        &root,
        dir,
        Category::Playwright,
        &no_exclusions,
        &[],
        &mut found,
      )?;
    }

    debug!(
      root = %root.display(),
      artifact_dirs = artifact_dirs.len(),
      artifacts = found.len(),
      "workspace_scanned"
    );

    Ok(Artifacts::new(found))
  }

  /// Canonicalize artifact directories and check they stay inside the root.
  /// Directories that do not exist are dropped.
  fn resolve_artifact_dirs(&self, root: &Path) -> Result<Vec<PathBuf>, WorkspaceError> {
    let mut resolved = Vec::new();

    for dir in &self.artifact_dirs {
      let joined = if dir.is_absolute() {
        dir.clone()
      } else {
        self.root.join(dir)
      };

      let canonical = match fs::canonicalize(&joined) {
        Ok(path) => path,
        Err(e) if e.kind() == ErrorKind::NotFound => continue,
        Err(e) => return Err(WorkspaceError::io(&joined, e)),
      };

      if !canonical.starts_with(root) {
        return Err(WorkspaceError::OutsideWorkspace {
          path: joined,
          root: root.to_path_buf(),
        });
      }

      if canonical.is_dir() && !resolved.contains(&canonical) {
        resolved.push(canonical);
      }
    }

    Ok(resolved)
  }

  /// Depth-first walk of `base`. Symlinks and special files are skipped.
  fn walk(
    &self,
    root: &Path,
    base: &Path,
    category: Category,
    excluded: &BTreeSet<String>,
    skip_dirs: &[PathBuf],
    found: &mut Vec<Artifact>,
  ) -> Result<(), WorkspaceError> {
    let mut pending = vec![base.to_path_buf()];

    while let Some(dir) = pending.pop() {
      let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        // Removed between listing and descent.
        Err(e) if e.kind() == ErrorKind::NotFound && dir != base => continue,
        Err(e) => return Err(WorkspaceError::io(&dir, e)),
      };

      for entry in entries {
        let entry = entry.map_err(|e| WorkspaceError::io(&dir, e))?;
        let path = entry.path();
        let file_type = entry
          .file_type()
          .map_err(|e| WorkspaceError::io(&path, e))?;

        if file_type.is_symlink() {
          continue;
        }

        if file_type.is_dir() {
          let name = entry.file_name();
          let name = name.to_string_lossy();
          if excluded.contains(name.as_ref()) || skip_dirs.contains(&path) {
            continue;
          }
          pending.push(path);
          continue;
        }

        if !file_type.is_file() {
          continue;
        }

        let Some(ext) = path
          .extension()
          .and_then(|e| e.to_str())
          .map(|e| e.to_ascii_lowercase())
        else {
          continue;
        };
        if !self.allowed.contains(&ext) {
          continue;
        }

        let metadata = match entry.metadata() {
          Ok(m) => m,
          Err(e) if e.kind() == ErrorKind::NotFound => continue,
          Err(e) => return Err(WorkspaceError::io(&path, e)),
        };

        let modified_ns = metadata
          .modified()
          .ok()
          .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
          .map(|d| d.as_nanos());

        found.push(Artifact {
          relative_path: slash_path(&path, root),
          source_path: slash_path(&path, base),
          kind: ArtifactKind::from_extension(&ext).unwrap_or(ArtifactKind::Document),
          category,
          size: metadata.len(),
          modified_ns,
          path,
        });
      }
    }

    Ok(())
  }
}

/// Collect artifacts from `workspace_root` and the given artifact directories
/// using the default allow-list and exclusions.
pub fn collect(
  workspace_root: &Path,
  known_artifact_subdirs: &[PathBuf],
) -> Result<Artifacts, WorkspaceError> {
  known_artifact_subdirs
    .iter()
    .fold(Collector::new(workspace_root), |c, dir| {
      c.with_artifact_dir(dir)
    })
    .collect()
}

/// `path` relative to `base`, with `/` separators on every platform.
fn slash_path(path: &Path, base: &Path) -> String {
  let relative = path.strip_prefix(base).unwrap_or(path);
  relative
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}
