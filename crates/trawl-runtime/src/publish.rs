//! Artifact publishing.
//!
//! Keys are allocated one artifact at a time in collection order, so the
//! same workspace always maps to the same keys. Reads and uploads run with
//! bounded concurrency around that sequential step:
//!
//! ```text
//! artifacts ──> read + digest (buffered) ──> allocate key (in order) ──> put (buffered)
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use trawl_artifact::{Store, StoreError, content_type_for, derive_key, with_suffix};
use trawl_collector::{Artifact, Category};

use crate::result::{PublishFailure, StoredFile};

/// Uploads in flight at once when nothing else is configured.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Outcome of publishing a batch of artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
  pub attempted: usize,
  /// Stored references, in collection order.
  pub stored: Vec<StoredFile>,
  pub failures: Vec<PublishFailure>,
}

struct Prepared {
  artifact: Artifact,
  data: Bytes,
  digest: String,
}

enum Allocation {
  /// Identical content was already stored under this reference.
  Reused(StoredFile),
  Fresh { prepared: Prepared, key: String },
}

#[derive(Default)]
struct Ledger {
  /// Every key in use or reserved by an upload in flight.
  taken: HashSet<String>,
  /// What has been stored for each workspace path.
  published: HashMap<(Category, String), Vec<StoredFile>>,
}

/// Publishes artifacts into one run-scoped store.
pub struct Publisher {
  store: Arc<dyn Store>,
  run_id: String,
  concurrency: usize,
  ledger: Mutex<Ledger>,
}

impl Publisher {
  /// Create a publisher for `run_id`.
  ///
  /// Keys already present in the store under the run's prefix are treated
  /// as taken, so a rerun never overwrites an earlier upload.
  pub async fn open(
    store: Arc<dyn Store>,
    run_id: impl Into<String>,
    concurrency: usize,
  ) -> Result<Self, StoreError> {
    let run_id = run_id.into();
    let prefix = if run_id.is_empty() {
      String::new()
    } else {
      format!("{}_", run_id)
    };
    let taken: HashSet<String> = store.list(&prefix).await?.into_iter().collect();
    debug!(run_id = %run_id, existing = taken.len(), "publisher_opened");

    Ok(Self {
      store,
      run_id,
      concurrency: concurrency.max(1),
      ledger: Mutex::new(Ledger {
        taken,
        published: HashMap::new(),
      }),
    })
  }

  pub fn run_id(&self) -> &str {
    &self.run_id
  }

  /// Publish a single artifact.
  pub async fn publish(&self, artifact: Artifact) -> Result<StoredFile, PublishFailure> {
    let prepared = read(artifact).await?;
    self.upload(self.allocate(prepared)).await
  }

  /// Publish every artifact, waiting for all uploads to settle.
  ///
  /// Individual failures are reported, not returned as errors.
  pub async fn publish_all<I>(&self, artifacts: I) -> PublishReport
  where
    I: IntoIterator<Item = Artifact>,
  {
    let outcomes: Vec<Result<StoredFile, PublishFailure>> = stream::iter(artifacts)
      .map(read)
      .buffered(self.concurrency)
      .map(|prepared| {
        let allocation = prepared.map(|p| self.allocate(p));
        async move {
          match allocation {
            Ok(allocation) => self.upload(allocation).await,
            Err(failure) => Err(failure),
          }
        }
      })
      .buffered(self.concurrency)
      .collect()
      .await;

    let mut report = PublishReport {
      attempted: outcomes.len(),
      ..PublishReport::default()
    };
    for outcome in outcomes {
      match outcome {
        Ok(stored) => report.stored.push(stored),
        Err(failure) => report.failures.push(failure),
      }
    }
    report
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Ledger> {
    self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn allocate(&self, prepared: Prepared) -> Allocation {
    let artifact = &prepared.artifact;
    let mut ledger = self.lock();

    let path_key = (artifact.category, artifact.relative_path.clone());
    if let Some(existing) = ledger
      .published
      .get(&path_key)
      .and_then(|stored| stored.iter().find(|s| s.digest == prepared.digest))
    {
      return Allocation::Reused(existing.clone());
    }

    let base = derive_key(&self.run_id, artifact.category.as_str(), &artifact.source_path);
    let mut key = base.clone();
    let mut n = 2;
    while ledger.taken.contains(&key) {
      key = with_suffix(&base, n);
      n += 1;
    }
    ledger.taken.insert(key.clone());

    Allocation::Fresh { prepared, key }
  }

  async fn upload(&self, allocation: Allocation) -> Result<StoredFile, PublishFailure> {
    let (prepared, key) = match allocation {
      Allocation::Reused(stored) => {
        debug!(key = %stored.key, path = %stored.path, "artifact_unchanged");
        return Ok(stored);
      }
      Allocation::Fresh { prepared, key } => (prepared, key),
    };

    let Prepared {
      artifact,
      data,
      digest,
    } = prepared;
    let content_type = content_type_for(&artifact.source_path);
    let size = data.len() as u64;

    if let Err(e) = self.store.put(&key, data, content_type).await {
      self.lock().taken.remove(&key);
      warn!(key = %key, path = %artifact.relative_path, error = %e, "publish_failed");
      return Err(PublishFailure {
        path: artifact.relative_path,
        key: Some(key),
        message: e.to_string(),
      });
    }

    let stored = StoredFile {
      uri: self.store.record_uri(&key),
      key,
      path: artifact.relative_path.clone(),
      category: artifact.category,
      content_type: content_type.to_string(),
      size,
      digest,
    };
    info!(
      key = %stored.key,
      path = %stored.path,
      size = stored.size,
      "artifact_stored"
    );

    self
      .lock()
      .published
      .entry((artifact.category, artifact.relative_path))
      .or_default()
      .push(stored.clone());

    Ok(stored)
  }
}

async fn read(artifact: Artifact) -> Result<Prepared, PublishFailure> {
  match tokio::fs::read(&artifact.path).await {
    Ok(data) => {
      let digest = hex::encode(Sha256::digest(&data));
      Ok(Prepared {
        artifact,
        data: Bytes::from(data),
        digest,
      })
    }
    Err(e) => {
      warn!(path = %artifact.relative_path, error = %e, "publish_failed");
      Err(PublishFailure {
        path: artifact.relative_path,
        key: None,
        message: format!("failed to read artifact: {}", e),
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::TempDir;
  use trawl_artifact::MemoryStore;
  use trawl_collector::Collector;

  use super::*;

  fn artifacts(root: &std::path::Path) -> Vec<Artifact> {
    Collector::new(root)
      .with_artifact_dir(".playwright-mcp")
      .collect()
      .unwrap()
      .collect()
  }

  async fn publisher(store: Arc<MemoryStore>) -> Publisher {
    Publisher::open(store, "run", DEFAULT_CONCURRENCY).await.unwrap()
  }

  #[tokio::test]
  async fn test_publish_all_in_collection_order() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("report.md"), "# Report").unwrap();
    fs::write(tmp.path().join("palette.json"), "{}").unwrap();
    fs::create_dir(tmp.path().join(".playwright-mcp")).unwrap();
    fs::write(tmp.path().join(".playwright-mcp/trace.png"), "png").unwrap();

    let store = Arc::new(MemoryStore::new());
    let report = publisher(store.clone())
      .await
      .publish_all(artifacts(tmp.path()))
      .await;

    let keys: Vec<&str> = report.stored.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(
      keys,
      vec!["run_playwright_trace.png", "run_workspace_palette.json", "run_workspace_report.md"]
    );
    assert_eq!(report.attempted, 3);
    assert!(report.failures.is_empty());
    assert_eq!(report.stored[2].content_type, "text/markdown");
    assert_eq!(report.stored[2].uri, "memory://run_workspace_report.md");
    assert_eq!(
      store.get("run_workspace_report.md").await.unwrap().data,
      Bytes::from_static(b"# Report")
    );
  }

  #[tokio::test]
  async fn test_colliding_keys_are_suffixed() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("a")).unwrap();
    fs::write(tmp.path().join("a/b.md"), "nested").unwrap();
    fs::write(tmp.path().join("a_b.md"), "flat").unwrap();

    let store = Arc::new(MemoryStore::new());
    let report = publisher(store.clone())
      .await
      .publish_all(artifacts(tmp.path()))
      .await;

    let keys: Vec<&str> = report.stored.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, vec!["run_workspace_a_b.md", "run_workspace_a_b-2.md"]);
    assert_eq!(
      store.get("run_workspace_a_b.md").await.unwrap().data,
      Bytes::from_static(b"nested")
    );
    assert_eq!(
      store.get("run_workspace_a_b-2.md").await.unwrap().data,
      Bytes::from_static(b"flat")
    );
  }

  #[tokio::test]
  async fn test_unchanged_artifact_reuses_key() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("report.md"), "v1").unwrap();

    let store = Arc::new(MemoryStore::new());
    let publisher = publisher(store.clone()).await;

    let first = publisher.publish_all(artifacts(tmp.path())).await;
    let second = publisher.publish_all(artifacts(tmp.path())).await;

    assert_eq!(first.stored, second.stored);
    assert_eq!(store.put_count(), 1);
  }

  #[tokio::test]
  async fn test_changed_artifact_gets_new_key() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("report.md"), "v1").unwrap();

    let store = Arc::new(MemoryStore::new());
    let publisher = publisher(store.clone()).await;
    publisher.publish_all(artifacts(tmp.path())).await;

    fs::write(tmp.path().join("report.md"), "v2").unwrap();
    let report = publisher.publish_all(artifacts(tmp.path())).await;

    assert_eq!(report.stored[0].key, "run_workspace_report-2.md");
    assert_eq!(
      store.get("run_workspace_report.md").await.unwrap().data,
      Bytes::from_static(b"v1")
    );
    assert_eq!(
      store.get("run_workspace_report-2.md").await.unwrap().data,
      Bytes::from_static(b"v2")
    );
  }

  #[tokio::test]
  async fn test_existing_keys_are_never_overwritten() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("report.md"), "new").unwrap();

    let store = Arc::new(MemoryStore::new());
    store
      .put("run_workspace_report.md", Bytes::from_static(b"old"), "text/markdown")
      .await
      .unwrap();

    let report = publisher(store.clone())
      .await
      .publish_all(artifacts(tmp.path()))
      .await;

    assert_eq!(report.stored[0].key, "run_workspace_report-2.md");
    assert_eq!(
      store.get("run_workspace_report.md").await.unwrap().data,
      Bytes::from_static(b"old")
    );
  }

  #[tokio::test]
  async fn test_failed_upload_is_reported_and_others_kept() {
    let tmp = TempDir::new().unwrap();
    for name in ["a.md", "broken.md", "c.md"] {
      fs::write(tmp.path().join(name), name).unwrap();
    }

    let store = Arc::new(MemoryStore::new().reject_keys_containing("broken"));
    let report = publisher(store.clone())
      .await
      .publish_all(artifacts(tmp.path()))
      .await;

    assert_eq!(report.attempted, 3);
    assert_eq!(report.stored.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, "broken.md");
    assert_eq!(report.failures[0].key.as_deref(), Some("run_workspace_broken.md"));
    assert!(store.get("run_workspace_broken.md").await.is_err());
  }

  #[tokio::test]
  async fn test_oversized_artifact_fails_alone() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("big.json"), "x".repeat(64)).unwrap();
    fs::write(tmp.path().join("small.json"), "{}").unwrap();

    let store = Arc::new(MemoryStore::new().with_max_record_bytes(16));
    let report = publisher(store).await.publish_all(artifacts(tmp.path())).await;

    assert_eq!(report.stored.len(), 1);
    assert_eq!(report.stored[0].path, "small.json");
    assert!(report.failures[0].message.contains("limit is 16"));
  }

  #[tokio::test]
  async fn test_many_artifacts_keep_order() {
    let tmp = TempDir::new().unwrap();
    for i in 0..25 {
      fs::write(tmp.path().join(format!("file-{:02}.txt", i)), i.to_string()).unwrap();
    }

    let store = Arc::new(MemoryStore::new());
    let publisher = Publisher::open(store.clone(), "run", 3).await.unwrap();
    let report = publisher.publish_all(artifacts(tmp.path())).await;

    let paths: Vec<String> = report.stored.iter().map(|s| s.path.clone()).collect();
    let expected: Vec<String> = (0..25).map(|i| format!("file-{:02}.txt", i)).collect();
    assert_eq!(paths, expected);
    assert_eq!(store.put_count(), 25);
  }

  #[tokio::test]
  async fn test_publish_single() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("notes.txt"), "hello").unwrap();
    let artifact = artifacts(tmp.path()).remove(0);

    let store = Arc::new(MemoryStore::new());
    let publisher = publisher(store).await;

    let stored = publisher.publish(artifact.clone()).await.unwrap();
    assert_eq!(stored.key, "run_workspace_notes.txt");
    assert_eq!(stored.size, 5);
    assert_eq!(publisher.publish(artifact).await.unwrap(), stored);
  }

  #[tokio::test]
  async fn test_vanished_file_is_a_failure() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("gone.md"), "x").unwrap();
    let listed = artifacts(tmp.path());
    fs::remove_file(tmp.path().join("gone.md")).unwrap();

    let report = publisher(Arc::new(MemoryStore::new()))
      .await
      .publish_all(listed)
      .await;

    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].key.is_none());
  }
}
