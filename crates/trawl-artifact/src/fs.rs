use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::{Record, Store, StoreError, check_key, check_size};

/// Directory inside the store holding content-type sidecars. It is not a
/// valid key, so it can never collide with a record.
const METADATA_DIR: &str = ".__metadata__";

#[derive(Debug, Serialize, Deserialize)]
struct Metadata {
  key: String,
  content_type: String,
}

/// Filesystem-based key-value store.
///
/// Each record is stored at `{base_path}/{key}`. Its content type lives in a
/// sidecar under a separate directory, so no record key can shadow another
/// record's metadata:
///
/// ```text
/// {storage_dir}/key_value_stores/{store_id}/
/// ├── .__metadata__/
/// │   └── run_workspace_report.md.json
/// └── run_workspace_report.md
/// ```
pub struct FsStore {
  base_path: PathBuf,
  max_record_bytes: Option<u64>,
}

impl FsStore {
  /// Create a new filesystem store with the given base path.
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
      max_record_bytes: None,
    }
  }

  /// Open store `store_id` under a local storage directory.
  ///
  /// The id must be a single plain path component.
  pub fn open(storage_dir: impl Into<PathBuf>, store_id: &str) -> Result<Self, StoreError> {
    if !is_plain_name(store_id) {
      return Err(StoreError::InvalidStoreId(store_id.to_string()));
    }
    Ok(Self::new(
      storage_dir
        .into()
        .join("key_value_stores")
        .join(store_id),
    ))
  }

  /// Reject records larger than `limit` bytes.
  pub fn with_max_record_bytes(mut self, limit: Option<u64>) -> Self {
    self.max_record_bytes = limit;
    self
  }

  fn key_to_path(&self, key: &str) -> PathBuf {
    self.base_path.join(key)
  }

  fn metadata_path(&self, key: &str) -> PathBuf {
    self.base_path.join(METADATA_DIR).join(format!("{}.json", key))
  }
}

fn is_plain_name(id: &str) -> bool {
  let mut components = Path::new(id).components();
  !id.contains('\\')
    && matches!(
      (components.next(), components.next()),
      (Some(Component::Normal(_)), None)
    )
}

fn check_fs_key(key: &str) -> Result<(), StoreError> {
  check_key(key)?;
  if key == METADATA_DIR {
    return Err(StoreError::InvalidKey(key.to_string()));
  }
  Ok(())
}

fn not_found(key: &str, e: std::io::Error) -> StoreError {
  if e.kind() == std::io::ErrorKind::NotFound {
    StoreError::NotFound(key.to_string())
  } else {
    StoreError::Io(e)
  }
}

#[async_trait]
impl Store for FsStore {
  async fn get(&self, key: &str) -> Result<Record, StoreError> {
    check_fs_key(key)?;
    let data = fs::read(self.key_to_path(key))
      .await
      .map_err(|e| not_found(key, e))?;

    let content_type = match fs::read(self.metadata_path(key)).await {
      Ok(raw) => serde_json::from_slice::<Metadata>(&raw)
        .map(|m| m.content_type)
        .unwrap_or_else(|_| "application/octet-stream".to_string()),
      Err(_) => "application/octet-stream".to_string(),
    };

    Ok(Record {
      data: Bytes::from(data),
      content_type,
    })
  }

  async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StoreError> {
    check_fs_key(key)?;
    check_size(key, data.len(), self.max_record_bytes)?;

    fs::create_dir_all(self.base_path.join(METADATA_DIR)).await?;

    let mut file = File::create(self.key_to_path(key)).await?;
    file.write_all(&data).await?;
    file.flush().await?;

    let metadata = Metadata {
      key: key.to_string(),
      content_type: content_type.to_string(),
    };
    let raw = serde_json::to_vec_pretty(&metadata).map_err(std::io::Error::other)?;
    fs::write(self.metadata_path(key), raw).await?;

    Ok(())
  }

  async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
    let mut keys = Vec::new();

    let mut entries = match fs::read_dir(&self.base_path).await {
      Ok(entries) => entries,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
      Err(e) => return Err(StoreError::Io(e)),
    };

    while let Some(entry) = entries.next_entry().await? {
      if !entry.file_type().await?.is_file() {
        continue;
      }
      let Some(name) = entry.file_name().to_str().map(str::to_string) else {
        continue;
      };
      if !name.starts_with(prefix) {
        continue;
      }
      keys.push(name);
    }

    keys.sort();
    Ok(keys)
  }

  async fn delete(&self, key: &str) -> Result<(), StoreError> {
    check_fs_key(key)?;
    fs::remove_file(self.key_to_path(key))
      .await
      .map_err(|e| not_found(key, e))?;
    // Sidecar may be missing for records written by other tools.
    let _ = fs::remove_file(self.metadata_path(key)).await;
    Ok(())
  }

  fn record_uri(&self, key: &str) -> String {
    format!("file://{}", self.key_to_path(key).display())
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;

  #[tokio::test]
  async fn test_put_get_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let store = FsStore::open(tmp.path(), "default").unwrap();

    store
      .put("run_workspace_report.md", Bytes::from_static(b"# Hi"), "text/markdown")
      .await
      .unwrap();

    let record = store.get("run_workspace_report.md").await.unwrap();
    assert_eq!(record.data, Bytes::from_static(b"# Hi"));
    assert_eq!(record.content_type, "text/markdown");
    assert!(
      tmp
        .path()
        .join("key_value_stores/default/run_workspace_report.md")
        .exists()
    );
  }

  #[tokio::test]
  async fn test_list_by_prefix_skips_metadata() {
    let tmp = TempDir::new().unwrap();
    let store = FsStore::open(tmp.path(), "default").unwrap();

    for key in ["run_b.json", "run_a.md", "INPUT"] {
      store
        .put(key, Bytes::from_static(b"x"), "text/plain")
        .await
        .unwrap();
    }

    assert_eq!(store.list("run_").await.unwrap(), vec!["run_a.md", "run_b.json"]);
    assert_eq!(store.list("").await.unwrap().len(), 3);
  }

  #[tokio::test]
  async fn test_list_missing_store_is_empty() {
    let tmp = TempDir::new().unwrap();
    let store = FsStore::open(tmp.path(), "never-written").unwrap();
    assert!(store.list("").await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_get_missing() {
    let tmp = TempDir::new().unwrap();
    let store = FsStore::new(tmp.path());
    assert!(matches!(
      store.get("missing").await,
      Err(StoreError::NotFound(_))
    ));
  }

  #[tokio::test]
  async fn test_size_limit() {
    let tmp = TempDir::new().unwrap();
    let store = FsStore::new(tmp.path()).with_max_record_bytes(Some(4));

    let err = store
      .put("big.txt", Bytes::from_static(b"12345"), "text/plain")
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::TooLarge { size: 5, limit: 4, .. }));
    assert!(!tmp.path().join("big.txt").exists());
  }

  #[tokio::test]
  async fn test_invalid_key_rejected() {
    let tmp = TempDir::new().unwrap();
    let store = FsStore::new(tmp.path());
    let err = store
      .put("../escape.txt", Bytes::from_static(b"x"), "text/plain")
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::InvalidKey(_)));
  }

  #[tokio::test]
  async fn test_delete() {
    let tmp = TempDir::new().unwrap();
    let store = FsStore::new(tmp.path());
    store
      .put("k.txt", Bytes::from_static(b"x"), "text/plain")
      .await
      .unwrap();

    store.delete("k.txt").await.unwrap();
    assert!(store.list("").await.unwrap().is_empty());
    assert!(matches!(
      store.delete("k.txt").await,
      Err(StoreError::NotFound(_))
    ));
  }

  #[tokio::test]
  async fn test_metadata_named_key_keeps_both_records() {
    let tmp = TempDir::new().unwrap();
    let store = FsStore::open(tmp.path(), "default").unwrap();

    store
      .put("run_workspace_report.md", Bytes::from_static(b"# Report"), "text/markdown")
      .await
      .unwrap();
    store
      .put(
        "run_workspace_report.md.__metadata__.json",
        Bytes::from_static(b"{\"not\":\"metadata\"}"),
        "application/json",
      )
      .await
      .unwrap();

    let report = store.get("run_workspace_report.md").await.unwrap();
    assert_eq!(report.data, Bytes::from_static(b"# Report"));
    assert_eq!(report.content_type, "text/markdown");

    let lookalike = store
      .get("run_workspace_report.md.__metadata__.json")
      .await
      .unwrap();
    assert_eq!(lookalike.content_type, "application/json");

    assert_eq!(
      store.list("run_").await.unwrap(),
      vec![
        "run_workspace_report.md",
        "run_workspace_report.md.__metadata__.json"
      ]
    );
  }

  #[tokio::test]
  async fn test_metadata_dir_is_not_a_key() {
    let tmp = TempDir::new().unwrap();
    let store = FsStore::new(tmp.path());
    let err = store
      .put(METADATA_DIR, Bytes::from_static(b"x"), "text/plain")
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::InvalidKey(_)));
  }

  #[test]
  fn test_open_rejects_path_like_ids() {
    let tmp = TempDir::new().unwrap();
    for id in ["", "..", ".", "a/b", "/tmp/escaped", "..\\up"] {
      assert!(
        matches!(
          FsStore::open(tmp.path(), id),
          Err(StoreError::InvalidStoreId(_))
        ),
        "accepted store id {id:?}"
      );
    }
    assert!(FsStore::open(tmp.path(), "user~brand").is_ok());
  }
}
