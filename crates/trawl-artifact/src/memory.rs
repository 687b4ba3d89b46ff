use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::{Record, Store, StoreError, check_key, check_size};

/// In-memory key-value store.
///
/// Suitable for single-run use or testing. Writes can be made to fail with
/// [`MemoryStore::reject_keys_containing`] to exercise partial publishing.
#[derive(Debug, Default)]
pub struct MemoryStore {
  records: RwLock<BTreeMap<String, Record>>,
  max_record_bytes: Option<u64>,
  reject_patterns: Vec<String>,
  puts: AtomicUsize,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_max_record_bytes(mut self, limit: u64) -> Self {
    self.max_record_bytes = Some(limit);
    self
  }

  /// Fail every write whose key contains `pattern`.
  pub fn reject_keys_containing(mut self, pattern: impl Into<String>) -> Self {
    self.reject_patterns.push(pattern.into());
    self
  }

  /// Number of successful writes so far.
  pub fn put_count(&self) -> usize {
    self.puts.load(Ordering::SeqCst)
  }

  /// Snapshot of every stored key.
  pub async fn keys(&self) -> Vec<String> {
    self.records.read().await.keys().cloned().collect()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn get(&self, key: &str) -> Result<Record, StoreError> {
    self
      .records
      .read()
      .await
      .get(key)
      .cloned()
      .ok_or_else(|| StoreError::NotFound(key.to_string()))
  }

  async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StoreError> {
    check_key(key)?;
    check_size(key, data.len(), self.max_record_bytes)?;

    if self.reject_patterns.iter().any(|p| key.contains(p.as_str())) {
      return Err(StoreError::Rejected {
        status: 500,
        message: format!("write to '{}' rejected", key),
      });
    }

    self.records.write().await.insert(
      key.to_string(),
      Record {
        data,
        content_type: content_type.to_string(),
      },
    );
    self.puts.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
    Ok(
      self
        .records
        .read()
        .await
        .keys()
        .filter(|k| k.starts_with(prefix))
        .cloned()
        .collect(),
    )
  }

  async fn delete(&self, key: &str) -> Result<(), StoreError> {
    self
      .records
      .write()
      .await
      .remove(key)
      .map(|_| ())
      .ok_or_else(|| StoreError::NotFound(key.to_string()))
  }

  fn record_uri(&self, key: &str) -> String {
    format!("memory://{}", key)
  }
}
