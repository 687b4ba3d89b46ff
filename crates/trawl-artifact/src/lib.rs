//! Trawl Artifact
//!
//! This crate provides the run-scoped key-value store trait and its
//! implementations. Artifacts are binary blobs (documents, images, data
//! files) written once per run under a key derived from their path.
//!
//! The [`Store`] trait is the backend layer. Implementations handle the
//! actual storage (local directory, memory, platform HTTP API) while the
//! publisher decides which keys to use.

mod apify;
mod content_type;
mod fs;
mod key;
mod memory;

pub use apify::ApifyStore;
pub use content_type::content_type_for;
pub use fs::FsStore;
pub use key::{MAX_KEY_LEN, derive_key, is_valid_key, sanitize_segment, with_suffix};
pub use memory::MemoryStore;

use async_trait::async_trait;
use bytes::Bytes;

/// A stored value with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
  pub data: Bytes,
  pub content_type: String,
}

/// Error type for key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// The requested record was not found.
  #[error("record not found: {0}")]
  NotFound(String),

  /// The record exceeds the store's size limit.
  #[error("record '{key}' is {size} bytes, limit is {limit}")]
  TooLarge { key: String, size: u64, limit: u64 },

  /// The key contains characters the store does not accept.
  #[error("invalid key: '{0}'")]
  InvalidKey(String),

  /// The store id cannot name a store.
  #[error("invalid store id: '{0}'")]
  InvalidStoreId(String),

  /// The store refused the request.
  #[error("store rejected request ({status}): {message}")]
  Rejected { status: u16, message: String },

  /// An I/O error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// An HTTP transport error occurred.
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),
}

/// Run-scoped key-value store.
///
/// Implementations provide the actual storage backend. Keys are validated
/// with [`is_valid_key`] before any write.
#[async_trait]
pub trait Store: Send + Sync {
  /// Retrieve a record by key.
  async fn get(&self, key: &str) -> Result<Record, StoreError>;

  /// Store a record, replacing any previous value under the same key.
  async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StoreError>;

  /// List keys starting with `prefix`, in ascending order.
  async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

  /// Delete a record by key.
  async fn delete(&self, key: &str) -> Result<(), StoreError>;

  /// The location a record can be retrieved from.
  fn record_uri(&self, key: &str) -> String;
}

pub(crate) fn check_key(key: &str) -> Result<(), StoreError> {
  if is_valid_key(key) {
    Ok(())
  } else {
    Err(StoreError::InvalidKey(key.to_string()))
  }
}

pub(crate) fn check_size(key: &str, size: usize, limit: Option<u64>) -> Result<(), StoreError> {
  match limit {
    Some(limit) if size as u64 > limit => Err(StoreError::TooLarge {
      key: key.to_string(),
      size: size as u64,
      limit,
    }),
    _ => Ok(()),
  }
}
