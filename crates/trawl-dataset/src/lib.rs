//! Trawl Dataset
//!
//! Result records are appended to a dataset, one JSON object per run.
//! Datasets are append-only: items are never updated or removed.

mod apify;
mod fs;
mod memory;

pub use apify::ApifyDataset;
pub use fs::FsDataset;
pub use memory::MemoryDataset;

use async_trait::async_trait;

/// Error type for dataset operations.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
  /// An I/O error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// The item could not be serialized.
  #[error("failed to serialize item: {0}")]
  Serialize(#[from] serde_json::Error),

  /// An HTTP transport error occurred.
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The dataset id cannot name a dataset.
  #[error("invalid dataset id: '{0}'")]
  InvalidId(String),

  /// The dataset refused the item.
  #[error("dataset rejected item ({status}): {message}")]
  Rejected { status: u16, message: String },
}

/// Append-only dataset.
#[async_trait]
pub trait Dataset: Send + Sync {
  /// Append one item.
  async fn push(&self, item: &serde_json::Value) -> Result<(), DatasetError>;

  /// Identifier of the dataset, for logging.
  fn id(&self) -> &str;
}
