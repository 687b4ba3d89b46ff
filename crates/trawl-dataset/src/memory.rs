use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{Dataset, DatasetError};

/// In-memory dataset for tests.
#[derive(Debug, Default)]
pub struct MemoryDataset {
  id: String,
  items: Mutex<Vec<serde_json::Value>>,
}

impl MemoryDataset {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      items: Mutex::new(Vec::new()),
    }
  }

  /// Everything pushed so far, in order.
  pub async fn items(&self) -> Vec<serde_json::Value> {
    self.items.lock().await.clone()
  }
}

#[async_trait]
impl Dataset for MemoryDataset {
  async fn push(&self, item: &serde_json::Value) -> Result<(), DatasetError> {
    self.items.lock().await.push(item.clone());
    Ok(())
  }

  fn id(&self) -> &str {
    &self.id
  }
}
