//! Storage platforms.
//!
//! A [`Platform`] opens key-value stores and datasets by id. Which one a run
//! uses is decided once from [`StorageConfig`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use trawl_artifact::{ApifyStore, FsStore, MemoryStore, Store};
use trawl_config::{Secret, StorageBackend, StorageConfig};
use trawl_dataset::{ApifyDataset, Dataset, FsDataset, MemoryDataset};

use crate::error::RuntimeError;

/// Opens stores and datasets by id.
pub trait Platform: Send + Sync {
  fn key_value_store(&self, id: &str) -> Result<Arc<dyn Store>, RuntimeError>;

  fn dataset(&self, id: &str) -> Result<Arc<dyn Dataset>, RuntimeError>;
}

/// Build the platform selected by `config`.
pub fn platform_for(config: &StorageConfig) -> Arc<dyn Platform> {
  match &config.backend {
    StorageBackend::Local { dir } => Arc::new(LocalPlatform {
      dir: dir.clone(),
      max_record_bytes: config.max_record_bytes,
    }),
    StorageBackend::Platform { base_url, token } => Arc::new(ApifyPlatform {
      base_url: base_url.clone(),
      token: token.clone(),
      max_record_bytes: config.max_record_bytes,
    }),
  }
}

/// Stores and datasets under a local directory.
#[derive(Debug, Clone)]
pub struct LocalPlatform {
  pub dir: PathBuf,
  pub max_record_bytes: Option<u64>,
}

impl Platform for LocalPlatform {
  fn key_value_store(&self, id: &str) -> Result<Arc<dyn Store>, RuntimeError> {
    Ok(Arc::new(
      FsStore::open(&self.dir, id)?.with_max_record_bytes(self.max_record_bytes),
    ))
  }

  fn dataset(&self, id: &str) -> Result<Arc<dyn Dataset>, RuntimeError> {
    Ok(Arc::new(FsDataset::open(&self.dir, id)?))
  }
}

/// Stores and datasets behind the hosting platform's HTTP API.
#[derive(Debug, Clone)]
pub struct ApifyPlatform {
  pub base_url: String,
  pub token: Secret,
  pub max_record_bytes: Option<u64>,
}

impl Platform for ApifyPlatform {
  fn key_value_store(&self, id: &str) -> Result<Arc<dyn Store>, RuntimeError> {
    let store = ApifyStore::new(&self.base_url, id, self.token.expose())?
      .with_max_record_bytes(self.max_record_bytes);
    Ok(Arc::new(store))
  }

  fn dataset(&self, id: &str) -> Result<Arc<dyn Dataset>, RuntimeError> {
    Ok(Arc::new(ApifyDataset::new(
      &self.base_url,
      id,
      self.token.expose(),
    )?))
  }
}

/// In-memory stores and datasets, created on first use.
///
/// Handles to the same id share state, so tests can inspect what a run
/// wrote after it finished.
#[derive(Default)]
pub struct MemoryPlatform {
  stores: Mutex<HashMap<String, Arc<MemoryStore>>>,
  datasets: Mutex<HashMap<String, Arc<MemoryDataset>>>,
}

impl MemoryPlatform {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a preconfigured store under `id`.
  pub fn with_store(self, id: impl Into<String>, store: MemoryStore) -> Self {
    self
      .stores
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(id.into(), Arc::new(store));
    self
  }

  pub fn store(&self, id: &str) -> Arc<MemoryStore> {
    self
      .stores
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .entry(id.to_string())
      .or_default()
      .clone()
  }

  pub fn memory_dataset(&self, id: &str) -> Arc<MemoryDataset> {
    self
      .datasets
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .entry(id.to_string())
      .or_insert_with(|| Arc::new(MemoryDataset::new(id)))
      .clone()
  }
}

impl Platform for MemoryPlatform {
  fn key_value_store(&self, id: &str) -> Result<Arc<dyn Store>, RuntimeError> {
    Ok(self.store(id))
  }

  fn dataset(&self, id: &str) -> Result<Arc<dyn Dataset>, RuntimeError> {
    Ok(self.memory_dataset(id))
  }
}
