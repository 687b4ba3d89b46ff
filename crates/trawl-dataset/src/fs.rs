use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use crate::{Dataset, DatasetError};

/// Filesystem dataset.
///
/// Items are stored as zero-padded, sequentially numbered JSON files:
///
/// ```text
/// {storage_dir}/datasets/{dataset_id}/
/// ├── 000000001.json
/// └── 000000002.json
/// ```
pub struct FsDataset {
  id: String,
  dir: PathBuf,
  // Highest item number written, `None` until the directory has been read.
  last: Mutex<Option<u64>>,
}

impl FsDataset {
  /// Open dataset `dataset_id` under a local storage directory.
  ///
  /// The id must be a single plain path component.
  pub fn open(storage_dir: impl Into<PathBuf>, dataset_id: &str) -> Result<Self, DatasetError> {
    let mut components = Path::new(dataset_id).components();
    let plain = !dataset_id.contains('\\')
      && matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
      );
    if !plain {
      return Err(DatasetError::InvalidId(dataset_id.to_string()));
    }

    Ok(Self {
      id: dataset_id.to_string(),
      dir: storage_dir.into().join("datasets").join(dataset_id),
      last: Mutex::new(None),
    })
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  async fn scan_last(&self) -> Result<u64, DatasetError> {
    let mut entries = match fs::read_dir(&self.dir).await {
      Ok(entries) => entries,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
      Err(e) => return Err(e.into()),
    };

    let mut last = 0;
    while let Some(entry) = entries.next_entry().await? {
      let name = entry.file_name();
      let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
        continue;
      };
      if let Ok(n) = stem.parse::<u64>() {
        last = last.max(n);
      }
    }
    Ok(last)
  }
}

#[async_trait]
impl Dataset for FsDataset {
  async fn push(&self, item: &serde_json::Value) -> Result<(), DatasetError> {
    let raw = serde_json::to_vec_pretty(item)?;

    let mut last = self.last.lock().await;
    let current = match *last {
      Some(n) => n,
      None => self.scan_last().await?,
    };
    let next = current + 1;

    fs::create_dir_all(&self.dir).await?;
    fs::write(self.dir.join(format!("{:09}.json", next)), raw).await?;
    *last = Some(next);

    Ok(())
  }

  fn id(&self) -> &str {
    &self.id
  }
}
