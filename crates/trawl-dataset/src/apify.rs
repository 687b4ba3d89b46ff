use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::{Dataset, DatasetError};

/// Dataset backed by the hosting platform's HTTP API
/// (`POST {base}/v2/datasets/{id}/items`).
pub struct ApifyDataset {
  client: Client,
  items_url: Url,
  id: String,
  token: String,
}

impl ApifyDataset {
  pub fn new(
    base_url: &str,
    dataset_id: impl Into<String>,
    token: impl Into<String>,
  ) -> Result<Self, DatasetError> {
    let id = dataset_id.into();
    let mut items_url = Url::parse(base_url).map_err(|e| DatasetError::Rejected {
      status: 0,
      message: format!("invalid api base url '{}': {}", base_url, e),
    })?;
    items_url
      .path_segments_mut()
      .map_err(|_| DatasetError::Rejected {
        status: 0,
        message: format!("invalid api base url '{}'", base_url),
      })?
      .pop_if_empty()
      .extend(["v2", "datasets", id.as_str(), "items"]);

    Ok(Self {
      client: Client::new(),
      items_url,
      id,
      token: token.into(),
    })
  }

  pub fn items_url(&self) -> &Url {
    &self.items_url
  }
}

#[async_trait]
impl Dataset for ApifyDataset {
  async fn push(&self, item: &serde_json::Value) -> Result<(), DatasetError> {
    let response = self
      .client
      .post(self.items_url.clone())
      .bearer_auth(&self.token)
      .json(item)
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let message = response.text().await.unwrap_or_default();
      return Err(DatasetError::Rejected {
        status: status.as_u16(),
        message,
      });
    }

    debug!(dataset_id = %self.id, "item_pushed");
    Ok(())
  }

  fn id(&self) -> &str {
    &self.id
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_items_url() {
    let dataset = ApifyDataset::new("https://api.apify.com", "ds1", "t").unwrap();
    assert_eq!(
      dataset.items_url().as_str(),
      "https://api.apify.com/v2/datasets/ds1/items"
    );
  }

  #[test]
  fn test_invalid_base_url() {
    assert!(ApifyDataset::new("::", "ds1", "t").is_err());
  }
}
