use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode, header};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::{Record, Store, StoreError, check_key, check_size};

/// Key-value store backed by the hosting platform's HTTP API.
///
/// Records live at `{base}/v2/key-value-stores/{store_id}/records/{key}`.
pub struct ApifyStore {
  client: Client,
  base: Url,
  store_id: String,
  token: String,
  max_record_bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ListEnvelope {
  data: KeyPage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyPage {
  items: Vec<KeyItem>,
  #[serde(default)]
  is_truncated: bool,
  #[serde(default)]
  next_exclusive_start_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeyItem {
  key: String,
}

impl ApifyStore {
  pub fn new(
    base_url: &str,
    store_id: impl Into<String>,
    token: impl Into<String>,
  ) -> Result<Self, StoreError> {
    let base = Url::parse(base_url).map_err(|e| StoreError::Rejected {
      status: 0,
      message: format!("invalid api base url '{}': {}", base_url, e),
    })?;
    if base.cannot_be_a_base() {
      return Err(StoreError::Rejected {
        status: 0,
        message: format!("invalid api base url '{}'", base_url),
      });
    }

    Ok(Self {
      client: Client::new(),
      base,
      store_id: store_id.into(),
      token: token.into(),
      max_record_bytes: None,
    })
  }

  /// Reject records larger than `limit` bytes before sending them.
  pub fn with_max_record_bytes(mut self, limit: Option<u64>) -> Self {
    self.max_record_bytes = limit;
    self
  }

  pub fn store_id(&self) -> &str {
    &self.store_id
  }

  fn endpoint(&self, tail: &[&str]) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
      segments
        .pop_if_empty()
        .extend(["v2", "key-value-stores", self.store_id.as_str()])
        .extend(tail);
    }
    url
  }

  async fn check(response: Response, key: &str) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
      return Err(StoreError::NotFound(key.to_string()));
    }
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
      status: status.as_u16(),
      message,
    })
  }
}

#[async_trait]
impl Store for ApifyStore {
  async fn get(&self, key: &str) -> Result<Record, StoreError> {
    check_key(key)?;
    let response = self
      .client
      .get(self.endpoint(&["records", key]))
      .bearer_auth(&self.token)
      .send()
      .await?;
    let response = Self::check(response, key).await?;

    let content_type = response
      .headers()
      .get(header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .unwrap_or("application/octet-stream")
      .to_string();
    let data = response.bytes().await?;

    Ok(Record { data, content_type })
  }

  async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StoreError> {
    check_key(key)?;
    check_size(key, data.len(), self.max_record_bytes)?;
    let size = data.len() as u64;

    let response = self
      .client
      .put(self.endpoint(&["records", key]))
      .bearer_auth(&self.token)
      .header(header::CONTENT_TYPE, content_type)
      .body(data)
      .send()
      .await?;
    if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
      return Err(StoreError::TooLarge {
        key: key.to_string(),
        size,
        limit: self.max_record_bytes.unwrap_or(size.saturating_sub(1)),
      });
    }
    Self::check(response, key).await?;

    debug!(store_id = %self.store_id, key = %key, "record_written");
    Ok(())
  }

  async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
    let mut keys = Vec::new();
    let mut start: Option<String> = None;

    loop {
      let mut url = self.endpoint(&["keys"]);
      {
        let mut query = url.query_pairs_mut();
        query.append_pair("limit", "1000");
        if !prefix.is_empty() {
          query.append_pair("prefix", prefix);
        }
        if let Some(start) = &start {
          query.append_pair("exclusiveStartKey", start);
        }
      }

      let response = self
        .client
        .get(url)
        .bearer_auth(&self.token)
        .send()
        .await?;
      let page: ListEnvelope = Self::check(response, &self.store_id).await?.json().await?;

      keys.extend(
        page
          .data
          .items
          .into_iter()
          .map(|item| item.key)
          .filter(|k| k.starts_with(prefix)),
      );

      match page.data.next_exclusive_start_key {
        Some(next) if page.data.is_truncated => start = Some(next),
        _ => break,
      }
    }

    keys.sort();
    Ok(keys)
  }

  async fn delete(&self, key: &str) -> Result<(), StoreError> {
    check_key(key)?;
    let response = self
      .client
      .delete(self.endpoint(&["records", key]))
      .bearer_auth(&self.token)
      .send()
      .await?;
    Self::check(response, key).await?;
    Ok(())
  }

  fn record_uri(&self, key: &str) -> String {
    self.endpoint(&["records", key]).to_string()
  }
}
