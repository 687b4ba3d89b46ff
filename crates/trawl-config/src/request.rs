//! Actor input documents.
//!
//! The platform hands an actor a single JSON object. Its shape decides the
//! mode: a `kvStoreId`/`defaultKeyValueStoreId` selects llms.txt generation,
//! otherwise a `task` selects a browsing task.

use serde::Deserialize;
use url::Url;

use crate::actor::{ActorConfig, env};
use crate::error::ConfigError;
use crate::secret::Secret;

/// Default endpoint llms.txt documents are submitted to.
pub const DEFAULT_SUBMIT_URL: &str = "https://styleguide.fyi";

/// Input for a browsing task run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
  #[serde(default)]
  pub task: Option<String>,
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default)]
  pub anthropic_api_key: Option<Secret>,
  #[serde(default)]
  pub output_dataset_id: Option<String>,
}

/// A task request that passed validation. Immutable from here on.
#[derive(Debug, Clone)]
pub struct ValidatedTask {
  pub task: String,
  pub url: Option<Url>,
  pub credential: Secret,
  pub output_dataset_id: Option<String>,
}

impl TaskRequest {
  /// Parse a task request from a JSON document.
  pub fn from_json(input: &str) -> Result<Self, ConfigError> {
    Ok(serde_json::from_str(input)?)
  }

  /// Validate the request and resolve its credential.
  ///
  /// A key supplied in the request wins over the configured one.
  pub fn validate(&self, config: &ActorConfig) -> Result<ValidatedTask, ConfigError> {
    let task = self
      .task
      .as_deref()
      .map(str::trim)
      .filter(|t| !t.is_empty())
      .ok_or(ConfigError::MissingTask)?
      .to_string();

    let url = match self.url.as_deref().map(str::trim) {
      None | Some("") => None,
      Some(raw) => Some(parse_absolute_url(raw)?),
    };

    let credential = resolve_credential(self.anthropic_api_key.as_ref(), config)?;

    Ok(ValidatedTask {
      task,
      url,
      credential,
      output_dataset_id: storage_id("outputDatasetId", self.output_dataset_id.as_deref())?,
    })
  }
}

/// Input for an llms.txt generation run.
///
/// `defaultKeyValueStoreId` is what a platform webhook sends; `kvStoreId` is
/// the direct form. The webhook field wins when both are present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmsTxtRequest {
  #[serde(default)]
  pub default_key_value_store_id: Option<String>,
  #[serde(default)]
  pub kv_store_id: Option<String>,
  #[serde(default)]
  pub domain: Option<String>,
  #[serde(default)]
  pub anthropic_api_key: Option<Secret>,
  #[serde(default, alias = "flaskApiUrl")]
  pub submit_url: Option<String>,
  #[serde(default, alias = "flaskApiSecret")]
  pub submit_secret: Option<Secret>,
  #[serde(default)]
  pub output_dataset_id: Option<String>,
}

impl LlmsTxtRequest {
  /// The key-value store the design files are read from.
  pub fn source_store_id(&self) -> Result<Option<String>, ConfigError> {
    match &self.default_key_value_store_id {
      Some(id) => storage_id("defaultKeyValueStoreId", Some(id)),
      None => storage_id("kvStoreId", self.kv_store_id.as_deref()),
    }
  }

  pub fn domain(&self) -> Option<&str> {
    self
      .domain
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
  }

  pub fn submit_url(&self) -> &str {
    self
      .submit_url
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .unwrap_or(DEFAULT_SUBMIT_URL)
  }

  pub fn output_dataset_id(&self) -> Result<Option<String>, ConfigError> {
    storage_id("outputDatasetId", self.output_dataset_id.as_deref())
  }

  /// Fill missing fields from the source store's `INPUT` record.
  ///
  /// Values already present on `self` are kept.
  pub fn merge_stored_input(&mut self, stored: &serde_json::Value) {
    if self.domain().is_none() {
      self.domain = stored
        .get("domain")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    }
    if self.anthropic_api_key.is_none() {
      self.anthropic_api_key = secret_field(stored, "anthropicApiKey");
    }
    if self.submit_secret.is_none() {
      self.submit_secret =
        secret_field(stored, "submitSecret").or_else(|| secret_field(stored, "flaskApiSecret"));
    }
  }

  pub fn credential(&self, config: &ActorConfig) -> Result<Secret, ConfigError> {
    resolve_credential(self.anthropic_api_key.as_ref(), config)
  }
}

/// An actor input with its mode decided.
#[derive(Debug, Clone)]
pub enum ActorInput {
  Task(TaskRequest),
  LlmsTxt(LlmsTxtRequest),
}

impl ActorInput {
  /// Decide the run mode from the shape of the input document.
  pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
    if !value.is_object() {
      return Err(ConfigError::InvalidInput {
        message: "input must be a JSON object".to_string(),
      });
    }

    let has_store = ["defaultKeyValueStoreId", "kvStoreId"]
      .iter()
      .any(|field| value.get(field).and_then(|v| v.as_str()).is_some());

    if has_store {
      return Ok(Self::LlmsTxt(serde_json::from_value(value)?));
    }

    if value.get("task").is_some() {
      return Ok(Self::Task(serde_json::from_value(value)?));
    }

    Err(ConfigError::InvalidInput {
      message: "must provide either (kvStoreId + domain) or (task)".to_string(),
    })
  }

  pub fn from_json(input: &str) -> Result<Self, ConfigError> {
    let value: serde_json::Value = serde_json::from_str(input)?;
    Self::from_value(value)
  }
}

fn parse_absolute_url(raw: &str) -> Result<Url, ConfigError> {
  let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
    url: raw.to_string(),
    message: e.to_string(),
  })?;

  if url.cannot_be_a_base() {
    return Err(ConfigError::InvalidUrl {
      url: raw.to_string(),
      message: "expected a hierarchical absolute URI".to_string(),
    });
  }

  Ok(url)
}

fn resolve_credential(
  from_request: Option<&Secret>,
  config: &ActorConfig,
) -> Result<Secret, ConfigError> {
  from_request
    .filter(|s| !s.expose().trim().is_empty())
    .or(config.anthropic_api_key.as_ref())
    .cloned()
    .ok_or(ConfigError::MissingCredential {
      env_var: env::ANTHROPIC_API_KEY,
    })
}

fn secret_field(value: &serde_json::Value, field: &str) -> Option<Secret> {
  value
    .get(field)
    .and_then(|v| v.as_str())
    .and_then(Secret::non_empty)
}

fn non_blank(value: Option<&str>) -> Option<String> {
  value
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}

/// Whether `id` can name a store or dataset.
///
/// Ids become directory names for local storage and path segments for the
/// platform API, so separators and dot-only names are refused.
pub fn is_valid_storage_id(id: &str) -> bool {
  !id.is_empty()
    && id.len() <= MAX_STORAGE_ID_LEN
    && id
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
    && id.chars().any(|c| c != '.')
}

const MAX_STORAGE_ID_LEN: usize = 256;

fn storage_id(field: &str, value: Option<&str>) -> Result<Option<String>, ConfigError> {
  match non_blank(value) {
    Some(id) if !is_valid_storage_id(&id) => Err(ConfigError::InvalidInput {
      message: format!("'{}' is not a valid {}", id, field),
    }),
    id => Ok(id),
  }
}
