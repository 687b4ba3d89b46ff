//! Process-level configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::secret::Secret;

/// Environment variable names read by [`ActorConfig::from_env`].
pub mod env {
  pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
  pub const OUTPUT_ROOT: &str = "ACTOR_OUTPUT_ROOT";
  pub const ARTIFACT_DIR: &str = "PLAYWRIGHT_ARTIFACT_DIR";
  pub const RUN_ID: &str = "ACTOR_RUN_ID";
  pub const APIFY_TOKEN: &str = "APIFY_TOKEN";
  pub const APIFY_API_BASE_URL: &str = "APIFY_API_BASE_URL";
  pub const DEFAULT_STORE_ID: &str = "APIFY_DEFAULT_KEY_VALUE_STORE_ID";
  pub const DEFAULT_DATASET_ID: &str = "APIFY_DEFAULT_DATASET_ID";
  pub const LOCAL_STORAGE_DIR: &str = "APIFY_LOCAL_STORAGE_DIR";
  pub const AGENT_COMMAND: &str = "TRAWL_AGENT_COMMAND";
  pub const AGENT_MODEL: &str = "TRAWL_AGENT_MODEL";
  pub const AGENT_TIMEOUT_SECS: &str = "TRAWL_AGENT_TIMEOUT_SECS";
  pub const PUBLISH_CONCURRENCY: &str = "TRAWL_PUBLISH_CONCURRENCY";
  pub const MAX_RECORD_BYTES: &str = "TRAWL_MAX_RECORD_BYTES";
}

const DEFAULT_OUTPUT_ROOT: &str = "/usr/src/app";
const DEFAULT_API_BASE_URL: &str = "https://api.apify.com";
const DEFAULT_STORAGE_ID: &str = "default";
const DEFAULT_AGENT_COMMAND: &str = "claude";
const DEFAULT_AGENT_MODEL: &str = "haiku";
const DEFAULT_PUBLISH_CONCURRENCY: usize = 4;

/// Where key-value stores and datasets live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
  /// Local directory tree (`{dir}/key_value_stores/...`, `{dir}/datasets/...`).
  Local { dir: PathBuf },
  /// The hosting platform's HTTP API.
  Platform { base_url: String, token: Secret },
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
  pub backend: StorageBackend,
  pub default_store_id: String,
  pub default_dataset_id: String,
  /// Largest record a store accepts. `None` means no local limit.
  pub max_record_bytes: Option<u64>,
}

/// How the agent CLI is launched.
#[derive(Debug, Clone)]
pub struct AgentSettings {
  pub command: String,
  pub model: String,
  pub timeout: Option<Duration>,
}

/// Configuration for one actor process.
#[derive(Debug, Clone)]
pub struct ActorConfig {
  /// Fallback credential when a request carries none.
  pub anthropic_api_key: Option<Secret>,
  /// The run's workspace.
  pub output_root: PathBuf,
  /// Where the browser automation server drops traces and screenshots.
  pub artifact_dir: PathBuf,
  pub run_id: String,
  pub storage: StorageConfig,
  pub agent: AgentSettings,
  pub publish_concurrency: usize,
}

impl Default for ActorConfig {
  fn default() -> Self {
    let output_root = PathBuf::from(DEFAULT_OUTPUT_ROOT);
    Self {
      anthropic_api_key: None,
      artifact_dir: output_root.join(".playwright-mcp"),
      storage: StorageConfig {
        backend: StorageBackend::Local {
          dir: output_root.join("storage"),
        },
        default_store_id: DEFAULT_STORAGE_ID.to_string(),
        default_dataset_id: DEFAULT_STORAGE_ID.to_string(),
        max_record_bytes: None,
      },
      output_root,
      run_id: "run".to_string(),
      agent: AgentSettings {
        command: DEFAULT_AGENT_COMMAND.to_string(),
        model: DEFAULT_AGENT_MODEL.to_string(),
        timeout: None,
      },
      publish_concurrency: DEFAULT_PUBLISH_CONCURRENCY,
    }
  }
}

impl ActorConfig {
  /// Resolve configuration from the process environment.
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|name| std::env::var(name).ok())
  }

  /// Resolve configuration through an arbitrary variable lookup.
  ///
  /// Blank values count as unset.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let output_root = get(env::OUTPUT_ROOT)
      .map(PathBuf::from)
      .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_ROOT));

    let artifact_dir = get(env::ARTIFACT_DIR)
      .map(PathBuf::from)
      .unwrap_or_else(|| output_root.join(".playwright-mcp"));

    let backend = match get(env::APIFY_TOKEN) {
      Some(token) => StorageBackend::Platform {
        base_url: get(env::APIFY_API_BASE_URL).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        token: Secret::new(token),
      },
      None => StorageBackend::Local {
        dir: get(env::LOCAL_STORAGE_DIR)
          .map(PathBuf::from)
          .unwrap_or_else(|| output_root.join("storage")),
      },
    };

    let timeout = parse_var::<u64>(env::AGENT_TIMEOUT_SECS, get(env::AGENT_TIMEOUT_SECS))?
      .map(Duration::from_secs);

    let publish_concurrency =
      parse_var::<usize>(env::PUBLISH_CONCURRENCY, get(env::PUBLISH_CONCURRENCY))?
        .unwrap_or(DEFAULT_PUBLISH_CONCURRENCY);
    if publish_concurrency == 0 {
      return Err(ConfigError::InvalidValue {
        name: env::PUBLISH_CONCURRENCY,
        value: "0".to_string(),
      });
    }

    Ok(Self {
      anthropic_api_key: get(env::ANTHROPIC_API_KEY).map(Secret::new),
      artifact_dir,
      run_id: get(env::RUN_ID).unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
      storage: StorageConfig {
        backend,
        default_store_id: get(env::DEFAULT_STORE_ID).unwrap_or_else(|| DEFAULT_STORAGE_ID.to_string()),
        default_dataset_id: get(env::DEFAULT_DATASET_ID)
          .unwrap_or_else(|| DEFAULT_STORAGE_ID.to_string()),
        max_record_bytes: parse_var(env::MAX_RECORD_BYTES, get(env::MAX_RECORD_BYTES))?,
      },
      agent: AgentSettings {
        command: get(env::AGENT_COMMAND).unwrap_or_else(|| DEFAULT_AGENT_COMMAND.to_string()),
        model: get(env::AGENT_MODEL).unwrap_or_else(|| DEFAULT_AGENT_MODEL.to_string()),
        timeout,
      },
      output_root,
      publish_concurrency,
    })
  }
}

fn parse_var<T: std::str::FromStr>(
  name: &'static str,
  value: Option<String>,
) -> Result<Option<T>, ConfigError> {
  value
    .map(|raw| {
      raw
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue { name, value: raw })
    })
    .transpose()
}
