mod common;

use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use trawl_artifact::{MemoryStore, Store};
use trawl_config::{ConfigError, LlmsTxtRequest};
use trawl_runtime::{LLMS_TXT_MODEL, LlmsTxtRun, MemoryPlatform, RunStatus, RuntimeError};

use common::{ScriptedAgent, config};

fn request(value: serde_json::Value) -> LlmsTxtRequest {
  serde_json::from_value(value).unwrap()
}

async fn design_store() -> MemoryStore {
  let store = MemoryStore::new();
  store
    .put(
      "run-0_workspace_palette.json",
      Bytes::from_static(br##"{"primary":"#0044ff"}"##),
      "application/json",
    )
    .await
    .unwrap();
  store
    .put(
      "run-0_workspace_report.md",
      Bytes::from_static(b"# Acme\nBold and bright."),
      "text/markdown",
    )
    .await
    .unwrap();
  store
    .put(
      "run-0_playwright_home.png",
      Bytes::from_static(b"\x89PNG\r\n"),
      "image/png",
    )
    .await
    .unwrap();
  store
}

#[tokio::test]
async fn test_generates_from_agent_output() {
  let tmp = TempDir::new().unwrap();
  let platform = Arc::new(MemoryPlatform::new().with_store("kv-1", design_store().await));
  let agent = Arc::new(ScriptedAgent::new().writes(
    "llms.txt",
    "SystemMessage(init)\n```markdown\n# Acme\n\n> Bold, bright, blue\n```\nResultMessage(done)",
  ));

  let record = LlmsTxtRun::new(config(tmp.path(), Some("k")), platform.clone(), agent.clone())
    .run(
      request(json!({ "kvStoreId": "kv-1", "domain": "acme.com" })),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert_eq!(record.status, RunStatus::Complete);
  assert_eq!(record.files_analyzed, 2);
  assert!(record.llms_txt.starts_with("# Acme\n\n> Bold, bright, blue\n\n---\n"));
  assert!(record.llms_txt.contains("Files analyzed: 2\nSource: acme.com\n"));
  assert!(record.submission.is_none());

  let requests = agent.requests();
  assert_eq!(requests[0].model.as_deref(), Some(LLMS_TXT_MODEL));
  assert!(requests[0].system_prompt_suffix.is_some());
  assert!(requests[0].prompt.contains("**run-0_workspace_palette.json**"));
  assert!(requests[0].prompt.contains("\"primary\": \"#0044ff\""));
  assert!(!requests[0].prompt.contains("home.png"));

  let items = platform.memory_dataset("default").items().await;
  assert_eq!(items.len(), 1);
  assert_eq!(items[0]["mode"], "llms_txt_generation");
  assert_eq!(items[0]["kv_store_id"], "kv-1");
}

#[tokio::test]
async fn test_empty_store_uses_basic_template() {
  let tmp = TempDir::new().unwrap();
  let platform = Arc::new(MemoryPlatform::new());
  let agent = Arc::new(ScriptedAgent::new());

  let record = LlmsTxtRun::new(config(tmp.path(), Some("k")), platform, agent.clone())
    .run(
      request(json!({ "kvStoreId": "empty", "domain": "acme.com" })),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert!(agent.requests().is_empty());
  assert_eq!(record.files_analyzed, 0);
  assert!(record.llms_txt.starts_with("# acme.com Design System"));
  assert!(record.llms_txt.contains("No design files were available"));
}

#[tokio::test]
async fn test_missing_output_falls_back() {
  let tmp = TempDir::new().unwrap();
  let platform = Arc::new(MemoryPlatform::new().with_store("kv-1", design_store().await));
  let agent = Arc::new(ScriptedAgent::new().says("I could not finish"));

  let record = LlmsTxtRun::new(config(tmp.path(), Some("k")), platform, agent)
    .run(
      request(json!({ "kvStoreId": "kv-1", "domain": "acme.com" })),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert_eq!(record.status, RunStatus::Partial);
  assert!(record.llms_txt.contains("## Files Analyzed"));
  assert!(record.llms_txt.contains("- run-0_workspace_report.md"));
  assert!(record.llms_txt.contains("Files analyzed: 2"));
}

#[tokio::test]
async fn test_stale_output_is_not_reused() {
  let tmp = TempDir::new().unwrap();
  let config = config(tmp.path(), Some("k"));
  std::fs::create_dir_all(&config.output_root).unwrap();
  std::fs::write(config.output_root.join("llms.txt"), "# Stale").unwrap();

  let platform = Arc::new(MemoryPlatform::new().with_store("kv-1", design_store().await));
  let record = LlmsTxtRun::new(config, platform, Arc::new(ScriptedAgent::new()))
    .run(
      request(json!({ "kvStoreId": "kv-1", "domain": "acme.com" })),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert!(!record.llms_txt.contains("# Stale"));
}

#[tokio::test]
async fn test_agent_failure_falls_back_with_error() {
  let tmp = TempDir::new().unwrap();
  let platform = Arc::new(MemoryPlatform::new().with_store("kv-1", design_store().await));
  let agent = Arc::new(ScriptedAgent::new().fails_with("overloaded"));

  let record = LlmsTxtRun::new(config(tmp.path(), Some("k")), platform, agent)
    .run(
      request(json!({ "kvStoreId": "kv-1", "domain": "acme.com" })),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert_eq!(record.status, RunStatus::Partial);
  assert!(record.error.as_deref().unwrap().contains("overloaded"));
  assert!(record.llms_txt.contains("Error occurred during AI analysis"));
}

#[tokio::test]
async fn test_domain_and_key_from_stored_input() {
  let tmp = TempDir::new().unwrap();
  let store = design_store().await;
  store
    .put(
      "INPUT",
      Bytes::from(
        json!({ "domain": "stored.example", "anthropicApiKey": "sk-stored" }).to_string(),
      ),
      "application/json",
    )
    .await
    .unwrap();
  let platform = Arc::new(MemoryPlatform::new().with_store("kv-1", store));
  let agent = Arc::new(ScriptedAgent::new());

  let record = LlmsTxtRun::new(config(tmp.path(), None), platform, agent.clone())
    .run(
      request(json!({ "defaultKeyValueStoreId": "kv-1" })),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert_eq!(record.domain, "stored.example");
  assert_eq!(record.files_analyzed, 2);

  let requests = agent.requests();
  assert_eq!(requests[0].credential.expose(), "sk-stored");
  assert!(!requests[0].prompt.contains("sk-stored"));
}

#[tokio::test]
async fn test_missing_domain_is_a_config_error() {
  let tmp = TempDir::new().unwrap();
  let platform = Arc::new(MemoryPlatform::new());

  let err = LlmsTxtRun::new(
    config(tmp.path(), Some("k")),
    platform.clone(),
    Arc::new(ScriptedAgent::new()),
  )
  .run(request(json!({ "kvStoreId": "kv-1" })), CancellationToken::new())
  .await
  .unwrap_err();

  assert!(matches!(err, RuntimeError::Config(ConfigError::InvalidInput { .. })));
  assert!(platform.memory_dataset("default").items().await.is_empty());
}

#[tokio::test]
async fn test_failed_submission_is_recorded() {
  let tmp = TempDir::new().unwrap();
  let platform = Arc::new(MemoryPlatform::new());

  let record = LlmsTxtRun::new(
    config(tmp.path(), Some("k")),
    platform,
    Arc::new(ScriptedAgent::new()),
  )
  .run(
    request(json!({
      "kvStoreId": "kv-1",
      "domain": "acme.com",
      "submitUrl": "http://127.0.0.1:9",
      "submitSecret": "s3cret"
    })),
    CancellationToken::new(),
  )
  .await
  .unwrap();

  let submission = record.submission.unwrap();
  assert!(!submission.success);
  assert_eq!(record.status, RunStatus::Partial);
}

#[tokio::test]
async fn test_path_like_ids_are_rejected() {
  let tmp = TempDir::new().unwrap();
  let config = config(tmp.path(), Some("k"));
  let platform = trawl_runtime::platform_for(&config.storage);
  let agent = Arc::new(ScriptedAgent::new());

  for input in [
    json!({ "kvStoreId": "../../elsewhere", "domain": "acme.com" }),
    json!({ "kvStoreId": "kv-1", "domain": "acme.com", "outputDatasetId": "/tmp/elsewhere" }),
  ] {
    let err = LlmsTxtRun::new(config.clone(), platform.clone(), agent.clone())
      .run(request(input), CancellationToken::new())
      .await
      .unwrap_err();
    assert!(matches!(err, RuntimeError::Config(ConfigError::InvalidInput { .. })));
  }

  assert!(agent.requests().is_empty());
  assert!(!tmp.path().join("storage/datasets").exists());
}
