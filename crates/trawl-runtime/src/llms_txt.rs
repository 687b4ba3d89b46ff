//! llms.txt generation runs.
//!
//! Reads the design files a previous task run stored, asks the agent to
//! condense them into an llms.txt brand guide, and optionally submits the
//! result to the style guide service.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use trawl_agent::{Agent, AgentRequest, LLMS_TXT_FILE, LLMS_TXT_SYSTEM_SUFFIX, llms_txt_prompt};
use trawl_artifact::{Store, StoreError};
use trawl_collector::WorkspaceError;
use trawl_config::{ActorConfig, ConfigError, LlmsTxtRequest};

use crate::error::RuntimeError;
use crate::platform::Platform;
use crate::result::RunStatus;
use crate::submit::{Submission, Submitter};

/// Model used for llms.txt generation.
pub const LLMS_TXT_MODEL: &str = "sonnet";

/// Key of the record holding a run's input document.
const INPUT_KEY: &str = "INPUT";

const TRANSCRIPT_MARKERS: [&str; 3] = ["SystemMessage", "AssistantMessage", "ResultMessage"];

const GENERATOR: &str = "Generated by trawl llms.txt generator";

/// The record appended to the dataset for an llms.txt run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmsTxtRecord {
  pub mode: &'static str,
  pub domain: String,
  pub kv_store_id: String,
  pub llms_txt: String,
  pub files_analyzed: usize,
  pub submission: Option<Submission>,
  pub status: RunStatus,
  pub error: Option<String>,
}

/// Generates an llms.txt document from a key-value store.
pub struct LlmsTxtRun {
  config: ActorConfig,
  platform: Arc<dyn Platform>,
  agent: Arc<dyn Agent>,
  submitter: Submitter,
}

impl LlmsTxtRun {
  pub fn new(config: ActorConfig, platform: Arc<dyn Platform>, agent: Arc<dyn Agent>) -> Self {
    Self {
      config,
      platform,
      agent,
      submitter: Submitter::new(),
    }
  }

  #[instrument(
    name = "llms_txt_run",
    skip(self, request, cancel),
    fields(run_id = %self.config.run_id)
  )]
  pub async fn run(
    &self,
    mut request: LlmsTxtRequest,
    cancel: CancellationToken,
  ) -> Result<LlmsTxtRecord, RuntimeError> {
    let store_id = request
      .source_store_id()?
      .ok_or_else(|| ConfigError::InvalidInput {
        message: "kvStoreId is required".to_string(),
      })?;
    let source = self.platform.key_value_store(&store_id)?;

    if request.domain().is_none() {
      match source.get(INPUT_KEY).await {
        Ok(record) => {
          let stored: serde_json::Value = serde_json::from_slice(&record.data)
            .map_err(ConfigError::from)?;
          request.merge_stored_input(&stored);
        }
        Err(StoreError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
      }
    }
    let domain = request
      .domain()
      .ok_or_else(|| ConfigError::InvalidInput {
        message: "domain is required".to_string(),
      })?
      .to_string();
    let credential = request.credential(&self.config)?;

    let dataset_id = request
      .output_dataset_id()?
      .unwrap_or_else(|| self.config.storage.default_dataset_id.clone());
    let dataset = self.platform.dataset(&dataset_id)?;

    info!(store_id = %store_id, domain = %domain, "run_started");

    let files = read_text_records(source.as_ref()).await?;
    let mut error = None;

    let llms_txt = if files.is_empty() {
      warn!(store_id = %store_id, "no_design_files");
      basic_template(&domain)
    } else {
      let workspace = &self.config.output_root;
      let output_path = workspace.join(LLMS_TXT_FILE);
      tokio::fs::create_dir_all(workspace)
        .await
        .map_err(|source| WorkspaceError::Io {
          path: workspace.clone(),
          source,
        })?;
      // Never pick up a document left behind by an earlier run.
      match tokio::fs::remove_file(&output_path).await {
        Ok(()) => debug!(path = %output_path.display(), "stale_llms_txt_removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => {
          return Err(
            WorkspaceError::Io {
              path: output_path,
              source,
            }
            .into(),
          );
        }
      }

      let prompt = llms_txt_prompt(&domain, &files);
      let agent_request = AgentRequest::new(prompt, workspace, credential)
        .with_model(LLMS_TXT_MODEL)
        .with_system_prompt_suffix(LLMS_TXT_SYSTEM_SUFFIX);
      let names: Vec<&str> = files.iter().map(|(name, _)| name.as_str()).collect();

      let body = match self.agent.run(agent_request, cancel).await {
        Ok(_) => match tokio::fs::read_to_string(&output_path).await {
          Ok(raw) => clean_llms_txt(&raw),
          Err(e) => {
            warn!(path = %output_path.display(), error = %e, "llms_txt_missing");
            error = Some(format!("agent did not write {}: {}", LLMS_TXT_FILE, e));
            fallback_template(
              &domain,
              &names,
              "Automated analysis encountered an issue. Please review manually.",
            )
          }
        },
        Err(e) => {
          warn!(error = %e, "agent_failed");
          let note = format!("Error occurred during AI analysis - {}", e);
          error = Some(e.to_string());
          fallback_template(&domain, &names, &note)
        }
      };

      format!("{}{}", body, footer(files.len(), &domain))
    };

    let submission = match &request.submit_secret {
      Some(secret) => Some(
        self
          .submitter
          .submit(request.submit_url(), secret, &domain, &llms_txt)
          .await,
      ),
      None => {
        info!("llms_txt_submission_skipped");
        None
      }
    };

    let submission_failed = submission.as_ref().is_some_and(|s| !s.success);
    let status = if error.is_some() || submission_failed {
      RunStatus::Partial
    } else {
      RunStatus::Complete
    };

    let record = LlmsTxtRecord {
      mode: "llms_txt_generation",
      domain,
      kv_store_id: store_id,
      llms_txt,
      files_analyzed: files.len(),
      submission,
      status,
      error,
    };

    let value = serde_json::to_value(&record).map_err(trawl_dataset::DatasetError::from)?;
    dataset.push(&value).await?;

    info!(
      domain = %record.domain,
      files_analyzed = record.files_analyzed,
      status = record.status.as_str(),
      "run_completed"
    );

    Ok(record)
  }
}

/// Read every textual record of `store`, in key order.
///
/// JSON records are pretty-printed. Binary records and records that fail to
/// load are skipped. The input record is never included, since it may carry
/// credentials.
async fn read_text_records(store: &dyn Store) -> Result<Vec<(String, String)>, StoreError> {
  let keys = store.list("").await?;
  debug!(keys = keys.len(), "design_files_listed");

  let mut files = Vec::new();
  for key in keys {
    if key == INPUT_KEY {
      continue;
    }

    let record = match store.get(&key).await {
      Ok(record) => record,
      Err(e) => {
        warn!(key = %key, error = %e, "design_file_unreadable");
        continue;
      }
    };

    let Some(text) = decode_text(&record.content_type, &record.data) else {
      debug!(key = %key, content_type = %record.content_type, "design_file_binary");
      continue;
    };
    files.push((key, text));
  }

  Ok(files)
}

fn decode_text(content_type: &str, data: &[u8]) -> Option<String> {
  let mime = content_type
    .split(';')
    .next()
    .unwrap_or_default()
    .trim()
    .to_ascii_lowercase();

  if mime == "application/json" {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(data)
      && let Ok(pretty) = serde_json::to_string_pretty(&value)
    {
      return Some(pretty);
    }
    return String::from_utf8(data.to_vec()).ok();
  }

  if mime.starts_with("text/") {
    return String::from_utf8(data.to_vec()).ok();
  }

  None
}

/// Strip agent transcript noise from a generated document.
///
/// When the document contains transcript markers and a fenced markdown
/// block, only the first block's content is kept. Otherwise it is returned
/// unchanged.
pub fn clean_llms_txt(raw: &str) -> String {
  if !TRANSCRIPT_MARKERS.iter().any(|m| raw.contains(m)) {
    return raw.to_string();
  }

  const FENCE: &str = "```markdown";
  let Some(start) = raw.find(FENCE) else {
    return raw.to_string();
  };
  let body = &raw[start + FENCE.len()..];
  match body.find("```") {
    Some(end) => body[..end].trim().to_string(),
    None => raw.to_string(),
  }
}

fn basic_template(domain: &str) -> String {
  format!(
    "# {domain} Design System

> Brand design guidelines and style tokens

## Overview

This is the design system for {domain}.

Note: No design files were available for analysis.

---

{GENERATOR}
"
  )
}

fn fallback_template(domain: &str, names: &[&str], note: &str) -> String {
  let listing = names
    .iter()
    .map(|name| format!("- {}", name))
    .collect::<Vec<_>>()
    .join("\n");

  format!(
    "# {domain} Design System

> Brand design guidelines and style tokens

## Overview

This is the design system for {domain}.

## Files Analyzed

{listing}

Note: {note}
"
  )
}

fn footer(files_analyzed: usize, domain: &str) -> String {
  format!(
    "

---

{GENERATOR}
Files analyzed: {files_analyzed}
Source: {domain}
"
  )
}
