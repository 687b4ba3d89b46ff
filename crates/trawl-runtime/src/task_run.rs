//! Browsing task runs.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use trawl_agent::{Agent, AgentRequest, task_prompt};
use trawl_collector::{Collector, Snapshot, WorkspaceError};
use trawl_config::{ActorConfig, TaskRequest};
use trawl_dataset::{Dataset, DatasetError};

use crate::error::RuntimeError;
use crate::platform::Platform;
use crate::publish::Publisher;
use crate::result::{ResultRecord, finalize};

/// Runs one browsing task end to end.
///
/// ```text
/// validate ─> prepare workspace ─> snapshot ─> agent ─> collect changed
///          ─> publish ─> finalize ─> append record
/// ```
///
/// Nothing touches the filesystem or storage until the request has been
/// validated. Once the workspace exists, every run appends exactly one
/// record, even when it fails.
pub struct TaskRun {
  config: ActorConfig,
  platform: Arc<dyn Platform>,
  agent: Arc<dyn Agent>,
}

impl TaskRun {
  pub fn new(config: ActorConfig, platform: Arc<dyn Platform>, agent: Arc<dyn Agent>) -> Self {
    Self {
      config,
      platform,
      agent,
    }
  }

  #[instrument(
    name = "task_run",
    skip(self, request, cancel),
    fields(run_id = %self.config.run_id)
  )]
  pub async fn run(
    &self,
    request: &TaskRequest,
    cancel: CancellationToken,
  ) -> Result<ResultRecord, RuntimeError> {
    let started_at = Utc::now();
    let task = request.validate(&self.config)?;
    let url = task.url.as_ref().map(|u| u.to_string());

    let dataset_id = task
      .output_dataset_id
      .as_deref()
      .unwrap_or(&self.config.storage.default_dataset_id);
    let dataset = self.platform.dataset(dataset_id)?;
    let store = self
      .platform
      .key_value_store(&self.config.storage.default_store_id)?;
    let publisher = Publisher::open(
      store,
      self.config.run_id.as_str(),
      self.config.publish_concurrency,
    )
    .await?;

    info!(
      run_id = %self.config.run_id,
      workspace = %self.config.output_root.display(),
      dataset_id = %dataset_id,
      has_url = url.is_some(),
      "run_started"
    );

    let failed = |message: String| {
      ResultRecord::failed(message)
        .with_run(self.config.run_id.as_str(), task.task.as_str(), url.clone())
        .with_started_at(started_at)
    };

    let collector = Collector::new(&self.config.output_root)
      .with_artifact_dir(&self.config.artifact_dir);

    let baseline = prepare_workspace(&self.config).and_then(|()| Snapshot::capture(&collector));
    let baseline = match baseline {
      Ok(baseline) => baseline,
      Err(e) => {
        append(dataset.as_ref(), &failed(e.to_string())).await?;
        error!(run_id = %self.config.run_id, error = %e, "run_failed");
        return Err(e.into());
      }
    };

    let agent_request = AgentRequest::new(
      task_prompt(&task.task, task.url.as_ref()),
      &self.config.output_root,
      task.credential.clone(),
    );
    let agent_result = self.agent.run(agent_request, cancel).await;
    if let Err(e) = &agent_result {
      warn!(run_id = %self.config.run_id, error = %e, "agent_failed");
    }

    // The agent has terminated (or been killed), so the workspace is quiescent.
    let artifacts = match collector.collect() {
      Ok(artifacts) => artifacts.changed_since(&baseline),
      Err(e) => {
        let responses = match agent_result {
          Ok(output) => output.responses,
          Err(agent_error) => agent_error.responses().to_vec(),
        };
        let record = failed(e.to_string()).with_responses(responses);
        append(dataset.as_ref(), &record).await?;
        error!(run_id = %self.config.run_id, error = %e, "run_failed");
        return Err(e.into());
      }
    };

    let report = publisher.publish_all(artifacts).await;

    let record = match agent_result {
      Ok(output) => finalize(report, output.final_response.unwrap_or_default())
        .with_responses(output.responses),
      Err(e) => finalize(report, String::new())
        .with_responses(e.responses().to_vec())
        .with_agent_error(e.to_string()),
    }
    .with_run(self.config.run_id.as_str(), task.task.as_str(), url.clone())
    .with_started_at(started_at);

    append(dataset.as_ref(), &record).await?;

    info!(
      run_id = %self.config.run_id,
      status = record.status.as_str(),
      attempted = record.attempted,
      succeeded = record.succeeded(),
      failed = record.failed_count(),
      "run_completed"
    );

    Ok(record)
  }
}

fn prepare_workspace(config: &ActorConfig) -> Result<(), WorkspaceError> {
  create_dir(&config.output_root)?;
  create_dir(&config.artifact_dir)
}

fn create_dir(path: &Path) -> Result<(), WorkspaceError> {
  std::fs::create_dir_all(path).map_err(|source| WorkspaceError::Io {
    path: path.to_path_buf(),
    source,
  })
}

async fn append(dataset: &dyn Dataset, record: &ResultRecord) -> Result<(), DatasetError> {
  dataset.push(&record.to_value()?).await
}
