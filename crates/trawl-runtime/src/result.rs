//! Result record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trawl_collector::Category;

use crate::publish::PublishReport;

/// A published artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
  /// Key in the run's key-value store.
  pub key: String,
  /// Where the record can be fetched from.
  pub uri: String,
  /// Path relative to the workspace root.
  pub path: String,
  pub category: Category,
  pub content_type: String,
  pub size: u64,
  /// Hex SHA-256 of the stored bytes.
  pub digest: String,
}

/// An artifact that could not be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishFailure {
  pub path: String,
  /// The key the artifact was going to be stored under, if one was allocated.
  pub key: Option<String>,
  pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
  /// Every attempted upload succeeded.
  Complete,
  /// Some uploads or the agent failed, but output was kept.
  Partial,
  /// Nothing usable was produced.
  Failed,
}

impl RunStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      RunStatus::Complete => "complete",
      RunStatus::Partial => "partial",
      RunStatus::Failed => "failed",
    }
  }
}

/// The single record appended to the dataset for a run.
///
/// `output_files` is the canonical list of references. It is serialized a
/// second time as `stored_files` for consumers of the older field name.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
  pub run_id: String,
  pub task: String,
  pub url: Option<String>,
  pub task_output: String,
  pub responses: Vec<String>,
  pub output_files: Vec<StoredFile>,
  pub attempted: usize,
  pub failures: Vec<PublishFailure>,
  pub status: RunStatus,
  pub error: Option<String>,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct RecordWire<'a> {
  run_id: &'a str,
  task: &'a str,
  url: Option<&'a str>,
  task_output: &'a str,
  responses: &'a [String],
  output_files: &'a [StoredFile],
  stored_files: &'a [StoredFile],
  attempted: usize,
  succeeded: usize,
  failed: usize,
  failures: &'a [PublishFailure],
  status: RunStatus,
  error: Option<&'a str>,
  started_at: DateTime<Utc>,
  finished_at: DateTime<Utc>,
}

impl Serialize for ResultRecord {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    RecordWire {
      run_id: &self.run_id,
      task: &self.task,
      url: self.url.as_deref(),
      task_output: &self.task_output,
      responses: &self.responses,
      output_files: &self.output_files,
      stored_files: &self.output_files,
      attempted: self.attempted,
      succeeded: self.succeeded(),
      failed: self.failed_count(),
      failures: &self.failures,
      status: self.status,
      error: self.error.as_deref(),
      started_at: self.started_at,
      finished_at: self.finished_at,
    }
    .serialize(serializer)
  }
}

impl ResultRecord {
  /// A record for a run that could not produce anything.
  pub fn failed(message: impl Into<String>) -> Self {
    let now = Utc::now();
    Self {
      run_id: String::new(),
      task: String::new(),
      url: None,
      task_output: String::new(),
      responses: Vec::new(),
      output_files: Vec::new(),
      attempted: 0,
      failures: Vec::new(),
      status: RunStatus::Failed,
      error: Some(message.into()),
      started_at: now,
      finished_at: now,
    }
  }

  pub fn succeeded(&self) -> usize {
    self.output_files.len()
  }

  pub fn failed_count(&self) -> usize {
    self.failures.len()
  }

  pub fn with_run(
    mut self,
    run_id: impl Into<String>,
    task: impl Into<String>,
    url: Option<String>,
  ) -> Self {
    self.run_id = run_id.into();
    self.task = task.into();
    self.url = url;
    self
  }

  pub fn with_responses(mut self, responses: Vec<String>) -> Self {
    self.responses = responses;
    self
  }

  pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
    self.started_at = started_at;
    self
  }

  /// Record an agent failure.
  ///
  /// The run degrades to `partial` when files were still stored, and to
  /// `failed` when nothing was.
  pub fn with_agent_error(mut self, message: impl Into<String>) -> Self {
    self.error = Some(message.into());
    self.status = if self.output_files.is_empty() {
      RunStatus::Failed
    } else {
      RunStatus::Partial
    };
    self
  }

  pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(self)
  }
}

/// Build the record for a run from its publish outcomes and the agent's
/// final answer.
///
/// References are kept in publish order. The status only depends on the
/// upload counts, never on `task_output`.
pub fn finalize(report: PublishReport, task_output: impl Into<String>) -> ResultRecord {
  let status = if report.failures.is_empty() {
    RunStatus::Complete
  } else {
    RunStatus::Partial
  };
  let now = Utc::now();

  ResultRecord {
    run_id: String::new(),
    task: String::new(),
    url: None,
    task_output: task_output.into(),
    responses: Vec::new(),
    output_files: report.stored,
    attempted: report.attempted,
    failures: report.failures,
    status,
    error: None,
    started_at: now,
    finished_at: now,
  }
}
