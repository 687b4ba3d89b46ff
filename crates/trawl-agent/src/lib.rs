//! Trawl Agent
//!
//! The boundary to the external agent harness. An [`Agent`] takes a prompt
//! and a workspace directory, runs to completion (or until cancelled) and
//! reports what it said. Everything the agent produces on disk is picked up
//! afterwards by the collector, never by this crate.

mod claude;
mod error;
mod mcp;
mod prompt;
mod transcript;

pub use claude::{ClaudeCodeAgent, ClaudeCodeConfig};
pub use error::AgentError;
pub use mcp::{McpConfig, McpServer};
pub use prompt::{
  LLMS_TXT_FILE, LLMS_TXT_SYSTEM_SUFFIX, MAX_PROMPT_FILES, MAX_PROMPT_FILE_CHARS, llms_txt_prompt,
  task_prompt,
};
pub use transcript::Transcript;

use std::path::PathBuf;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use trawl_config::Secret;

/// One invocation of the agent.
#[derive(Debug, Clone)]
pub struct AgentRequest {
  pub prompt: String,
  /// Working directory of the agent. Files it writes land here.
  pub workspace: PathBuf,
  /// Injected into the agent's environment only.
  pub credential: Secret,
  /// Overrides the configured model.
  pub model: Option<String>,
  /// Appended to the agent's built-in system prompt.
  pub system_prompt_suffix: Option<String>,
}

impl AgentRequest {
  pub fn new(prompt: impl Into<String>, workspace: impl Into<PathBuf>, credential: Secret) -> Self {
    Self {
      prompt: prompt.into(),
      workspace: workspace.into(),
      credential,
      model: None,
      system_prompt_suffix: None,
    }
  }

  pub fn with_model(mut self, model: impl Into<String>) -> Self {
    self.model = Some(model.into());
    self
  }

  pub fn with_system_prompt_suffix(mut self, suffix: impl Into<String>) -> Self {
    self.system_prompt_suffix = Some(suffix.into());
    self
  }
}

/// What the agent said during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentOutput {
  /// Every message the agent emitted, in order.
  pub responses: Vec<String>,
  /// The agent's final answer, if it produced one.
  pub final_response: Option<String>,
}

/// Runs an agent to completion.
///
/// Implementations must return once `cancel` fires, after stopping whatever
/// they launched.
#[async_trait]
pub trait Agent: Send + Sync {
  async fn run(
    &self,
    request: AgentRequest,
    cancel: CancellationToken,
  ) -> Result<AgentOutput, AgentError>;
}
