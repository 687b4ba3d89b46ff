use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use trawl_config::{AgentSettings, env};

use crate::mcp::{McpConfig, McpServer};
use crate::transcript::Transcript;
use crate::{Agent, AgentError, AgentOutput, AgentRequest};

/// How the agent CLI is launched.
#[derive(Debug, Clone)]
pub struct ClaudeCodeConfig {
  pub command: String,
  pub model: String,
  pub timeout: Option<Duration>,
  pub mcp_servers: Vec<McpServer>,
}

impl ClaudeCodeConfig {
  pub fn from_settings(settings: &AgentSettings) -> Self {
    Self {
      command: settings.command.clone(),
      model: settings.model.clone(),
      timeout: settings.timeout,
      mcp_servers: Vec::new(),
    }
  }

  pub fn with_mcp_server(mut self, server: McpServer) -> Self {
    self.mcp_servers.push(server);
    self
  }
}

/// Runs the agent CLI as a child process in `stream-json` mode.
///
/// The child inherits the parent environment plus `ANTHROPIC_API_KEY`; the
/// parent's own environment is left untouched.
///
/// On unix the child leads its own process group, so the MCP servers and
/// browsers it launches can be stopped with it. The whole group is killed
/// when the run ends for any reason: normal exit, cancellation, timeout, or
/// the future being dropped. A returned `run` means nothing the agent started
/// is still writing to the workspace.
pub struct ClaudeCodeAgent {
  config: ClaudeCodeConfig,
}

impl ClaudeCodeAgent {
  pub fn new(config: ClaudeCodeConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &ClaudeCodeConfig {
    &self.config
  }

  /// Command-line arguments for `request`, excluding the program name.
  pub fn arguments(&self, request: &AgentRequest) -> Result<Vec<String>, AgentError> {
    let model = request.model.as_deref().unwrap_or(&self.config.model);

    let mut args = vec![
      "-p".to_string(),
      request.prompt.clone(),
      "--output-format".to_string(),
      "stream-json".to_string(),
      "--verbose".to_string(),
      "--model".to_string(),
      model.to_string(),
      "--permission-mode".to_string(),
      "bypassPermissions".to_string(),
    ];

    if !self.config.mcp_servers.is_empty() {
      let mcp = McpConfig::new(&self.config.mcp_servers)
        .to_json()
        .map_err(|e| AgentError::Config {
          message: format!("failed to encode mcp config: {}", e),
        })?;
      args.push("--mcp-config".to_string());
      args.push(mcp);
    }

    if let Some(suffix) = &request.system_prompt_suffix {
      args.push("--append-system-prompt".to_string());
      args.push(suffix.clone());
    }

    Ok(args)
  }

  fn spawn(&self, request: &AgentRequest) -> Result<Child, AgentError> {
    let mut command = Command::new(&self.config.command);
    command
      .args(self.arguments(request)?)
      .current_dir(&request.workspace)
      .env(env::ANTHROPIC_API_KEY, request.credential.expose())
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);

    #[cfg(unix)]
    command.process_group(0);

    command.spawn().map_err(|source| AgentError::Spawn {
      command: self.config.command.clone(),
      source,
    })
  }
}

/// The agent's process group. Killed when dropped.
struct ProcessGroup {
  #[cfg_attr(not(unix), allow(dead_code))]
  leader: Option<u32>,
}

impl ProcessGroup {
  fn of(child: &Child) -> Self {
    Self { leader: child.id() }
  }

  /// Send SIGKILL to every process in the group.
  fn kill(&self) {
    #[cfg(unix)]
    {
      if let Some(pid) = self.leader.and_then(|pid| i32::try_from(pid).ok()) {
        // SAFETY: kill(2) takes no pointers. ESRCH (group already gone) is fine.
        unsafe {
          libc::kill(-pid, libc::SIGKILL);
        }
      }
    }
  }
}

impl Drop for ProcessGroup {
  fn drop(&mut self) {
    self.kill();
  }
}

/// Stop the agent and everything it started, then reap the child.
async fn terminate(child: &mut Child, group: &ProcessGroup) {
  group.kill();
  if let Err(e) = child.kill().await {
    debug!(error = %e, "agent_kill_failed");
  }
}

#[async_trait]
impl Agent for ClaudeCodeAgent {
  async fn run(
    &self,
    request: AgentRequest,
    cancel: CancellationToken,
  ) -> Result<AgentOutput, AgentError> {
    let mut child = self.spawn(&request)?;
    let group = ProcessGroup::of(&child);
    info!(
      command = %self.config.command,
      workspace = %request.workspace.display(),
      "agent_started"
    );

    let stdout = child
      .stdout
      .take()
      .ok_or_else(|| std::io::Error::other("agent stdout was not captured"))?;
    let mut stderr = child
      .stderr
      .take()
      .ok_or_else(|| std::io::Error::other("agent stderr was not captured"))?;

    let stderr_task = tokio::spawn(async move {
      let mut buf = String::new();
      let _ = stderr.read_to_string(&mut buf).await;
      buf
    });

    let deadline = self.config.timeout.map(|after| (Instant::now() + after, after));
    let expired = async {
      match deadline {
        Some((at, _)) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
      }
    };
    tokio::pin!(expired);

    let mut lines = BufReader::new(stdout).lines();
    let mut transcript = Transcript::default();

    loop {
      tokio::select! {
        line = lines.next_line() => match line? {
          Some(line) => {
            debug!(line = %line, "agent_output");
            transcript.push(line);
          }
          None => break,
        },
        _ = cancel.cancelled() => {
          terminate(&mut child, &group).await;
          warn!(responses = transcript.len(), "agent_cancelled");
          return Err(AgentError::Cancelled {
            responses: transcript.finish().responses,
          });
        }
        _ = &mut expired => {
          terminate(&mut child, &group).await;
          let after = deadline.map(|(_, after)| after).unwrap_or_default();
          warn!(responses = transcript.len(), timeout_secs = after.as_secs(), "agent_timed_out");
          return Err(AgentError::Timeout {
            after,
            responses: transcript.finish().responses,
          });
        }
      }
    }

    let status = child.wait().await?;
    // Leftover MCP servers would otherwise hold stderr open.
    group.kill();
    let stderr = stderr_task.await.unwrap_or_default();

    if !status.success() {
      warn!(code = ?status.code(), "agent_failed");
      return Err(AgentError::Exit {
        code: status.code(),
        stderr: stderr.trim().to_string(),
        responses: transcript.finish().responses,
      });
    }

    info!(responses = transcript.len(), "agent_completed");
    Ok(transcript.finish())
  }
}
