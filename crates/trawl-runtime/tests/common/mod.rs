#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use trawl_agent::{Agent, AgentError, AgentOutput, AgentRequest};
use trawl_config::{ActorConfig, Secret, StorageBackend};

/// An agent that writes a fixed set of files into its workspace.
#[derive(Default)]
pub struct ScriptedAgent {
  files: Vec<(String, String)>,
  output: Vec<String>,
  failure: Option<String>,
  until_cancelled: bool,
  locked: Vec<String>,
  requests: Mutex<Vec<AgentRequest>>,
}

impl ScriptedAgent {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn writes(mut self, path: &str, content: &str) -> Self {
    self.files.push((path.to_string(), content.to_string()));
    self
  }

  pub fn says(mut self, line: &str) -> Self {
    self.output.push(line.to_string());
    self
  }

  /// Exit with an error after writing the files.
  pub fn fails_with(mut self, stderr: &str) -> Self {
    self.failure = Some(stderr.to_string());
    self
  }

  /// Keep running after writing the files until the run is cancelled.
  pub fn until_cancelled(mut self) -> Self {
    self.until_cancelled = true;
    self
  }

  /// Make a workspace directory unreadable after writing the files.
  pub fn locks(mut self, dir: &str) -> Self {
    self.locked.push(dir.to_string());
    self
  }

  pub fn requests(&self) -> Vec<AgentRequest> {
    self.requests.lock().unwrap().clone()
  }
}

#[async_trait]
impl Agent for ScriptedAgent {
  async fn run(
    &self,
    request: AgentRequest,
    cancel: CancellationToken,
  ) -> Result<AgentOutput, AgentError> {
    for (path, content) in &self.files {
      let target = request.workspace.join(path);
      if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
      }
      std::fs::write(target, content)?;
    }
    for dir in &self.locked {
      set_mode(&request.workspace.join(dir), 0o000);
    }
    self.requests.lock().unwrap().push(request);

    if self.until_cancelled {
      cancel.cancelled().await;
      return Err(AgentError::Cancelled {
        responses: self.output.clone(),
      });
    }

    if let Some(stderr) = &self.failure {
      return Err(AgentError::Exit {
        code: Some(1),
        stderr: stderr.clone(),
        responses: self.output.clone(),
      });
    }

    Ok(AgentOutput {
      responses: self.output.clone(),
      final_response: self.output.last().cloned(),
    })
  }
}

#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) {
  use std::os::unix::fs::PermissionsExt;
  std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).unwrap();
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) {}

/// Whether directory permissions are enforced for this process. They are not
/// when running as root.
pub fn permissions_enforced(scratch: &Path) -> bool {
  let dir = scratch.join("permission-check");
  std::fs::create_dir_all(&dir).unwrap();
  set_mode(&dir, 0o000);
  let enforced = std::fs::read_dir(&dir).is_err();
  set_mode(&dir, 0o755);
  enforced
}

/// Configuration for a run rooted at `dir/workspace`.
pub fn config(dir: &Path, key: Option<&str>) -> ActorConfig {
  let output_root = dir.join("workspace");
  let mut config = ActorConfig {
    anthropic_api_key: key.map(Secret::new),
    artifact_dir: output_root.join(".playwright-mcp"),
    output_root,
    run_id: "run-1".to_string(),
    ..ActorConfig::default()
  };
  config.storage.backend = StorageBackend::Local {
    dir: dir.join("storage"),
  };
  config
}
