use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
  #[error("failed to start agent '{command}': {source}")]
  Spawn {
    command: String,
    #[source]
    source: std::io::Error,
  },

  #[error("agent exited with {}: {stderr}", exit_code(.code))]
  Exit {
    code: Option<i32>,
    stderr: String,
    responses: Vec<String>,
  },

  #[error("agent timed out after {}s", .after.as_secs())]
  Timeout {
    after: Duration,
    responses: Vec<String>,
  },

  #[error("agent run was cancelled")]
  Cancelled { responses: Vec<String> },

  #[error("agent io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("invalid agent configuration: {message}")]
  Config { message: String },
}

impl AgentError {
  /// Messages the agent emitted before it was stopped or failed.
  pub fn responses(&self) -> &[String] {
    match self {
      Self::Exit { responses, .. }
      | Self::Timeout { responses, .. }
      | Self::Cancelled { responses } => responses,
      _ => &[],
    }
  }
}

fn exit_code(code: &Option<i32>) -> String {
  match code {
    Some(code) => format!("status {}", code),
    None => "a signal".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exit_message() {
    let err = AgentError::Exit {
      code: Some(2),
      stderr: "invalid api key".to_string(),
      responses: Vec::new(),
    };
    assert_eq!(err.to_string(), "agent exited with status 2: invalid api key");

    let err = AgentError::Exit {
      code: None,
      stderr: String::new(),
      responses: Vec::new(),
    };
    assert_eq!(err.to_string(), "agent exited with a signal: ");
  }

  #[test]
  fn test_timeout_message() {
    let err = AgentError::Timeout {
      after: Duration::from_secs(90),
      responses: vec!["checking the palette".to_string()],
    };
    assert_eq!(err.to_string(), "agent timed out after 90s");
    assert_eq!(err.responses(), ["checking the palette"]);
  }

  #[test]
  fn test_responses_empty_without_a_run() {
    let err = AgentError::Config {
      message: "bad".to_string(),
    };
    assert!(err.responses().is_empty());
  }
}
