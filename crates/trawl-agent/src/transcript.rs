//! Parsing of the agent's `stream-json` output.
//!
//! Each stdout line is one message. The final answer is carried by the last
//! message of `"type": "result"`:
//!
//! ```text
//! {"type":"system","subtype":"init",...}
//! {"type":"assistant","message":{...}}
//! {"type":"result","subtype":"success","result":"Saved palette.json"}
//! ```

use serde::Deserialize;

use crate::AgentOutput;

#[derive(Deserialize)]
struct ResultMessage {
  #[serde(rename = "type")]
  kind: String,
  #[serde(default)]
  result: Option<String>,
}

/// Accumulates agent output line by line.
#[derive(Debug, Default)]
pub struct Transcript {
  responses: Vec<String>,
  result: Option<String>,
}

impl Transcript {
  pub fn push(&mut self, line: impl Into<String>) {
    let line = line.into();
    let trimmed = line.trim();
    if trimmed.is_empty() {
      return;
    }

    if let Ok(message) = serde_json::from_str::<ResultMessage>(trimmed)
      && message.kind == "result"
      && let Some(result) = message.result
    {
      self.result = Some(result);
    }

    self.responses.push(trimmed.to_string());
  }

  pub fn len(&self) -> usize {
    self.responses.len()
  }

  pub fn is_empty(&self) -> bool {
    self.responses.is_empty()
  }

  /// The result message if there was one, otherwise the last line.
  pub fn finish(self) -> AgentOutput {
    let final_response = self.result.or_else(|| self.responses.last().cloned());
    AgentOutput {
      responses: self.responses,
      final_response,
    }
  }
}
