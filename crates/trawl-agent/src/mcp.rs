//! MCP server registration passed to the agent CLI.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

/// A stdio MCP server the agent may call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McpServer {
  #[serde(skip)]
  pub name: String,
  pub command: String,
  pub args: Vec<String>,
}

impl McpServer {
  pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      command: command.into(),
      args: Vec::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  /// Headless Chromium via the Playwright MCP server. Traces and
  /// screenshots are written to `output_dir`.
  pub fn playwright(output_dir: &Path) -> Self {
    Self::new("playwright", "npx")
      .arg("@playwright/mcp@latest")
      .arg("--browser")
      .arg("chromium")
      .arg("--headless")
      .arg("--no-sandbox")
      .arg("--output-dir")
      .arg(output_dir.to_string_lossy())
  }
}

/// The `--mcp-config` document.
#[derive(Debug, Serialize)]
pub struct McpConfig<'a> {
  #[serde(rename = "mcpServers")]
  servers: BTreeMap<&'a str, &'a McpServer>,
}

impl<'a> McpConfig<'a> {
  pub fn new(servers: &'a [McpServer]) -> Self {
    Self {
      servers: servers.iter().map(|s| (s.name.as_str(), s)).collect(),
    }
  }

  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_playwright_config() {
    let servers = [McpServer::playwright(Path::new("/work/.playwright-mcp"))];
    let value: serde_json::Value =
      serde_json::from_str(&McpConfig::new(&servers).to_json().unwrap()).unwrap();

    assert_eq!(
      value,
      serde_json::json!({
        "mcpServers": {
          "playwright": {
            "command": "npx",
            "args": [
              "@playwright/mcp@latest",
              "--browser", "chromium",
              "--headless",
              "--no-sandbox",
              "--output-dir", "/work/.playwright-mcp"
            ]
          }
        }
      })
    );
  }
}
