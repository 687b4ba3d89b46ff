use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use trawl_agent::{ClaudeCodeAgent, ClaudeCodeConfig, McpServer};
use trawl_artifact::{Store, StoreError};
use trawl_collector::Collector;
use trawl_config::{ActorConfig, ActorInput};
use trawl_runtime::{LlmsTxtRun, Platform, RunStatus, TaskRun, platform_for};

const INPUT_KEY: &str = "INPUT";

/// Trawl - run a browsing agent and keep everything it leaves behind
#[derive(Parser)]
#[command(name = "trawl")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run an actor input (a browsing task or an llms.txt generation)
  Run {
    /// Path to the input JSON. Defaults to stdin, then the INPUT record of
    /// the default key-value store.
    #[arg(long)]
    input: Option<PathBuf>,
  },

  /// List the artifacts a workspace would publish
  Collect {
    /// Workspace root
    root: PathBuf,

    /// Extra artifact directory, relative to the root
    #[arg(long)]
    artifact_dir: Vec<PathBuf>,
  },
}

fn main() -> Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Run { input }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { run(input).await })
    }
    Some(Commands::Collect { root, artifact_dir }) => collect(root, artifact_dir),
    None => {
      println!("trawl - use --help to see available commands");
      Ok(())
    }
  }
}

async fn run(input: Option<PathBuf>) -> Result<()> {
  let config = ActorConfig::from_env().context("invalid configuration")?;
  let platform = platform_for(&config.storage);

  let document = read_input(input, platform.as_ref(), &config).await?;
  let input = ActorInput::from_value(document).context("invalid actor input")?;

  let cancel = CancellationToken::new();
  let on_signal = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupt_received");
      on_signal.cancel();
    }
  });

  match input {
    ActorInput::Task(request) => {
      let agent = ClaudeCodeAgent::new(
        ClaudeCodeConfig::from_settings(&config.agent)
          .with_mcp_server(McpServer::playwright(&config.artifact_dir)),
      );
      let record = TaskRun::new(config, platform, Arc::new(agent))
        .run(&request, cancel)
        .await
        .context("task run failed")?;

      println!("{}", serde_json::to_string_pretty(&record)?);

      if record.status == RunStatus::Failed {
        bail!(
          "run failed: {}",
          record.error.as_deref().unwrap_or("no output was produced")
        );
      }
    }
    ActorInput::LlmsTxt(request) => {
      let agent = ClaudeCodeAgent::new(ClaudeCodeConfig::from_settings(&config.agent));
      let record = LlmsTxtRun::new(config, platform, Arc::new(agent))
        .run(request, cancel)
        .await
        .context("llms.txt generation failed")?;

      println!("{}", serde_json::to_string_pretty(&record)?);
    }
  }

  Ok(())
}

/// Resolve the input document: an explicit file, piped stdin, or the
/// platform's INPUT record.
async fn read_input(
  path: Option<PathBuf>,
  platform: &dyn Platform,
  config: &ActorConfig,
) -> Result<serde_json::Value> {
  if let Some(path) = path {
    let content = tokio::fs::read_to_string(&path)
      .await
      .with_context(|| format!("failed to read input file: {}", path.display()))?;
    return serde_json::from_str(&content)
      .with_context(|| format!("failed to parse input file: {}", path.display()));
  }

  if !io::stdin().is_terminal() {
    let mut content = String::new();
    io::stdin()
      .read_to_string(&mut content)
      .context("failed to read input from stdin")?;
    if !content.trim().is_empty() {
      return serde_json::from_str(&content).context("failed to parse input JSON from stdin");
    }
  }

  let store = platform.key_value_store(&config.storage.default_store_id)?;
  match store.get(INPUT_KEY).await {
    Ok(record) => {
      info!(store_id = %config.storage.default_store_id, "input_loaded");
      serde_json::from_slice(&record.data).context("failed to parse INPUT record")
    }
    Err(StoreError::NotFound(_)) => {
      bail!("no input given: pass --input, pipe JSON on stdin, or provide an INPUT record")
    }
    Err(e) => Err(e).context("failed to read INPUT record"),
  }
}

fn collect(root: PathBuf, artifact_dirs: Vec<PathBuf>) -> Result<()> {
  let collector = artifact_dirs
    .into_iter()
    .fold(Collector::new(&root), |collector, dir| collector.with_artifact_dir(dir));

  let artifacts: Vec<_> = collector
    .collect()
    .with_context(|| format!("failed to scan workspace: {}", root.display()))?
    .collect();

  eprintln!("Found {} artifacts", artifacts.len());
  println!("{}", serde_json::to_string_pretty(&artifacts)?);

  Ok(())
}
