use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use claraflow_config::CustomNodeDef;
use claraflow_engine::{ExecutionOptions, FlowEngine, FlowInputs};
use claraflow_host_log::LogLevel;

/// Claraflow - run flows exported by the Clara flow editor
#[derive(Parser)]
#[command(name = "claraflow")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.claraflow)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Execute a flow and print the run result as JSON
  Run {
    /// Path to the exported flow (JSON)
    flow_file: PathBuf,

    /// Flow inputs as a JSON object; read from stdin when piped
    #[arg(long)]
    inputs: Option<String>,

    /// Whole-run deadline in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Give custom nodes the full Lua standard library
    #[arg(long)]
    no_sandbox: bool,

    /// Lowest level recorded in the run log
    #[arg(long, default_value = "info")]
    log_level: LogLevel,

    /// Refuse to run a flow whose validation report has errors
    #[arg(long)]
    strict: bool,
  },

  /// Validate a flow without executing it
  Validate {
    /// Path to the exported flow (JSON)
    flow_file: PathBuf,
  },

  /// List the registered node types
  Nodes,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(io::stderr)
    .init();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".claraflow"),
  };

  match cli.command {
    Some(Commands::Run {
      flow_file,
      inputs,
      timeout_ms,
      no_sandbox,
      log_level,
      strict,
    }) => {
      let options = run_options(timeout_ms, no_sandbox, log_level, strict);
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_flow(flow_file, inputs, options, data_dir))?;
    }
    Some(Commands::Validate { flow_file }) => {
      validate_flow(flow_file, data_dir)?;
    }
    Some(Commands::Nodes) => {
      let engine = engine_with_custom_nodes(&data_dir)?;
      for node_type in engine.node_types() {
        println!("{node_type}");
      }
    }
    None => {
      println!("claraflow - use --help to see available commands");
    }
  }

  Ok(())
}

async fn run_flow(
  flow_file: PathBuf,
  inputs: Option<String>,
  options: ExecutionOptions,
  data_dir: PathBuf,
) -> Result<()> {
  let document = read_flow(&flow_file)?;
  let inputs = match inputs {
    Some(text) => parse_inputs(&text).context("failed to parse --inputs")?,
    None => read_inputs_from_stdin()?,
  };

  let engine = engine_with_custom_nodes(&data_dir)?;

  let cancel = CancellationToken::new();
  let ctrl_c = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      ctrl_c.cancel();
    }
  });

  let result = match engine
    .execute_flow_with_cancel(&document, inputs, options, cancel)
    .await
  {
    Ok(result) => result,
    Err(err) => {
      if let Some(partial) = err.partial() {
        println!("{}", serde_json::to_string_pretty(partial)?);
      }
      return Err(err).with_context(|| format!("failed to run {}", flow_file.display()));
    }
  };

  println!("{}", serde_json::to_string_pretty(&result)?);

  let failed = result.failed_nodes().count();
  if failed > 0 {
    bail!("{failed} node(s) failed");
  }
  Ok(())
}

fn validate_flow(flow_file: PathBuf, data_dir: PathBuf) -> Result<()> {
  let document = read_flow(&flow_file)?;
  let engine = engine_with_custom_nodes(&data_dir)?;

  let report = engine
    .validate_flow(&document)
    .with_context(|| format!("failed to load {}", flow_file.display()))?;

  println!("{}", serde_json::to_string_pretty(&report)?);

  if !report.is_valid {
    bail!("flow has {} validation error(s)", report.errors.len());
  }
  Ok(())
}

fn run_options(
  timeout_ms: Option<u64>,
  no_sandbox: bool,
  log_level: LogLevel,
  strict: bool,
) -> ExecutionOptions {
  let options = ExecutionOptions::default()
    .with_sandbox(!no_sandbox)
    .with_log_level(log_level)
    .with_strict_validation(strict);
  match timeout_ms {
    Some(ms) => options.with_timeout(Duration::from_millis(ms)),
    None => options,
  }
}

fn read_flow(path: &Path) -> Result<serde_json::Value> {
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read flow file: {}", path.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse flow file: {}", path.display()))
}

fn engine_with_custom_nodes(data_dir: &Path) -> Result<FlowEngine> {
  let engine = FlowEngine::new();
  for definition in load_custom_nodes(&data_dir.join("nodes"))? {
    engine.register_custom_node(definition);
  }
  Ok(engine)
}

/// Custom node definitions stored as `*.json` files, sorted by file name.
/// A missing directory holds no definitions.
fn load_custom_nodes(dir: &Path) -> Result<Vec<CustomNodeDef>> {
  if !dir.is_dir() {
    return Ok(Vec::new());
  }

  let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
    .with_context(|| format!("failed to read node directory: {}", dir.display()))?
    .filter_map(|entry| entry.ok().map(|e| e.path()))
    .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
    .collect();
  paths.sort();

  paths
    .iter()
    .map(|path| {
      let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read custom node: {}", path.display()))?;
      serde_json::from_str(&content)
        .with_context(|| format!("failed to parse custom node: {}", path.display()))
    })
    .collect()
}

fn parse_inputs(text: &str) -> Result<FlowInputs> {
  if text.trim().is_empty() {
    return Ok(FlowInputs::new());
  }
  match serde_json::from_str(text)? {
    serde_json::Value::Object(map) => Ok(map),
    other => bail!("flow inputs must be a JSON object, got {other}"),
  }
}

fn read_inputs_from_stdin() -> Result<FlowInputs> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(FlowInputs::new());
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read inputs from stdin")?;
  parse_inputs(&input).context("failed to parse inputs JSON from stdin")
}
