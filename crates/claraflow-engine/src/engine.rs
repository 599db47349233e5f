//! Flow execution engine.
//!
//! The [`FlowEngine`] accepts flow documents in any supported export shape,
//! owns the node registry and the engine-wide log, and runs flows through the
//! [`Orchestrator`].

use std::sync::Arc;
use std::time::Duration;

use claraflow_config::{CustomNodeDef, FormatError};
use claraflow_host_log::{ExecutionLog, LogEntry};
use claraflow_node_runtime::{NodeExecutor, NodeRegistry};
use claraflow_node_runtime_lua::{LuaNodeCompiler, LuaRuntimeConfig};
use claraflow_orchestrator::{
  ExecutionOptions, FlowInputs, Orchestrator, OrchestratorConfig, RunError, RunResult,
};
use claraflow_workflow::{Flow, ValidationReport};
use futures::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::EngineError;

/// Configuration for the flow engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Run deadline when the options carry none.
  pub default_timeout: Duration,
  /// Upper bound on runs in flight for batch execution.
  pub max_concurrency: usize,
  /// Limits applied to every custom node invocation.
  pub lua: LuaRuntimeConfig,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      default_timeout: Duration::from_secs(30),
      max_concurrency: 4,
      lua: LuaRuntimeConfig::default(),
    }
  }
}

/// The flow execution engine.
///
/// Each engine owns its registry; nothing is shared between engines. Runs
/// never share state, so one engine can serve any number of concurrent runs.
pub struct FlowEngine {
  orchestrator: Orchestrator,
  config: EngineConfig,
}

impl Default for FlowEngine {
  fn default() -> Self {
    Self::new()
  }
}

impl FlowEngine {
  /// Engine with the built-in nodes and a Lua compiler for custom nodes.
  pub fn new() -> Self {
    Self::with_config(EngineConfig::default())
  }

  pub fn with_config(config: EngineConfig) -> Self {
    let compiler = Arc::new(LuaNodeCompiler::new(config.lua.clone()));
    Self::with_registry(Arc::new(NodeRegistry::new(compiler)), config)
  }

  /// Engine over a caller-provided registry.
  pub fn with_registry(registry: Arc<NodeRegistry>, config: EngineConfig) -> Self {
    let orchestrator = Orchestrator::new(
      registry,
      ExecutionLog::new(),
      OrchestratorConfig {
        default_timeout: config.default_timeout,
        ..OrchestratorConfig::default()
      },
    );
    Self {
      orchestrator,
      config,
    }
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub fn registry(&self) -> &Arc<NodeRegistry> {
    self.orchestrator.registry()
  }

  /// Register a custom node type. Its code is compiled on first use.
  pub fn register_custom_node(&self, definition: CustomNodeDef) {
    self.registry().register(definition);
  }

  pub fn register_executor(&self, node_type: impl Into<String>, executor: Arc<dyn NodeExecutor>) {
    self.registry().register_executor(node_type, executor);
  }

  /// Registered node types, sorted.
  pub fn node_types(&self) -> Vec<String> {
    self.registry().node_types()
  }

  /// Normalize and validate a flow document without executing it.
  pub fn validate_flow(&self, document: &Value) -> Result<ValidationReport, FormatError> {
    let flow = Flow::from_value(document)?;
    Ok(self.validate(&flow))
  }

  pub fn validate(&self, flow: &Flow) -> ValidationReport {
    self.orchestrator.validate(flow)
  }

  /// Normalize and execute a flow document.
  pub async fn execute_flow(
    &self,
    document: &Value,
    inputs: FlowInputs,
    options: ExecutionOptions,
  ) -> Result<RunResult, EngineError> {
    self
      .execute_flow_with_cancel(document, inputs, options, CancellationToken::new())
      .await
  }

  pub async fn execute_flow_with_cancel(
    &self,
    document: &Value,
    inputs: FlowInputs,
    options: ExecutionOptions,
    cancel: CancellationToken,
  ) -> Result<RunResult, EngineError> {
    let flow = Flow::from_value(document)?;
    Ok(self.execute(&flow, &inputs, &options, cancel).await?)
  }

  /// Execute an already normalized flow.
  pub async fn execute(
    &self,
    flow: &Flow,
    inputs: &FlowInputs,
    options: &ExecutionOptions,
    cancel: CancellationToken,
  ) -> Result<RunResult, RunError> {
    self.orchestrator.execute(flow, inputs, options, cancel).await
  }

  /// Run one flow once per input set, at most `max_concurrency` at a time.
  ///
  /// The document is normalized once; results come back in input order.
  pub async fn execute_batch(
    &self,
    document: &Value,
    input_sets: Vec<FlowInputs>,
    options: ExecutionOptions,
  ) -> Result<Vec<Result<RunResult, EngineError>>, FormatError> {
    let flow = Flow::from_value(document)?;
    info!(flow_id = %flow.id, runs = input_sets.len(), "batch_started");

    let flow = &flow;
    let options = &options;
    let results: Vec<_> = futures::stream::iter(input_sets)
      .map(|inputs| async move {
        self
          .execute(flow, &inputs, options, CancellationToken::new())
          .await
          .map_err(EngineError::from)
      })
      .buffered(self.config.max_concurrency.max(1))
      .collect()
      .await;

    debug!(
      flow_id = %flow.id,
      failed = results.iter().filter(|r| r.is_err()).count(),
      "batch_completed"
    );
    Ok(results)
  }

  /// Run independent flows, each with its own inputs.
  pub async fn execute_flows(
    &self,
    runs: Vec<(Value, FlowInputs)>,
    options: ExecutionOptions,
  ) -> Vec<Result<RunResult, EngineError>> {
    info!(runs = runs.len(), "batch_started");
    let options = &options;
    futures::stream::iter(runs)
      .map(|(document, inputs)| async move {
        self
          .execute_flow_with_cancel(&document, inputs, options.clone(), CancellationToken::new())
          .await
      })
      .buffered(self.config.max_concurrency.max(1))
      .collect()
      .await
  }

  /// Every entry recorded by this engine, oldest first.
  pub fn logs(&self) -> Vec<LogEntry> {
    self.orchestrator.log().entries()
  }

  pub fn clear_logs(&self) {
    self.orchestrator.log().clear();
  }
}
