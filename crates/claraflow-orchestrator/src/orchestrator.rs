//! Flow scheduler.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use claraflow_config::DEFAULT_OUTPUT_PORT;
use claraflow_host_log::{ExecutionLog, LogLevel, RunLog};
use claraflow_node_runtime::{NodeContext, NodeError, NodeRegistry, PortValues};
use claraflow_workflow::{Flow, Node, ValidationReport, validate};
use serde_json::{Value, json};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::FlowInputs;
use crate::binding::bind_inputs;
use crate::error::RunError;
use crate::options::ExecutionOptions;
use crate::order::execution_order;
use crate::result::{NodeOutcome, NodeStatus, RunResult};

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
  /// Run deadline when the options carry none.
  pub default_timeout: Duration,
  /// Port read from a producer's output when a connection names none.
  pub default_output_port: String,
}

impl Default for OrchestratorConfig {
  fn default() -> Self {
    Self {
      default_timeout: Duration::from_secs(30),
      default_output_port: DEFAULT_OUTPUT_PORT.to_string(),
    }
  }
}

/// Runs flows against a node registry.
///
/// Holds no per-run state; any number of runs may share one orchestrator.
pub struct Orchestrator {
  registry: Arc<NodeRegistry>,
  log: ExecutionLog,
  config: OrchestratorConfig,
}

impl Orchestrator {
  pub fn new(registry: Arc<NodeRegistry>, log: ExecutionLog, config: OrchestratorConfig) -> Self {
    Self {
      registry,
      log,
      config,
    }
  }

  pub fn registry(&self) -> &Arc<NodeRegistry> {
    &self.registry
  }

  pub fn log(&self) -> &ExecutionLog {
    &self.log
  }

  pub fn config(&self) -> &OrchestratorConfig {
    &self.config
  }

  /// Validate a flow against the registered node types.
  pub fn validate(&self, flow: &Flow) -> ValidationReport {
    validate(flow, &|node_type: &str| self.registry.has(node_type))
  }

  /// Execute a flow.
  ///
  /// Node failures are recorded in the result and do not end the run.
  /// Errors are returned for compilation failures, cycles, strict validation
  /// failures, the run deadline and cancellation; the last two carry what
  /// the run produced up to that point.
  #[instrument(
    name = "flow_execute",
    skip_all,
    fields(flow_id = %flow.id)
  )]
  pub async fn execute(
    &self,
    flow: &Flow,
    inputs: &FlowInputs,
    options: &ExecutionOptions,
    cancel: CancellationToken,
  ) -> Result<RunResult, RunError> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let limit = options.timeout().unwrap_or(self.config.default_timeout);
    let timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
    let mut state = RunState::new(&run_id, flow);
    let deadline = state.started + limit;

    if options.strict_validation {
      let report = self.validate(flow);
      if !report.is_valid {
        warn!(run_id = %run_id, errors = report.errors.len(), "flow_rejected");
        return Err(RunError::Validation {
          report: Box::new(report),
        });
      }
    }

    let graph = flow.graph();
    let order = execution_order(&graph)?;
    state.order = order.clone();

    let run_log = RunLog::new(self.log.clone(), &run_id, &flow.id, options.log_settings());
    info!(
      run_id = %run_id,
      flow_name = %flow.name,
      node_count = order.len(),
      timeout_ms,
      "flow_started"
    );
    run_log.info(format!("starting flow '{}'", flow.name));

    let bound = bind_inputs(flow, inputs);
    for key in &bound.unmatched {
      run_log.warn(format!("input '{key}' does not match any input node"));
    }

    let registry = self.registry.overlay(&flow.custom_nodes);

    for (index, node_id) in order.iter().enumerate() {
      if cancel.is_cancelled() {
        return Err(self.cancelled(state, &order[index..], &run_log));
      }
      if Instant::now() >= deadline {
        return Err(self.timed_out(state, &order[index..], &run_log, timeout_ms));
      }

      let Some(node) = flow.node(node_id) else {
        continue;
      };
      let logger = run_log.node(node_id);

      if let Some(cause) = state.blocked_by(graph.upstream(node_id)) {
        logger.warn(format!("skipped: upstream node '{cause}' did not complete"));
        state.record(node, NodeStatus::Skipped { cause }, None);
        continue;
      }

      let executor = match registry.resolve(&node.node_type) {
        Ok(Some(executor)) => executor,
        Ok(None) => {
          let err = NodeError::MissingExecutor {
            node_type: node.node_type.clone(),
          };
          logger.error(err.to_string());
          state.fail(node, &err, None);
          continue;
        }
        Err(err) => {
          error!(run_id = %run_id, node_id = %node_id, error = %err, "flow_failed");
          run_log.error(err.to_string());
          return Err(RunError::Compilation(err));
        }
      };

      let node_inputs = state.gather_inputs(node_id, &self.config.default_output_port);
      let mut properties = node.data.clone();
      if let Some(value) = bound.values.get(node_id) {
        properties.insert("value".to_string(), value.clone());
      }

      logger.debug(format!("executing '{}' ({})", node.name, node.node_type));
      let ctx = NodeContext::new(logger.clone(), cancel.child_token(), options.sandbox);
      let node_started = Instant::now();

      // A cancelled run lets the in-flight call finish; the node sees the
      // signal through its context and the next step aborts.
      let outcome = tokio::select! {
        biased;
        _ = tokio::time::sleep_until(deadline) => {
          return Err(self.timed_out(state, &order[index..], &run_log, timeout_ms));
        }
        outcome = executor.execute(node_inputs, properties, ctx) => outcome,
      };
      let duration_ms = elapsed_ms(node_started);

      match outcome {
        Ok(output) => {
          logger.log_with_data(
            LogLevel::Info,
            format!("completed '{}'", node.name),
            json!({ "durationMs": duration_ms }),
          );
          state.complete(node, output, duration_ms);
        }
        Err(err) => {
          logger.error(format!("failed '{}': {err}", node.name));
          state.fail(node, &err, Some(duration_ms));
        }
      }
    }

    let result = state.finish(&run_log, false);
    info!(
      run_id = %result.run_id,
      success = result.success,
      execution_time_ms = result.execution_time_ms,
      "flow_completed"
    );
    Ok(result)
  }

  fn cancelled(&self, mut state: RunState<'_>, remaining: &[String], run_log: &RunLog) -> RunError {
    warn!(run_id = %state.run_id, "flow_cancelled");
    run_log.warn("flow execution cancelled");
    state.interrupt(remaining, NodeStatus::Cancelled);
    RunError::Cancelled {
      partial: Box::new(state.finish(run_log, true)),
    }
  }

  fn timed_out(
    &self,
    mut state: RunState<'_>,
    remaining: &[String],
    run_log: &RunLog,
    timeout_ms: u64,
  ) -> RunError {
    warn!(run_id = %state.run_id, timeout_ms, "flow_timed_out");
    run_log.error(format!("flow execution timed out after {timeout_ms}ms"));
    state.interrupt(remaining, NodeStatus::TimedOut);
    RunError::Timeout {
      timeout_ms,
      partial: Box::new(state.finish(run_log, true)),
    }
  }
}

/// Bookkeeping for one run.
struct RunState<'f> {
  run_id: String,
  flow: &'f Flow,
  started: Instant,
  order: Vec<String>,
  /// node id -> output of completed nodes
  outputs: HashMap<String, Value>,
  /// Failed or skipped nodes. Their consumers are skipped.
  blocked: HashSet<String>,
  outcomes: Vec<NodeOutcome>,
}

impl<'f> RunState<'f> {
  fn new(run_id: &str, flow: &'f Flow) -> Self {
    Self {
      run_id: run_id.to_string(),
      flow,
      started: Instant::now(),
      order: Vec::new(),
      outputs: HashMap::new(),
      blocked: HashSet::new(),
      outcomes: Vec::with_capacity(flow.nodes.len()),
    }
  }

  /// First producer that failed or was skipped.
  fn blocked_by(&self, upstream: &[String]) -> Option<String> {
    upstream.iter().find(|id| self.blocked.contains(*id)).cloned()
  }

  /// Values for each input port of `node_id`, taken from its producers.
  ///
  /// An object output is read at the connection's source port (or the
  /// default port, falling back to the whole object); anything else is
  /// passed whole.
  fn gather_inputs(&self, node_id: &str, default_port: &str) -> PortValues {
    let mut inputs = PortValues::new();
    for conn in self.flow.incoming(node_id) {
      let Some(output) = self.outputs.get(&conn.source_node_id) else {
        continue;
      };
      let value = match (output, conn.source_port_id.as_deref()) {
        (Value::Object(ports), Some(port)) => ports.get(port).cloned().unwrap_or(Value::Null),
        (Value::Object(ports), None) => ports
          .get(default_port)
          .cloned()
          .unwrap_or_else(|| output.clone()),
        (other, _) => other.clone(),
      };
      inputs.insert(conn.target_port_id.clone(), value);
    }
    inputs
  }

  fn record(&mut self, node: &Node, status: NodeStatus, duration_ms: Option<u64>) {
    if matches!(status, NodeStatus::Failed { .. } | NodeStatus::Skipped { .. }) {
      self.blocked.insert(node.id.clone());
    }
    self.outcomes.push(NodeOutcome {
      node_id: node.id.clone(),
      node_name: node.name.clone(),
      node_type: node.node_type.clone(),
      status,
      duration_ms,
    });
  }

  fn complete(&mut self, node: &Node, output: Value, duration_ms: u64) {
    self.outputs.insert(node.id.clone(), output);
    self.record(node, NodeStatus::Completed, Some(duration_ms));
  }

  fn fail(&mut self, node: &Node, err: &NodeError, duration_ms: Option<u64>) {
    let status = NodeStatus::Failed {
      kind: err.kind().to_string(),
      error: err.to_string(),
    };
    self.record(node, status, duration_ms);
  }

  /// Mark every node that has not run yet.
  fn interrupt(&mut self, remaining: &[String], status: NodeStatus) {
    let flow = self.flow;
    for node in remaining.iter().filter_map(|id| flow.node(id)) {
      self.record(node, status.clone(), None);
    }
  }

  fn finish(self, run_log: &RunLog, interrupted: bool) -> RunResult {
    let mut results = serde_json::Map::new();
    let completed: Vec<&NodeOutcome> = self
      .outcomes
      .iter()
      .filter(|o| o.status == NodeStatus::Completed)
      .collect();
    for outcome in &completed {
      if let Some(output) = self.outputs.get(&outcome.node_id) {
        results.insert(outcome.node_name.clone(), output.clone());
      }
    }
    for outcome in &completed {
      if let Some(output) = self.outputs.get(&outcome.node_id) {
        results.insert(outcome.node_id.clone(), output.clone());
      }
    }

    let failed = self
      .outcomes
      .iter()
      .any(|o| matches!(o.status, NodeStatus::Failed { .. }));

    RunResult {
      run_id: self.run_id,
      flow_id: self.flow.id.clone(),
      flow_name: self.flow.name.clone(),
      success: !failed && !interrupted,
      results,
      nodes: self.outcomes,
      execution_order: self.order,
      execution_time_ms: elapsed_ms(self.started),
      logs: run_log.entries(),
    }
  }
}

fn elapsed_ms(since: Instant) -> u64 {
  u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
