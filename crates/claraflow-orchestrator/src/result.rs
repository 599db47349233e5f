//! Execution result types.

use claraflow_host_log::LogEntry;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a node ended up in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeStatus {
  Completed,
  Failed { kind: String, error: String },
  /// Not executed because the producer `cause` failed or was skipped.
  Skipped { cause: String },
  Cancelled,
  TimedOut,
}

/// Per-node entry of a [`RunResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOutcome {
  pub node_id: String,
  pub node_name: String,
  pub node_type: String,
  #[serde(flatten)]
  pub status: NodeStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<u64>,
}

/// Result of a complete flow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
  pub run_id: String,
  pub flow_id: String,
  pub flow_name: String,
  /// True when no node failed.
  pub success: bool,
  /// Outputs of completed nodes, keyed by node id and by node name. An id
  /// wins over a name that happens to be equal to it.
  pub results: serde_json::Map<String, Value>,
  /// One entry per node, in execution order.
  pub nodes: Vec<NodeOutcome>,
  pub execution_order: Vec<String>,
  pub execution_time_ms: u64,
  /// Entries logged by this run only.
  pub logs: Vec<LogEntry>,
}

impl RunResult {
  /// Output of a node, by id or name.
  pub fn output(&self, key: &str) -> Option<&Value> {
    self.results.get(key)
  }

  pub fn node(&self, node_id: &str) -> Option<&NodeOutcome> {
    self.nodes.iter().find(|n| n.node_id == node_id)
  }

  pub fn status(&self, node_id: &str) -> Option<&NodeStatus> {
    self.node(node_id).map(|n| &n.status)
  }

  pub fn failed_nodes(&self) -> impl Iterator<Item = &NodeOutcome> {
    self
      .nodes
      .iter()
      .filter(|n| matches!(n.status, NodeStatus::Failed { .. }))
  }
}
