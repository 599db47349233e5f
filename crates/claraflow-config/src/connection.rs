use serde::{Deserialize, Serialize};

/// A directed edge from one node's output port to another node's input port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDef {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  pub source_node_id: String,
  /// Absent means the source node's default output port.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_port_id: Option<String>,
  pub target_node_id: String,
  /// Absent means the target node's default input port.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub target_port_id: Option<String>,
}
