use serde::{Deserialize, Serialize};

use crate::connection::ConnectionDef;
use crate::custom_node::CustomNodeDef;
use crate::node::NodeDef;

/// A flow as exported by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDef {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub nodes: Vec<NodeDef>,
  #[serde(default)]
  pub connections: Vec<ConnectionDef>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub custom_nodes: Vec<CustomNodeDef>,
}
