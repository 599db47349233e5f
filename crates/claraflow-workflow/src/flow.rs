use claraflow_config::{CustomNodeDef, DataType, FlowDocument, FormatError};
use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::normalize::normalize;

/// A normalized flow, ready to validate or execute.
///
/// Nodes and connections keep their declaration order; execution ordering
/// depends on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
  pub id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub nodes: Vec<Node>,
  pub connections: Vec<Connection>,
  /// Definitions shipped with the flow. They shadow registered types for
  /// runs of this flow only.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub custom_nodes: Vec<CustomNodeDef>,
}

impl Flow {
  /// Normalize any accepted document shape.
  pub fn from_value(value: &serde_json::Value) -> Result<Self, FormatError> {
    normalize(FlowDocument::from_value(value)?)
  }

  pub fn from_json_str(text: &str) -> Result<Self, FormatError> {
    normalize(FlowDocument::from_json_str(text)?)
  }

  /// Look up a node by id. With duplicate ids the first declaration wins.
  pub fn node(&self, node_id: &str) -> Option<&Node> {
    self.nodes.iter().find(|n| n.id == node_id)
  }

  pub fn custom_node(&self, node_type: &str) -> Option<&CustomNodeDef> {
    self.custom_nodes.iter().find(|d| d.node_type == node_type)
  }

  /// Connections feeding the given node, in declaration order.
  pub fn incoming<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
    self
      .connections
      .iter()
      .filter(move |c| c.target_node_id == node_id)
  }

  pub fn graph(&self) -> Graph {
    Graph::new(&self.nodes, &self.connections)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
  pub id: String,
  #[serde(rename = "type")]
  pub node_type: String,
  pub name: String,
  #[serde(default)]
  pub data: serde_json::Map<String, serde_json::Value>,
  #[serde(default)]
  pub inputs: Vec<Port>,
  #[serde(default)]
  pub outputs: Vec<Port>,
}

impl Node {
  pub fn input(&self, port_id: &str) -> Option<&Port> {
    self.inputs.iter().find(|p| p.id == port_id)
  }

  pub fn output(&self, port_id: &str) -> Option<&Port> {
    self.outputs.iter().find(|p| p.id == port_id)
  }

  /// A node that declares no inputs accepts any input port id.
  pub fn accepts_input(&self, port_id: &str) -> bool {
    self.inputs.is_empty() || self.input(port_id).is_some()
  }

  /// A node that declares no outputs may produce any output port id.
  pub fn provides_output(&self, port_id: &str) -> bool {
    self.outputs.is_empty() || self.output(port_id).is_some()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub data_type: DataType,
  #[serde(default)]
  pub required: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  pub source_node_id: String,
  /// `None` selects the source node's default output port.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_port_id: Option<String>,
  pub target_node_id: String,
  pub target_port_id: String,
}

impl Connection {
  /// Human readable label for diagnostics.
  pub fn label(&self) -> String {
    match &self.id {
      Some(id) => format!("'{id}'"),
      None => format!("{} -> {}", self.source_node_id, self.target_node_id),
    }
  }
}
