use serde::{Deserialize, Serialize};

use crate::port::PortDef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDef {
  pub id: String,
  #[serde(rename = "type")]
  pub node_type: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  /// Executor configuration. Older exports call this `properties`.
  #[serde(default, alias = "properties", skip_serializing_if = "Option::is_none")]
  pub data: Option<serde_json::Map<String, serde_json::Value>>,
  #[serde(default)]
  pub inputs: Vec<PortDef>,
  #[serde(default)]
  pub outputs: Vec<PortDef>,
  /// Canvas position, carried for round trips only.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub position: Option<Position>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
  pub x: f64,
  pub y: f64,
}
