use serde::{Deserialize, Serialize};

use crate::port::PortDef;

/// A node type whose logic ships as source text.
///
/// ```json
/// {
///   "type": "multiply",
///   "name": "Multiply",
///   "inputs": [{ "id": "a", "dataType": "number" }, { "id": "b", "dataType": "number" }],
///   "outputs": [{ "id": "result", "dataType": "number" }],
///   "properties": [{ "id": "factor", "type": "number", "defaultValue": 1 }],
///   "executionCode": "function execute(inputs, properties, context) return { result = inputs.a * inputs.b * properties.factor } end"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomNodeDef {
  #[serde(rename = "type")]
  pub node_type: String,
  #[serde(default)]
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(default)]
  pub inputs: Vec<PortDef>,
  #[serde(default)]
  pub outputs: Vec<PortDef>,
  #[serde(default)]
  pub properties: Vec<PropertyDef>,
  #[serde(default)]
  pub execution_code: String,
}

impl CustomNodeDef {
  /// Property defaults keyed by property id.
  pub fn property_defaults(&self) -> serde_json::Map<String, serde_json::Value> {
    self
      .properties
      .iter()
      .filter_map(|p| {
        let key = p.key()?;
        let value = p.default_value.clone()?;
        Some((key.to_string(), value))
      })
      .collect()
  }

  /// Display name, falling back to the type.
  pub fn display_name(&self) -> &str {
    if self.name.is_empty() {
      &self.node_type
    } else {
      &self.name
    }
  }
}

/// A configurable property declared by a custom node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDef {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
  pub property_type: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default_value: Option<serde_json::Value>,
  #[serde(default)]
  pub required: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

impl PropertyDef {
  pub fn key(&self) -> Option<&str> {
    self.id.as_deref().or(self.name.as_deref())
  }
}
