use serde::{Deserialize, Serialize};

use crate::data_type::DataType;

/// A port as written by the editor.
///
/// Exports are inconsistent about identifiers: some ports only carry an `id`,
/// some only a `name`. Normalization fills whichever is missing from the other.
/// The editor also writes the port direction under `type`; direction is implied
/// by which list the port sits in, so that field is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDef {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default)]
  pub data_type: DataType,
  #[serde(default)]
  pub required: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

impl PortDef {
  /// Identifier used by connections, falling back to the port name.
  pub fn key(&self) -> Option<&str> {
    self.id.as_deref().or(self.name.as_deref())
  }
}
