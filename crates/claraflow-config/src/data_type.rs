use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic type of a port.
///
/// Types other than [`DataType::Any`] are advisory: they drive validation
/// warnings but are never enforced while a flow runs. Unknown type names are
/// kept verbatim in [`DataType::Custom`] so that a round trip through the
/// engine does not lose editor-specific types such as `"image"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
  String,
  Number,
  Boolean,
  Object,
  Array,
  #[default]
  Any,
  Custom(String),
}

impl DataType {
  pub fn is_any(&self) -> bool {
    matches!(self, DataType::Any)
  }

  /// Whether a value produced as `self` may flow into a port typed `other`.
  pub fn is_compatible_with(&self, other: &DataType) -> bool {
    self.is_any() || other.is_any() || self == other
  }
}

impl From<String> for DataType {
  fn from(value: String) -> Self {
    match value.to_ascii_lowercase().as_str() {
      "string" | "text" => DataType::String,
      "number" | "integer" | "float" => DataType::Number,
      "boolean" | "bool" => DataType::Boolean,
      "object" => DataType::Object,
      "array" => DataType::Array,
      "any" | "" => DataType::Any,
      _ => DataType::Custom(value),
    }
  }
}

impl From<DataType> for String {
  fn from(value: DataType) -> Self {
    value.to_string()
  }
}

impl fmt::Display for DataType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DataType::String => f.write_str("string"),
      DataType::Number => f.write_str("number"),
      DataType::Boolean => f.write_str("boolean"),
      DataType::Object => f.write_str("object"),
      DataType::Array => f.write_str("array"),
      DataType::Any => f.write_str("any"),
      DataType::Custom(name) => f.write_str(name),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_known_types() {
    assert_eq!(DataType::from("String".to_string()), DataType::String);
    assert_eq!(DataType::from("integer".to_string()), DataType::Number);
    assert_eq!(DataType::from("any".to_string()), DataType::Any);
  }

  #[test]
  fn test_custom_type_round_trips() {
    let parsed: DataType = serde_json::from_str("\"image\"").unwrap();
    assert_eq!(parsed, DataType::Custom("image".to_string()));
    assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"image\"");
  }

  #[test]
  fn test_compatibility() {
    assert!(DataType::Any.is_compatible_with(&DataType::Number));
    assert!(DataType::String.is_compatible_with(&DataType::Any));
    assert!(DataType::Number.is_compatible_with(&DataType::Number));
    assert!(!DataType::Number.is_compatible_with(&DataType::String));
  }
}
