use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::custom_node::CustomNodeDef;
use crate::error::FormatError;
use crate::flow::FlowDef;

/// Export formats understood in the envelope's `format` field.
pub const KNOWN_FORMATS: &[&str] = &["clara-sdk", "clara-native"];

/// The export envelope written by the SDK exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEnvelope {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub format: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  pub flow: FlowDef,
  #[serde(default)]
  pub custom_nodes: Vec<CustomNodeDef>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata: Option<Value>,
}

/// A flow document in one of the three accepted shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowDocument {
  Envelope(FlowEnvelope),
  InlineCustomNodes(FlowDef),
  Bare(FlowDef),
}

/// Which shape a document was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentShape {
  Envelope,
  InlineCustomNodes,
  Bare,
}

impl fmt::Display for DocumentShape {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DocumentShape::Envelope => f.write_str("export envelope"),
      DocumentShape::InlineCustomNodes => f.write_str("flow with inline custom nodes"),
      DocumentShape::Bare => f.write_str("bare flow graph"),
    }
  }
}

impl FlowDocument {
  /// Recognize the shape of a parsed JSON document.
  ///
  /// A top-level `flow` key wins over a top-level `nodes` key. Within the
  /// `nodes` shapes, a non-empty `customNodes` array selects
  /// [`FlowDocument::InlineCustomNodes`].
  pub fn from_value(value: &Value) -> Result<Self, FormatError> {
    let object = value.as_object().ok_or(FormatError::NotAnObject {
      found: json_type_name(value),
    })?;

    if object.contains_key("flow") {
      if let Some(format) = object.get("format") {
        let format = format.as_str().unwrap_or_default();
        if !KNOWN_FORMATS.contains(&format) {
          return Err(FormatError::UnsupportedFormat {
            format: format.to_string(),
          });
        }
      }
      let envelope = FlowEnvelope::deserialize(value).map_err(|source| FormatError::Malformed {
        shape: DocumentShape::Envelope,
        source,
      })?;
      return Ok(FlowDocument::Envelope(envelope));
    }

    if object.contains_key("nodes") {
      let inline = object
        .get("customNodes")
        .and_then(Value::as_array)
        .is_some_and(|defs| !defs.is_empty());
      let shape = if inline {
        DocumentShape::InlineCustomNodes
      } else {
        DocumentShape::Bare
      };
      let flow =
        FlowDef::deserialize(value).map_err(|source| FormatError::Malformed { shape, source })?;
      return Ok(match shape {
        DocumentShape::InlineCustomNodes => FlowDocument::InlineCustomNodes(flow),
        _ => FlowDocument::Bare(flow),
      });
    }

    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort_unstable();
    Err(FormatError::UnrecognizedShape {
      keys: keys.join(", "),
    })
  }

  pub fn from_json_str(text: &str) -> Result<Self, FormatError> {
    let value: Value = serde_json::from_str(text)?;
    Self::from_value(&value)
  }

  pub fn shape(&self) -> DocumentShape {
    match self {
      FlowDocument::Envelope(_) => DocumentShape::Envelope,
      FlowDocument::InlineCustomNodes(_) => DocumentShape::InlineCustomNodes,
      FlowDocument::Bare(_) => DocumentShape::Bare,
    }
  }
}

fn json_type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn nodes() -> Value {
    json!([{ "id": "in", "type": "input", "data": { "value": 1 } }])
  }

  #[test]
  fn test_bare_graph() {
    let doc = FlowDocument::from_value(&json!({ "nodes": nodes(), "connections": [] })).unwrap();
    assert_eq!(doc.shape(), DocumentShape::Bare);
  }

  #[test]
  fn test_empty_custom_nodes_is_bare() {
    let doc = FlowDocument::from_value(&json!({ "nodes": nodes(), "customNodes": [] })).unwrap();
    assert_eq!(doc.shape(), DocumentShape::Bare);
  }

  #[test]
  fn test_inline_custom_nodes() {
    let doc = FlowDocument::from_value(&json!({
      "nodes": nodes(),
      "customNodes": [{ "type": "noop", "executionCode": "return function() return {} end" }]
    }))
    .unwrap();
    assert_eq!(doc.shape(), DocumentShape::InlineCustomNodes);
  }

  #[test]
  fn test_flow_key_wins_over_nodes() {
    let doc = FlowDocument::from_value(&json!({
      "format": "clara-sdk",
      "version": "1.0.0",
      "nodes": [],
      "flow": { "name": "wrapped", "nodes": nodes() }
    }))
    .unwrap();
    match doc {
      FlowDocument::Envelope(envelope) => {
        assert_eq!(envelope.flow.name.as_deref(), Some("wrapped"));
        assert_eq!(envelope.flow.nodes.len(), 1);
      }
      other => panic!("expected envelope, got {other:?}"),
    }
  }

  #[test]
  fn test_unknown_format_rejected() {
    let err = FlowDocument::from_value(&json!({ "format": "n8n", "flow": { "nodes": [] } }))
      .unwrap_err();
    assert!(matches!(err, FormatError::UnsupportedFormat { format } if format == "n8n"));
  }

  #[test]
  fn test_non_object_rejected() {
    let err = FlowDocument::from_value(&json!([1, 2])).unwrap_err();
    assert!(matches!(err, FormatError::NotAnObject { found: "array" }));
  }

  #[test]
  fn test_unrecognized_shape() {
    let err = FlowDocument::from_value(&json!({ "edges": [], "title": "x" })).unwrap_err();
    assert_eq!(
      err.to_string(),
      "unrecognized flow document shape (top-level keys: edges, title)"
    );
  }

  #[test]
  fn test_malformed_node() {
    let err = FlowDocument::from_value(&json!({ "nodes": [{ "type": "input" }] })).unwrap_err();
    assert!(matches!(
      err,
      FormatError::Malformed {
        shape: DocumentShape::Bare,
        ..
      }
    ));
  }

  #[test]
  fn test_invalid_json_text() {
    let err = FlowDocument::from_json_str("{ nodes").unwrap_err();
    assert!(matches!(err, FormatError::Json(_)));
  }
}
