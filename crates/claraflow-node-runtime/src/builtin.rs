//! Nodes available in every engine.
//!
//! | type           | inputs        | output                                   |
//! |----------------|---------------|------------------------------------------|
//! | `input`        | -             | `{ "output": value }`                    |
//! | `output`       | `input`       | the input value itself                   |
//! | `pass-through` | `input`       | `{ "output": input }`                    |
//! | `json-parse`   | `input`       | `{ "output": parsed }`                   |
//! | `combine-text` | any           | `{ "output": joined text }`              |

use std::sync::Arc;

use async_trait::async_trait;
use claraflow_config::{DEFAULT_INPUT_PORT, DEFAULT_OUTPUT_PORT};
use serde_json::{Value, json};

use crate::context::NodeContext;
use crate::error::NodeError;
use crate::executor::{NodeExecutor, PortValues};

pub const INPUT_NODE_TYPE: &str = "input";
pub const OUTPUT_NODE_TYPE: &str = "output";
pub const PASS_THROUGH_NODE_TYPE: &str = "pass-through";
pub const JSON_PARSE_NODE_TYPE: &str = "json-parse";
pub const COMBINE_TEXT_NODE_TYPE: &str = "combine-text";

/// All built-in executors keyed by node type.
pub fn builtin_executors() -> Vec<(&'static str, Arc<dyn NodeExecutor>)> {
  vec![
    (INPUT_NODE_TYPE, Arc::new(InputNode) as Arc<dyn NodeExecutor>),
    (OUTPUT_NODE_TYPE, Arc::new(OutputNode) as Arc<dyn NodeExecutor>),
    (PASS_THROUGH_NODE_TYPE, Arc::new(PassThroughNode) as Arc<dyn NodeExecutor>),
    (JSON_PARSE_NODE_TYPE, Arc::new(JsonParseNode) as Arc<dyn NodeExecutor>),
    (COMBINE_TEXT_NODE_TYPE, Arc::new(CombineTextNode) as Arc<dyn NodeExecutor>),
  ]
}

/// The value arriving on the default input port, or the only input if the
/// node was wired to a differently named port.
fn primary_input(inputs: &PortValues) -> Value {
  if let Some(value) = inputs.get(DEFAULT_INPUT_PORT) {
    return value.clone();
  }
  let mut values = inputs.values();
  match (values.next(), values.next()) {
    (Some(only), None) => only.clone(),
    _ => Value::Null,
  }
}

/// Emits the value bound to this node for the run.
///
/// The engine writes a caller-supplied value into `properties.value`. When
/// none was supplied the configured `value` is used, then `defaultValue`.
pub struct InputNode;

#[async_trait]
impl NodeExecutor for InputNode {
  async fn execute(
    &self,
    _inputs: PortValues,
    properties: PortValues,
    ctx: NodeContext,
  ) -> Result<Value, NodeError> {
    let value = properties
      .get("value")
      .filter(|v| !v.is_null())
      .or_else(|| properties.get("defaultValue"))
      .cloned()
      .unwrap_or(Value::Null);
    let value = coerce_input(value, properties.get("inputType").and_then(Value::as_str));
    ctx.debug(format!("input value resolved ({})", type_name(&value)));
    Ok(json!({ DEFAULT_OUTPUT_PORT: value }))
  }
}

/// Editor inputs arrive as text; convert them when the node declares a type.
fn coerce_input(value: Value, input_type: Option<&str>) -> Value {
  let Value::String(text) = value else {
    return value;
  };
  let coerced = match input_type {
    Some("number") => text.trim().parse::<f64>().ok().and_then(|n| {
      if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Some(Value::from(n as i64))
      } else {
        serde_json::Number::from_f64(n).map(Value::Number)
      }
    }),
    Some("boolean") => match text.trim() {
      "true" => Some(Value::Bool(true)),
      "false" => Some(Value::Bool(false)),
      _ => None,
    },
    Some("json") => serde_json::from_str(&text).ok(),
    _ => None,
  };
  coerced.unwrap_or(Value::String(text))
}

fn type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

/// Terminal node: its result is the received value, unwrapped.
pub struct OutputNode;

#[async_trait]
impl NodeExecutor for OutputNode {
  async fn execute(
    &self,
    inputs: PortValues,
    _properties: PortValues,
    _ctx: NodeContext,
  ) -> Result<Value, NodeError> {
    if inputs.len() > 1 && !inputs.contains_key(DEFAULT_INPUT_PORT) {
      return Ok(Value::Object(inputs));
    }
    Ok(primary_input(&inputs))
  }
}

pub struct PassThroughNode;

#[async_trait]
impl NodeExecutor for PassThroughNode {
  async fn execute(
    &self,
    inputs: PortValues,
    _properties: PortValues,
    _ctx: NodeContext,
  ) -> Result<Value, NodeError> {
    Ok(json!({ DEFAULT_OUTPUT_PORT: primary_input(&inputs) }))
  }
}

/// Parses JSON text. Non-string inputs are passed through unchanged.
///
/// An optional `field` property selects a dotted path inside the parsed value.
pub struct JsonParseNode;

#[async_trait]
impl NodeExecutor for JsonParseNode {
  async fn execute(
    &self,
    inputs: PortValues,
    properties: PortValues,
    _ctx: NodeContext,
  ) -> Result<Value, NodeError> {
    let parsed = match primary_input(&inputs) {
      Value::String(text) => serde_json::from_str(&text)
        .map_err(|e| NodeError::invalid_input(format!("input is not valid JSON: {e}")))?,
      other => other,
    };

    let field = properties
      .get("field")
      .and_then(Value::as_str)
      .filter(|f| !f.is_empty());
    let output = match field {
      Some(path) => select_path(&parsed, path).cloned().unwrap_or(Value::Null),
      None => parsed,
    };

    Ok(json!({ DEFAULT_OUTPUT_PORT: output }))
  }
}

fn select_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
  path.split('.').try_fold(value, |current, segment| match current {
    Value::Object(map) => map.get(segment),
    Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
    _ => None,
  })
}

/// Joins every input, ordered by port id, with the `separator` property
/// (a single space by default).
pub struct CombineTextNode;

#[async_trait]
impl NodeExecutor for CombineTextNode {
  async fn execute(
    &self,
    inputs: PortValues,
    properties: PortValues,
    _ctx: NodeContext,
  ) -> Result<Value, NodeError> {
    let separator = properties
      .get("separator")
      .and_then(Value::as_str)
      .unwrap_or(" ");

    let mut ports: Vec<(&String, &Value)> = inputs.iter().collect();
    ports.sort_by(|a, b| a.0.cmp(b.0));

    let parts: Vec<String> = ports
      .into_iter()
      .filter(|(_, v)| !v.is_null())
      .map(|(_, v)| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
      })
      .collect();

    Ok(json!({ DEFAULT_OUTPUT_PORT: parts.join(separator) }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ports(value: Value) -> PortValues {
    match value {
      Value::Object(map) => map,
      _ => PortValues::new(),
    }
  }

  async fn call(executor: &dyn NodeExecutor, inputs: Value, properties: Value) -> Result<Value, NodeError> {
    executor
      .execute(ports(inputs), ports(properties), NodeContext::detached("test"))
      .await
  }

  #[tokio::test]
  async fn test_input_prefers_bound_value() {
    let out = call(&InputNode, json!({}), json!({ "value": "Hello", "defaultValue": "x" }))
      .await
      .unwrap();
    assert_eq!(out, json!({ "output": "Hello" }));
  }

  #[tokio::test]
  async fn test_input_falls_back_to_default() {
    let out = call(&InputNode, json!({}), json!({ "value": null, "defaultValue": 7 }))
      .await
      .unwrap();
    assert_eq!(out["output"], 7);
  }

  #[tokio::test]
  async fn test_input_coerces_number() {
    let out = call(&InputNode, json!({}), json!({ "value": "6", "inputType": "number" }))
      .await
      .unwrap();
    assert_eq!(out["output"], 6);
  }

  #[tokio::test]
  async fn test_output_unwraps_input() {
    let out = call(&OutputNode, json!({ "input": "Hello World" }), json!({}))
      .await
      .unwrap();
    assert_eq!(out, json!("Hello World"));
  }

  #[tokio::test]
  async fn test_output_without_input_is_null() {
    let out = call(&OutputNode, json!({}), json!({})).await.unwrap();
    assert!(out.is_null());
  }

  #[tokio::test]
  async fn test_json_parse_with_field() {
    let out = call(
      &JsonParseNode,
      json!({ "input": "{\"user\": {\"tags\": [\"a\", \"b\"]}}" }),
      json!({ "field": "user.tags.1" }),
    )
    .await
    .unwrap();
    assert_eq!(out["output"], "b");
  }

  #[tokio::test]
  async fn test_json_parse_rejects_invalid_text() {
    let err = call(&JsonParseNode, json!({ "input": "{oops" }), json!({}))
      .await
      .unwrap_err();
    assert_eq!(err.kind(), "invalid_input");
  }

  #[tokio::test]
  async fn test_combine_text() {
    let out = call(
      &CombineTextNode,
      json!({ "text2": "World", "text1": "Hello", "count": 3 }),
      json!({ "separator": ", " }),
    )
    .await
    .unwrap();
    assert_eq!(out["output"], "3, Hello, World");
  }
}
