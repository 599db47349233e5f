use std::collections::HashMap;

use claraflow_node_runtime::builtin::INPUT_NODE_TYPE;
use claraflow_workflow::Flow;
use serde_json::Value;

use crate::FlowInputs;

/// Caller-supplied values matched to `input` nodes.
#[derive(Debug, Default)]
pub(crate) struct BoundInputs {
  /// node id -> value
  pub(crate) values: HashMap<String, Value>,
  /// Keys that matched no input node.
  pub(crate) unmatched: Vec<String>,
}

/// Match each supplied key to an `input` node, by id first and then by name.
///
/// When two keys land on the same node the id-keyed value wins.
pub(crate) fn bind_inputs(flow: &Flow, inputs: &FlowInputs) -> BoundInputs {
  let mut bound = BoundInputs::default();
  let input_nodes: Vec<_> = flow
    .nodes
    .iter()
    .filter(|n| n.node_type == INPUT_NODE_TYPE)
    .collect();

  let mut by_id = Vec::new();
  for (key, value) in inputs {
    if let Some(node) = input_nodes.iter().find(|n| n.id == *key) {
      by_id.push((node.id.clone(), value.clone()));
    } else if let Some(node) = input_nodes.iter().find(|n| n.name == *key) {
      bound.values.insert(node.id.clone(), value.clone());
    } else {
      bound.unmatched.push(key.clone());
    }
  }
  bound.values.extend(by_id);

  bound
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn flow() -> Flow {
    Flow::from_value(&json!({
      "nodes": [
        { "id": "in-a", "type": "input", "name": "First" },
        { "id": "in-b", "type": "input", "name": "Second" },
        { "id": "shout", "type": "pass-through", "name": "Shout" }
      ],
      "connections": []
    }))
    .unwrap()
  }

  fn inputs(value: Value) -> FlowInputs {
    match value {
      Value::Object(map) => map,
      _ => FlowInputs::new(),
    }
  }

  #[test]
  fn test_binds_by_id_and_name() {
    let bound = bind_inputs(&flow(), &inputs(json!({ "in-a": 6, "Second": 7 })));
    assert_eq!(bound.values["in-a"], json!(6));
    assert_eq!(bound.values["in-b"], json!(7));
    assert!(bound.unmatched.is_empty());
  }

  #[test]
  fn test_id_wins_over_name() {
    let bound = bind_inputs(&flow(), &inputs(json!({ "First": "by-name", "in-a": "by-id" })));
    assert_eq!(bound.values["in-a"], json!("by-id"));
  }

  #[test]
  fn test_unmatched_and_non_input_keys() {
    let bound = bind_inputs(&flow(), &inputs(json!({ "shout": 1, "missing": 2 })));
    assert!(bound.values.is_empty());
    let mut unmatched = bound.unmatched;
    unmatched.sort();
    assert_eq!(unmatched, vec!["missing", "shout"]);
  }
}
