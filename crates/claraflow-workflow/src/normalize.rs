use claraflow_config::{
  ConnectionDef, CustomNodeDef, DEFAULT_INPUT_PORT, FlowDef, FlowDocument, FormatError, NodeDef,
  PortDef,
};
use tracing::debug;

use crate::flow::{Connection, Flow, Node, Port};

pub const DEFAULT_FLOW_ID: &str = "flow";
pub const DEFAULT_FLOW_NAME: &str = "Untitled Flow";

/// Turn any accepted document shape into the canonical [`Flow`].
///
/// Envelope-level custom nodes come before flow-level ones; a later
/// definition of the same type replaces the earlier one in place.
pub fn normalize(document: FlowDocument) -> Result<Flow, FormatError> {
  let shape = document.shape();
  let (mut flow_def, custom_nodes) = match document {
    FlowDocument::Envelope(envelope) => {
      let mut flow = envelope.flow;
      let flow_level = std::mem::take(&mut flow.custom_nodes);
      let merged = merge_custom_nodes(envelope.custom_nodes.into_iter().chain(flow_level));
      (flow, merged)
    }
    FlowDocument::InlineCustomNodes(mut flow) | FlowDocument::Bare(mut flow) => {
      let defs = std::mem::take(&mut flow.custom_nodes);
      (flow, merge_custom_nodes(defs))
    }
  };

  let nodes = std::mem::take(&mut flow_def.nodes)
    .into_iter()
    .map(|node| convert_node(node, &custom_nodes))
    .collect::<Result<Vec<_>, _>>()?;
  let connections = std::mem::take(&mut flow_def.connections)
    .into_iter()
    .map(convert_connection)
    .collect();

  let FlowDef {
    id,
    name,
    description,
    ..
  } = flow_def;

  let flow = Flow {
    id: id.unwrap_or_else(|| DEFAULT_FLOW_ID.to_string()),
    name: name.unwrap_or_else(|| DEFAULT_FLOW_NAME.to_string()),
    description,
    nodes,
    connections,
    custom_nodes,
  };

  debug!(
    flow_id = %flow.id,
    shape = %shape,
    nodes = flow.nodes.len(),
    connections = flow.connections.len(),
    custom_nodes = flow.custom_nodes.len(),
    "flow_normalized"
  );

  Ok(flow)
}

fn merge_custom_nodes(defs: impl IntoIterator<Item = CustomNodeDef>) -> Vec<CustomNodeDef> {
  let mut merged: Vec<CustomNodeDef> = Vec::new();
  for def in defs {
    match merged.iter_mut().find(|d| d.node_type == def.node_type) {
      Some(existing) => *existing = def,
      None => merged.push(def),
    }
  }
  merged
}

fn convert_node(def: NodeDef, custom_nodes: &[CustomNodeDef]) -> Result<Node, FormatError> {
  let custom = custom_nodes.iter().find(|d| d.node_type == def.node_type);

  // Custom node instances saved without ports inherit them from the definition.
  let input_defs = match custom {
    Some(custom) if def.inputs.is_empty() => custom.inputs.clone(),
    _ => def.inputs,
  };
  let output_defs = match custom {
    Some(custom) if def.outputs.is_empty() => custom.outputs.clone(),
    _ => def.outputs,
  };

  let inputs = input_defs
    .into_iter()
    .map(|p| convert_port(&def.id, p))
    .collect::<Result<Vec<_>, _>>()?;
  let outputs = output_defs
    .into_iter()
    .map(|p| convert_port(&def.id, p))
    .collect::<Result<Vec<_>, _>>()?;

  Ok(Node {
    name: def.name.unwrap_or_else(|| def.id.clone()),
    id: def.id,
    node_type: def.node_type,
    data: def.data.unwrap_or_default(),
    inputs,
    outputs,
  })
}

fn convert_port(node_id: &str, def: PortDef) -> Result<Port, FormatError> {
  let (id, name) = match (def.id, def.name) {
    (Some(id), Some(name)) => (id, name),
    (Some(id), None) => (id.clone(), id),
    (None, Some(name)) => (name.clone(), name),
    (None, None) => {
      return Err(FormatError::UnnamedPort {
        node_id: node_id.to_string(),
      });
    }
  };
  Ok(Port {
    id,
    name,
    data_type: def.data_type,
    required: def.required,
    description: def.description,
  })
}

fn convert_connection(def: ConnectionDef) -> Connection {
  Connection {
    id: def.id,
    source_node_id: def.source_node_id,
    source_port_id: def.source_port_id,
    target_node_id: def.target_node_id,
    target_port_id: def
      .target_port_id
      .unwrap_or_else(|| DEFAULT_INPUT_PORT.to_string()),
  }
}
