use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::flow::Flow;
use crate::graph::Graph;

/// Source of truth for which node types have an executor.
pub trait NodeTypeCatalog {
  fn has_type(&self, node_type: &str) -> bool;
}

impl<F> NodeTypeCatalog for F
where
  F: Fn(&str) -> bool,
{
  fn has_type(&self, node_type: &str) -> bool {
    self(node_type)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
  EmptyFlow,
  DuplicateNodeId,
  UnknownNode,
  UnknownPort,
  PortFanIn,
  Cycle,
  UnregisteredType,
  TypeMismatch,
  MissingRequiredInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
  pub code: IssueCode,
  pub message: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub node_ids: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub connection_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
  pub flow_id: String,
  pub flow_name: String,
  pub node_count: usize,
  pub connection_count: usize,
  pub custom_node_count: usize,
}

/// Outcome of [`validate`]. Issues never abort validation; all checks run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
  pub is_valid: bool,
  pub errors: Vec<ValidationIssue>,
  pub warnings: Vec<ValidationIssue>,
  pub summary: ValidationSummary,
}

impl ValidationReport {
  pub fn has_error(&self, code: IssueCode) -> bool {
    self.errors.iter().any(|i| i.code == code)
  }

  pub fn has_warning(&self, code: IssueCode) -> bool {
    self.warnings.iter().any(|i| i.code == code)
  }
}

/// Check a flow's structure without executing any node code.
///
/// Referential errors suppress the cycle check; fan-in errors do not.
pub fn validate(flow: &Flow, catalog: &dyn NodeTypeCatalog) -> ValidationReport {
  let mut validator = Validator {
    flow,
    errors: Vec::new(),
    warnings: Vec::new(),
  };

  if flow.nodes.is_empty() {
    validator.warn(IssueCode::EmptyFlow, "flow has no nodes".to_string(), vec![], None);
  }
  validator.check_duplicate_ids();
  let references_ok = validator.check_references();
  validator.check_fan_in();
  if references_ok {
    validator.check_cycles();
  }
  validator.check_node_types(catalog);
  validator.check_port_types();
  validator.check_required_inputs();

  let Validator {
    errors, warnings, ..
  } = validator;

  debug!(
    flow_id = %flow.id,
    errors = errors.len(),
    warnings = warnings.len(),
    "flow_validated"
  );

  ValidationReport {
    is_valid: errors.is_empty(),
    errors,
    warnings,
    summary: ValidationSummary {
      flow_id: flow.id.clone(),
      flow_name: flow.name.clone(),
      node_count: flow.nodes.len(),
      connection_count: flow.connections.len(),
      custom_node_count: flow.custom_nodes.len(),
    },
  }
}

struct Validator<'a> {
  flow: &'a Flow,
  errors: Vec<ValidationIssue>,
  warnings: Vec<ValidationIssue>,
}

impl<'a> Validator<'a> {
  fn error(
    &mut self,
    code: IssueCode,
    message: String,
    node_ids: Vec<String>,
    connection_id: Option<String>,
  ) {
    self.errors.push(ValidationIssue {
      code,
      message,
      node_ids,
      connection_id,
    });
  }

  fn warn(
    &mut self,
    code: IssueCode,
    message: String,
    node_ids: Vec<String>,
    connection_id: Option<String>,
  ) {
    self.warnings.push(ValidationIssue {
      code,
      message,
      node_ids,
      connection_id,
    });
  }

  fn check_duplicate_ids(&mut self) {
    let flow = self.flow;
    let mut seen: HashSet<&str> = HashSet::new();
    let mut reported: HashSet<&str> = HashSet::new();
    for node in &flow.nodes {
      if !seen.insert(node.id.as_str()) && reported.insert(node.id.as_str()) {
        self.error(
          IssueCode::DuplicateNodeId,
          format!("node id '{}' is declared more than once", node.id),
          vec![node.id.clone()],
          None,
        );
      }
    }
  }

  /// Returns false when any connection references a missing node or port.
  fn check_references(&mut self) -> bool {
    let flow = self.flow;
    let mut ok = true;

    for conn in &flow.connections {
      let label = conn.label();

      match flow.node(&conn.source_node_id) {
        None => {
          ok = false;
          self.error(
            IssueCode::UnknownNode,
            format!(
              "connection {label} references unknown source node '{}'",
              conn.source_node_id
            ),
            vec![conn.source_node_id.clone()],
            conn.id.clone(),
          );
        }
        Some(source) => {
          if let Some(port) = conn.source_port_id.as_deref() {
            if !source.provides_output(port) {
              ok = false;
              self.error(
                IssueCode::UnknownPort,
                format!(
                  "connection {label} references unknown output port '{port}' on node '{}'",
                  source.id
                ),
                vec![source.id.clone()],
                conn.id.clone(),
              );
            }
          }
        }
      }

      match flow.node(&conn.target_node_id) {
        None => {
          ok = false;
          self.error(
            IssueCode::UnknownNode,
            format!(
              "connection {label} references unknown target node '{}'",
              conn.target_node_id
            ),
            vec![conn.target_node_id.clone()],
            conn.id.clone(),
          );
        }
        Some(target) => {
          if !target.accepts_input(&conn.target_port_id) {
            ok = false;
            self.error(
              IssueCode::UnknownPort,
              format!(
                "connection {label} references unknown input port '{}' on node '{}'",
                conn.target_port_id, target.id
              ),
              vec![target.id.clone()],
              conn.id.clone(),
            );
          }
        }
      }
    }

    ok
  }

  fn check_fan_in(&mut self) {
    let flow = self.flow;
    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    for conn in &flow.connections {
      *counts
        .entry((conn.target_node_id.as_str(), conn.target_port_id.as_str()))
        .or_default() += 1;
    }

    let mut reported: HashSet<(&str, &str)> = HashSet::new();
    for conn in &flow.connections {
      let key = (conn.target_node_id.as_str(), conn.target_port_id.as_str());
      let count = counts.get(&key).copied().unwrap_or_default();
      if count > 1 && reported.insert(key) {
        self.error(
          IssueCode::PortFanIn,
          format!(
            "input port '{}' on node '{}' has {count} incoming connections",
            key.1, key.0
          ),
          vec![key.0.to_string()],
          None,
        );
      }
    }
  }

  fn check_cycles(&mut self) {
    let graph = self.flow.graph();
    for cycle in find_cycles(&graph) {
      let mut members: Vec<String> = Vec::new();
      for id in &cycle {
        if !members.contains(id) {
          members.push(id.clone());
        }
      }
      self.error(
        IssueCode::Cycle,
        format!("cycle detected: {}", cycle.join(" -> ")),
        members,
        None,
      );
    }
  }

  fn check_node_types(&mut self, catalog: &dyn NodeTypeCatalog) {
    let flow = self.flow;
    for node in &flow.nodes {
      if !catalog.has_type(&node.node_type) && flow.custom_node(&node.node_type).is_none() {
        self.warn(
          IssueCode::UnregisteredType,
          format!(
            "node '{}' has type '{}' with no registered executor",
            node.id, node.node_type
          ),
          vec![node.id.clone()],
          None,
        );
      }
    }
  }

  fn check_port_types(&mut self) {
    let flow = self.flow;
    for conn in &flow.connections {
      let (Some(source), Some(target)) = (
        flow.node(&conn.source_node_id),
        flow.node(&conn.target_node_id),
      ) else {
        continue;
      };
      let Some(source_port) = conn.source_port_id.as_deref().and_then(|p| source.output(p)) else {
        continue;
      };
      let Some(target_port) = target.input(&conn.target_port_id) else {
        continue;
      };
      if !source_port.data_type.is_compatible_with(&target_port.data_type) {
        self.warn(
          IssueCode::TypeMismatch,
          format!(
            "connection {} sends {} from '{}.{}' into {} port '{}.{}'",
            conn.label(),
            source_port.data_type,
            source.id,
            source_port.id,
            target_port.data_type,
            target.id,
            target_port.id
          ),
          vec![source.id.clone(), target.id.clone()],
          conn.id.clone(),
        );
      }
    }
  }

  fn check_required_inputs(&mut self) {
    let flow = self.flow;
    for node in &flow.nodes {
      for port in node.inputs.iter().filter(|p| p.required) {
        let connected = flow
          .incoming(&node.id)
          .any(|c| c.target_port_id == port.id);
        if !connected {
          self.warn(
            IssueCode::MissingRequiredInput,
            format!(
              "required input '{}' on node '{}' is not connected",
              port.id, node.id
            ),
            vec![node.id.clone()],
            None,
          );
        }
      }
    }
  }
}

/// Every back-edge found by a three-colour DFS, as the path it closes.
fn find_cycles(graph: &Graph) -> Vec<Vec<String>> {
  // 0 = white (unvisited), 1 = gray (on the stack), 2 = black (done)
  let mut color: HashMap<&str, u8> = graph
    .node_ids()
    .iter()
    .map(|id| (id.as_str(), 0u8))
    .collect();
  let mut cycles = Vec::new();

  for root in graph.node_ids() {
    if color.get(root.as_str()) != Some(&0) {
      continue;
    }
    color.insert(root.as_str(), 1);
    // (node, next downstream edge to follow); the stack is the current path
    let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];

    while let Some((node, next)) = stack.last_mut() {
      let node = *node;
      let Some(neighbor) = graph.downstream(node).get(*next) else {
        color.insert(node, 2);
        stack.pop();
        continue;
      };
      *next += 1;

      match color.get(neighbor.as_str()) {
        Some(1) => {
          let start = stack
            .iter()
            .position(|(id, _)| *id == neighbor.as_str())
            .unwrap_or_default();
          let mut cycle: Vec<String> = stack[start..].iter().map(|(id, _)| id.to_string()).collect();
          cycle.push(neighbor.clone());
          cycles.push(cycle);
        }
        Some(0) => {
          color.insert(neighbor.as_str(), 1);
          stack.push((neighbor.as_str(), 0));
        }
        _ => {}
      }
    }
  }

  cycles
}
