use std::collections::{HashMap, HashSet};

use crate::flow::{Connection, Node};

/// Graph structure for traversal and analysis.
///
/// Edges whose endpoints are not declared nodes are left out; the validator
/// reports them separately.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Node ids in declaration order, duplicates removed.
  order: Vec<String>,
  /// Adjacency list: node_id -> list of downstream node_ids.
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: node_id -> list of upstream node_ids.
  reverse_adjacency: HashMap<String, Vec<String>>,
}

impl Graph {
  pub fn new(nodes: &[Node], connections: &[Connection]) -> Self {
    let mut order = Vec::with_capacity(nodes.len());
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();

    for node in nodes {
      if adjacency.contains_key(&node.id) {
        continue;
      }
      order.push(node.id.clone());
      adjacency.insert(node.id.clone(), Vec::new());
      reverse_adjacency.insert(node.id.clone(), Vec::new());
    }

    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    for conn in connections {
      let (from, to) = (conn.source_node_id.as_str(), conn.target_node_id.as_str());
      if !adjacency.contains_key(from) || !adjacency.contains_key(to) || !seen.insert((from, to)) {
        continue;
      }
      if let Some(downstream) = adjacency.get_mut(from) {
        downstream.push(to.to_string());
      }
      if let Some(upstream) = reverse_adjacency.get_mut(to) {
        upstream.push(from.to_string());
      }
    }

    Self {
      order,
      adjacency,
      reverse_adjacency,
    }
  }

  /// Node ids in declaration order.
  pub fn node_ids(&self) -> &[String] {
    &self.order
  }

  /// Nodes with no outgoing edges, in declaration order.
  pub fn terminal_nodes(&self) -> Vec<&str> {
    self
      .order
      .iter()
      .filter(|id| self.downstream(id).is_empty())
      .map(String::as_str)
      .collect()
  }

  /// Get downstream nodes for a given node.
  pub fn downstream(&self, node_id: &str) -> &[String] {
    self
      .adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get upstream nodes for a given node, in connection order.
  pub fn upstream(&self, node_id: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }
}
