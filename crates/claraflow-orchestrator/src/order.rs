use std::collections::HashMap;

use claraflow_workflow::Graph;

use crate::error::RunError;

#[derive(Clone, Copy, PartialEq)]
enum Mark {
  Visiting,
  Done,
}

/// Order in which a flow's nodes run: every producer before its consumers.
///
/// Nodes are reached depth-first from the terminal nodes (nodes with no
/// downstream) in declaration order, producers first. Anything left over,
/// including a flow with no terminal node, is picked up in declaration order.
pub fn execution_order(graph: &Graph) -> Result<Vec<String>, RunError> {
  let mut marks: HashMap<&str, Mark> = HashMap::new();
  let mut order = Vec::with_capacity(graph.node_ids().len());

  let seeds = graph
    .terminal_nodes()
    .into_iter()
    .chain(graph.node_ids().iter().map(String::as_str));
  for seed in seeds {
    visit(graph, seed, &mut marks, &mut order)?;
  }

  Ok(order)
}

/// Post-order walk over the producers of `root`.
fn visit<'g>(
  graph: &'g Graph,
  root: &'g str,
  marks: &mut HashMap<&'g str, Mark>,
  order: &mut Vec<String>,
) -> Result<(), RunError> {
  if marks.contains_key(root) {
    return Ok(());
  }
  marks.insert(root, Mark::Visiting);
  // (node, next upstream edge to follow); the stack is the current path
  let mut stack: Vec<(&'g str, usize)> = vec![(root, 0)];

  while let Some((node, next)) = stack.last_mut() {
    let node = *node;
    let Some(upstream) = graph.upstream(node).get(*next) else {
      marks.insert(node, Mark::Done);
      order.push(node.to_string());
      stack.pop();
      continue;
    };
    *next += 1;

    match marks.get(upstream.as_str()) {
      Some(Mark::Done) => {}
      Some(Mark::Visiting) => {
        // the stack runs against the edges; flip it so the cycle reads in flow direction
        let start = stack
          .iter()
          .position(|(id, _)| *id == upstream.as_str())
          .unwrap_or(0);
        let mut nodes: Vec<String> = stack[start..].iter().map(|(id, _)| id.to_string()).collect();
        nodes.push(upstream.clone());
        nodes.reverse();
        return Err(RunError::Cycle { nodes });
      }
      None => {
        marks.insert(upstream.as_str(), Mark::Visiting);
        stack.push((upstream.as_str(), 0));
      }
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use claraflow_workflow::Flow;
  use serde_json::json;

  fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> Graph {
    let nodes: Vec<_> = nodes
      .iter()
      .map(|id| json!({ "id": id, "type": "pass-through", "name": id }))
      .collect();
    let connections: Vec<_> = edges
      .iter()
      .map(|(from, to)| json!({ "sourceNodeId": from, "targetNodeId": to, "targetPortId": "input" }))
      .collect();
    Flow::from_value(&json!({ "nodes": nodes, "connections": connections }))
      .unwrap()
      .graph()
  }

  #[test]
  fn test_producers_before_consumers() {
    // declared out of order on purpose
    let g = graph(&["out", "mul", "a", "b"], &[("a", "mul"), ("b", "mul"), ("mul", "out")]);
    assert_eq!(execution_order(&g).unwrap(), vec!["a", "b", "mul", "out"]);
  }

  #[test]
  fn test_disconnected_nodes_follow_declaration_order() {
    let g = graph(&["x", "y", "z"], &[]);
    assert_eq!(execution_order(&g).unwrap(), vec!["x", "y", "z"]);
  }

  #[test]
  fn test_diamond_visits_shared_producer_once() {
    let g = graph(
      &["a", "b", "c", "d"],
      &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
    );
    assert_eq!(execution_order(&g).unwrap(), vec!["a", "b", "c", "d"]);
  }

  #[test]
  fn test_cycle_is_reported_in_flow_direction() {
    let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
    match execution_order(&g) {
      Err(RunError::Cycle { nodes }) => {
        assert_eq!(nodes.first(), nodes.last());
        assert_eq!(nodes.len(), 4);
        for pair in nodes.windows(2) {
          assert!(g.downstream(&pair[0]).contains(&pair[1]), "{nodes:?}");
        }
      }
      other => panic!("expected cycle, got {other:?}"),
    }
  }

  #[test]
  fn test_long_chain() {
    let ids: Vec<String> = (0..100_000).map(|i| format!("n{i}")).collect();
    let nodes: Vec<&str> = ids.iter().map(String::as_str).collect();
    let edges: Vec<(&str, &str)> = nodes.windows(2).map(|w| (w[0], w[1])).collect();
    let g = graph(&nodes, &edges);

    let order = execution_order(&g).unwrap();
    assert_eq!(order.len(), ids.len());
    assert_eq!(order, ids);
  }

  #[test]
  fn test_cycle_behind_terminal_node() {
    let g = graph(&["a", "b", "out"], &[("a", "b"), ("b", "a"), ("b", "out")]);
    assert!(matches!(execution_order(&g), Err(RunError::Cycle { .. })));
  }
}
