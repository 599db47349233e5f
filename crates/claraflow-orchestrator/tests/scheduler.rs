use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use claraflow_host_log::{ExecutionLog, LogLevel};
use claraflow_node_runtime::{NodeContext, NodeError, NodeExecutor, NodeRegistry, PortValues};
use claraflow_node_runtime_lua::LuaNodeCompiler;
use claraflow_orchestrator::{
  ExecutionOptions, FlowInputs, NodeStatus, Orchestrator, OrchestratorConfig, RunError,
};
use claraflow_workflow::{Flow, IssueCode};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

struct Fail;

#[async_trait]
impl NodeExecutor for Fail {
  async fn execute(&self, _: PortValues, _: PortValues, _: NodeContext) -> Result<Value, NodeError> {
    Err(NodeError::execution("boom"))
  }
}

struct Sleep(u64);

#[async_trait]
impl NodeExecutor for Sleep {
  async fn execute(&self, inputs: PortValues, _: PortValues, ctx: NodeContext) -> Result<Value, NodeError> {
    ctx.info("sleeping");
    tokio::time::sleep(Duration::from_millis(self.0)).await;
    Ok(json!({ "output": inputs.get("input").cloned().unwrap_or(Value::Null) }))
  }
}

fn orchestrator() -> Orchestrator {
  let registry = NodeRegistry::new(Arc::new(LuaNodeCompiler::default()));
  registry.register_executor("fail", Arc::new(Fail));
  registry.register_executor("slow", Arc::new(Sleep(2_000)));
  registry.register_executor("nap", Arc::new(Sleep(10)));
  registry.register_executor("doze", Arc::new(Sleep(300)));
  Orchestrator::new(
    Arc::new(registry),
    ExecutionLog::new(),
    OrchestratorConfig::default(),
  )
}

fn flow(value: Value) -> Flow {
  Flow::from_value(&value).unwrap()
}

fn inputs(value: Value) -> FlowInputs {
  match value {
    Value::Object(map) => map,
    _ => FlowInputs::new(),
  }
}

fn node(id: &str, node_type: &str) -> Value {
  json!({ "id": id, "type": node_type, "name": id })
}

fn edge(from: &str, to: &str) -> Value {
  json!({ "sourceNodeId": from, "targetNodeId": to, "targetPortId": "input" })
}

fn status(kind: &NodeStatus) -> &'static str {
  match kind {
    NodeStatus::Completed => "completed",
    NodeStatus::Failed { .. } => "failed",
    NodeStatus::Skipped { .. } => "skipped",
    NodeStatus::Cancelled => "cancelled",
    NodeStatus::TimedOut => "timed_out",
  }
}

#[tokio::test]
async fn test_input_to_output_passes_value_through() {
  let flow = flow(json!({
    "name": "Hello",
    "nodes": [
      { "id": "in", "type": "input", "name": "Text" },
      { "id": "out", "type": "output", "name": "Result" }
    ],
    "connections": [edge("in", "out")]
  }));

  let result = orchestrator()
    .execute(
      &flow,
      &inputs(json!({ "in": "Hello World" })),
      &ExecutionOptions::default(),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert!(result.success);
  assert_eq!(result.output("out"), Some(&json!("Hello World")));
  assert_eq!(result.output("Result"), Some(&json!("Hello World")));
  assert_eq!(result.execution_order, vec!["in", "out"]);
}

#[tokio::test]
async fn test_custom_lua_node_multiplies_bound_inputs() {
  let flow = flow(json!({
    "nodes": [
      { "id": "a", "type": "input", "name": "First", "data": { "inputType": "number" } },
      { "id": "b", "type": "input", "name": "Second", "data": { "inputType": "number" } },
      { "id": "mul", "type": "multiply", "name": "Multiply" },
      { "id": "out", "type": "output", "name": "Product" }
    ],
    "connections": [
      { "sourceNodeId": "a", "sourcePortId": "output", "targetNodeId": "mul", "targetPortId": "a" },
      { "sourceNodeId": "b", "sourcePortId": "output", "targetNodeId": "mul", "targetPortId": "b" },
      { "sourceNodeId": "mul", "sourcePortId": "result", "targetNodeId": "out", "targetPortId": "input" }
    ],
    "customNodes": [{
      "type": "multiply",
      "name": "Multiply",
      "inputs": [{ "id": "a", "required": true }, { "id": "b", "required": true }],
      "outputs": [{ "id": "result" }],
      "properties": [{ "id": "factor", "type": "number", "defaultValue": 2 }],
      "executionCode": "function execute(inputs, properties) return { result = inputs.a * inputs.b * properties.factor } end"
    }]
  }));

  // one key by id, one by name
  let result = orchestrator()
    .execute(
      &flow,
      &inputs(json!({ "a": 6, "Second": 7 })),
      &ExecutionOptions::default(),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert!(result.success, "{:?}", result.nodes);
  assert_eq!(result.output("out"), Some(&json!(84)));
}

#[tokio::test]
async fn test_failure_skips_dependents_only() {
  let flow = flow(json!({
    "nodes": [
      node("in", "input"),
      node("bad", "fail"),
      node("after-bad", "pass-through"),
      node("good", "pass-through"),
      node("out", "output")
    ],
    "connections": [
      edge("in", "bad"),
      edge("bad", "after-bad"),
      edge("in", "good"),
      edge("good", "out")
    ]
  }));

  let result = orchestrator()
    .execute(
      &flow,
      &inputs(json!({ "in": "x" })),
      &ExecutionOptions::default(),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert!(!result.success);
  match result.status("bad") {
    Some(NodeStatus::Failed { kind, error }) => {
      assert_eq!(kind, "execution");
      assert!(error.contains("boom"));
    }
    other => panic!("expected failure, got {other:?}"),
  }
  assert_eq!(
    result.status("after-bad"),
    Some(&NodeStatus::Skipped { cause: "bad".to_string() })
  );
  assert_eq!(result.status("good"), Some(&NodeStatus::Completed));
  assert_eq!(result.output("out"), Some(&json!("x")));
  assert_eq!(result.failed_nodes().count(), 1);
  assert!(result.output("after-bad").is_none());
}

#[tokio::test]
async fn test_missing_executor_is_a_node_failure() {
  let flow = flow(json!({
    "nodes": [node("ghost", "does-not-exist"), node("in", "input")],
    "connections": []
  }));

  let result = orchestrator()
    .execute(&flow, &FlowInputs::new(), &ExecutionOptions::default(), CancellationToken::new())
    .await
    .unwrap();

  assert!(!result.success);
  assert!(matches!(
    result.status("ghost"),
    Some(NodeStatus::Failed { kind, .. }) if kind == "missing_executor"
  ));
  assert_eq!(result.status("in"), Some(&NodeStatus::Completed));
}

fn broken_flow(upstream_type: &str) -> Flow {
  flow(json!({
    "nodes": [node("first", upstream_type), node("broken", "broken")],
    "connections": [edge("first", "broken")],
    "customNodes": [{ "type": "broken", "executionCode": "function execute(inputs return {} end" }]
  }))
}

#[tokio::test]
async fn test_broken_custom_node_fails_only_when_reached() {
  let orchestrator = orchestrator();

  let err = orchestrator
    .execute(
      &broken_flow("pass-through"),
      &FlowInputs::new(),
      &ExecutionOptions::default(),
      CancellationToken::new(),
    )
    .await
    .unwrap_err();
  match err {
    RunError::Compilation(err) => assert_eq!(err.node_type, "broken"),
    other => panic!("expected compilation error, got {other:?}"),
  }

  // never reached: its producer fails, so the node is skipped
  let result = orchestrator
    .execute(
      &broken_flow("fail"),
      &FlowInputs::new(),
      &ExecutionOptions::default(),
      CancellationToken::new(),
    )
    .await
    .unwrap();
  assert!(matches!(result.status("broken"), Some(NodeStatus::Skipped { .. })));
}

#[tokio::test]
async fn test_timeout_returns_partial_result() {
  let flow = flow(json!({
    "nodes": [node("quick", "nap"), node("slow", "slow"), node("out", "output")],
    "connections": [edge("quick", "slow"), edge("slow", "out")]
  }));
  let options = ExecutionOptions::default().with_timeout(Duration::from_millis(200));

  let started = std::time::Instant::now();
  let err = orchestrator()
    .execute(&flow, &FlowInputs::new(), &options, CancellationToken::new())
    .await
    .unwrap_err();
  assert!(started.elapsed() < Duration::from_millis(1_500));

  let RunError::Timeout { timeout_ms, partial } = err else {
    panic!("expected timeout");
  };
  assert_eq!(timeout_ms, 200);
  assert!(!partial.success);
  let statuses: Vec<_> = partial
    .nodes
    .iter()
    .map(|n| (n.node_id.as_str(), status(&n.status)))
    .collect();
  assert_eq!(
    statuses,
    vec![("quick", "completed"), ("slow", "timed_out"), ("out", "timed_out")]
  );
}

#[tokio::test]
async fn test_cancelled_before_start() {
  let flow = flow(json!({
    "nodes": [node("a", "pass-through"), node("b", "pass-through")],
    "connections": [edge("a", "b")]
  }));
  let cancel = CancellationToken::new();
  cancel.cancel();

  let err = orchestrator()
    .execute(&flow, &FlowInputs::new(), &ExecutionOptions::default(), cancel)
    .await
    .unwrap_err();

  let partial = err.partial().unwrap();
  assert!(partial.nodes.iter().all(|n| n.status == NodeStatus::Cancelled));
  assert_eq!(partial.nodes.len(), 2);
}

#[tokio::test]
async fn test_cancel_lets_running_node_finish() {
  let flow = flow(json!({
    "nodes": [node("quick", "nap"), node("doze", "doze"), node("out", "pass-through")],
    "connections": [edge("quick", "doze"), edge("doze", "out")]
  }));
  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(100)).await;
    trigger.cancel();
  });

  let err = orchestrator()
    .execute(&flow, &FlowInputs::new(), &ExecutionOptions::default(), cancel)
    .await
    .unwrap_err();

  let RunError::Cancelled { partial } = err else {
    panic!("expected cancellation");
  };
  assert_eq!(partial.status("quick"), Some(&NodeStatus::Completed));
  assert_eq!(partial.status("doze"), Some(&NodeStatus::Completed));
  assert_eq!(partial.status("out"), Some(&NodeStatus::Cancelled));
  assert!(partial.results.contains_key("doze"));
  assert!(!partial.success);
}

#[tokio::test]
async fn test_cycle_is_rejected() {
  let flow = flow(json!({
    "nodes": [node("a", "pass-through"), node("b", "pass-through")],
    "connections": [edge("a", "b"), edge("b", "a")]
  }));

  let err = orchestrator()
    .execute(&flow, &FlowInputs::new(), &ExecutionOptions::default(), CancellationToken::new())
    .await
    .unwrap_err();
  match err {
    RunError::Cycle { nodes } => assert!(nodes.contains(&"a".to_string())),
    other => panic!("expected cycle, got {other:?}"),
  }
}

#[tokio::test]
async fn test_strict_validation_rejects_dangling_connection() {
  let flow = flow(json!({
    "nodes": [node("in", "input"), node("out", "output")],
    "connections": [edge("in", "out"), edge("in", "nowhere")]
  }));
  let orchestrator = orchestrator();

  let err = orchestrator
    .execute(
      &flow,
      &FlowInputs::new(),
      &ExecutionOptions::default().with_strict_validation(true),
      CancellationToken::new(),
    )
    .await
    .unwrap_err();
  match err {
    RunError::Validation { report } => assert!(report.has_error(IssueCode::UnknownNode)),
    other => panic!("expected validation error, got {other:?}"),
  }

  let result = orchestrator
    .execute(&flow, &FlowInputs::new(), &ExecutionOptions::default(), CancellationToken::new())
    .await
    .unwrap();
  assert!(result.success);
}

#[tokio::test]
async fn test_run_log_is_tagged_and_filtered() {
  let flow = flow(json!({
    "nodes": [node("in", "input"), node("nap", "nap")],
    "connections": [edge("in", "nap")]
  }));
  let orchestrator = orchestrator();

  let result = orchestrator
    .execute(
      &flow,
      &inputs(json!({ "in": 1, "unknown": 2 })),
      &ExecutionOptions::default().with_log_level(LogLevel::Warn),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert!(result.logs.iter().all(|e| e.run_id.as_deref() == Some(result.run_id.as_str())));
  assert!(result.logs.iter().all(|e| e.level >= LogLevel::Warn));
  assert!(result.logs.iter().any(|e| e.message.contains("unknown")));
  assert_eq!(orchestrator.log().entries_for_run(&result.run_id).len(), result.logs.len());

  let verbose = orchestrator
    .execute(
      &flow,
      &FlowInputs::new(),
      &ExecutionOptions::default().with_log_level(LogLevel::Debug),
      CancellationToken::new(),
    )
    .await
    .unwrap();
  assert!(
    verbose
      .logs
      .iter()
      .any(|e| e.node_id.as_deref() == Some("nap") && e.message == "sleeping")
  );
}

#[tokio::test]
async fn test_validate_uses_registry() {
  let flow = flow(json!({
    "nodes": [node("in", "input"), node("x", "unregistered")],
    "connections": [edge("in", "x")]
  }));
  let report = orchestrator().validate(&flow);
  assert!(report.is_valid);
  assert!(report.has_warning(IssueCode::UnregisteredType));
}
