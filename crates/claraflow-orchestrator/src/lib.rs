//! Claraflow Orchestrator
//!
//! Executes a normalized [`Flow`](claraflow_workflow::Flow) node by node in
//! dependency order.
//!
//! A run:
//! 1. optionally validates the flow and rejects it on structural errors,
//! 2. computes the execution order (producers before consumers),
//! 3. binds caller-supplied values to `input` nodes by id or name,
//! 4. runs each node with the outputs of its producers, skipping nodes whose
//!    producers failed, until the order is exhausted, the run deadline passes
//!    or the run is cancelled.

mod binding;
mod error;
mod options;
mod orchestrator;
mod order;
mod result;

pub use error::RunError;
pub use options::ExecutionOptions;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use order::execution_order;
pub use result::{NodeOutcome, NodeStatus, RunResult};

/// Caller-supplied values keyed by input node id or name.
pub type FlowInputs = serde_json::Map<String, serde_json::Value>;
