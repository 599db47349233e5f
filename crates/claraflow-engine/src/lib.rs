//! Claraflow Engine
//!
//! Executes flows exported by the Clara flow editor.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        FlowEngine                           │
//! │  - normalize(document) → Flow                               │
//! │  - execute_flow / execute_batch / execute_flows             │
//! │  - owns the NodeRegistry and the ExecutionLog               │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Orchestrator                          │
//! │  - execute(flow, inputs, options, cancel) → RunResult       │
//! │  - ordering, input binding, skip / timeout / cancel         │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 NodeExecutor (per node type)                │
//! │  - built-in nodes                                           │
//! │  - custom nodes compiled from Lua source                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use claraflow_engine::{ExecutionOptions, FlowEngine};
//!
//! let engine = FlowEngine::new();
//! let result = engine
//!   .execute_flow(&document, inputs, ExecutionOptions::default())
//!   .await?;
//! println!("{}", result.results["output-node"]);
//! ```

mod engine;
mod error;

pub use engine::{EngineConfig, FlowEngine};
pub use error::EngineError;

pub use claraflow_config::{CustomNodeDef, FormatError};
pub use claraflow_host_log::{LogEntry, LogLevel};
pub use claraflow_node_runtime::{NodeContext, NodeError, NodeExecutor, NodeRegistry, PortValues};
pub use claraflow_node_runtime_lua::LuaRuntimeConfig;
pub use claraflow_orchestrator::{
  ExecutionOptions, FlowInputs, NodeOutcome, NodeStatus, RunError, RunResult,
};
pub use claraflow_workflow::{Flow, IssueCode, ValidationIssue, ValidationReport};
