use std::sync::Arc;

use async_trait::async_trait;
use claraflow_config::CustomNodeDef;
use serde_json::Value;

use crate::context::NodeContext;
use crate::error::{CompilationError, NodeError};

/// Values keyed by port id.
pub type PortValues = serde_json::Map<String, Value>;

/// The calling contract for every node type.
///
/// `inputs` maps input port ids to the values produced upstream.
/// `properties` is the node's configuration. The returned value is usually an
/// object keyed by output port id; anything else is handed downstream whole.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
  async fn execute(
    &self,
    inputs: PortValues,
    properties: PortValues,
    ctx: NodeContext,
  ) -> Result<Value, NodeError>;
}

/// Turns a custom node definition into an executor.
///
/// Called at most once per registered type; the result, success or failure,
/// is cached by the registry.
pub trait CustomNodeCompiler: Send + Sync {
  fn compile(&self, definition: &CustomNodeDef) -> Result<Arc<dyn NodeExecutor>, CompilationError>;
}
