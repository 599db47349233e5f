use std::sync::Arc;
use std::time::Instant;

use claraflow_config::CustomNodeDef;
use claraflow_node_runtime::{CompilationError, CustomNodeCompiler, NodeExecutor};
use tracing::info;

use crate::config::LuaRuntimeConfig;
use crate::executor::{LuaNodeExecutor, Script};
use crate::sandbox;

/// Compiles custom node definitions into [`LuaNodeExecutor`]s.
///
/// Compilation only checks size and syntax. The chunk's top level runs per
/// invocation, in a state built for that run's sandbox setting, so the entry
/// point is located there.
#[derive(Debug, Clone, Default)]
pub struct LuaNodeCompiler {
  config: LuaRuntimeConfig,
}

impl LuaNodeCompiler {
  pub fn new(config: LuaRuntimeConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &LuaRuntimeConfig {
    &self.config
  }

  fn check(&self, script: &Script) -> Result<(), CompilationError> {
    let fail = |message: String| CompilationError::new(&script.node_type, message);

    if script.source.trim().is_empty() {
      return Err(fail("executionCode is empty".to_string()));
    }
    if script.source.len() > self.config.max_source_len {
      return Err(fail(format!(
        "executionCode is {} bytes, limit is {}",
        script.source.len(),
        self.config.max_source_len
      )));
    }

    let deadline = Instant::now() + self.config.timeout;
    let lua = sandbox::new_state(&self.config, true, deadline).map_err(|e| fail(e.to_string()))?;

    lua
      .load(script.source.as_str())
      .set_name(script.chunk_name.as_str())
      .into_function()
      .map(|_| ())
      .map_err(|e| fail(e.to_string()))
  }
}

impl CustomNodeCompiler for LuaNodeCompiler {
  fn compile(&self, definition: &CustomNodeDef) -> Result<Arc<dyn NodeExecutor>, CompilationError> {
    let script = Script::new(definition);
    self.check(&script)?;
    info!(node_type = %script.node_type, "custom_node_compiled");
    Ok(Arc::new(LuaNodeExecutor::new(script, self.config.clone())))
  }
}
