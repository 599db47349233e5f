use std::time::Instant;

use async_trait::async_trait;
use claraflow_config::{CustomNodeDef, PortDef};
use claraflow_node_runtime::{NodeContext, NodeError, NodeExecutor, PortValues};
use mlua::{Lua, LuaSerdeExt, Value as LuaValue, Variadic};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::LuaRuntimeConfig;
use crate::context::build_context;
use crate::sandbox::{self, DEADLINE_EXCEEDED, render_message, to_lua};

/// The parts of a custom node definition needed at call time.
#[derive(Debug)]
pub(crate) struct Script {
  pub(crate) node_type: String,
  pub(crate) chunk_name: String,
  pub(crate) source: String,
  defaults: PortValues,
  required_inputs: Vec<String>,
  declared_outputs: Vec<String>,
}

impl Script {
  pub(crate) fn new(definition: &CustomNodeDef) -> Self {
    Self {
      node_type: definition.node_type.clone(),
      chunk_name: format!("={}", definition.node_type),
      source: definition.execution_code.clone(),
      defaults: definition.property_defaults(),
      required_inputs: port_keys(&definition.inputs, true),
      declared_outputs: port_keys(&definition.outputs, false),
    }
  }

  /// Definition defaults, overridden by the node's data, overridden again by
  /// `data.properties` when that is an object.
  fn merge_properties(&self, data: PortValues) -> PortValues {
    let mut merged = self.defaults.clone();
    let nested = match data.get("properties") {
      Some(Value::Object(nested)) => Some(nested.clone()),
      _ => None,
    };
    merged.extend(data);
    if let Some(nested) = nested {
      merged.extend(nested);
    }
    merged
  }
}

fn port_keys(ports: &[PortDef], required_only: bool) -> Vec<String> {
  ports
    .iter()
    .filter(|p| !required_only || p.required)
    .filter_map(|p| p.key().map(str::to_string))
    .collect()
}

/// Executes one compiled custom node. Each call runs in a fresh Lua state.
pub struct LuaNodeExecutor {
  script: Script,
  config: LuaRuntimeConfig,
}

impl LuaNodeExecutor {
  pub(crate) fn new(script: Script, config: LuaRuntimeConfig) -> Self {
    Self { script, config }
  }

  async fn invoke(
    &self,
    inputs: PortValues,
    properties: PortValues,
    ctx: &NodeContext,
    deadline: Instant,
  ) -> mlua::Result<(Lua, LuaValue)> {
    let lua = sandbox::new_state(&self.config, ctx.sandboxed(), deadline)?;

    let logger = ctx.logger().clone();
    let print = lua.create_function(move |lua, args: Variadic<LuaValue>| {
      logger.info(render_message(lua, &args));
      Ok(())
    })?;
    lua.globals().set("print", print)?;

    let Some(entry) = sandbox::load_entry(&lua, &self.script.chunk_name, &self.script.source)? else {
      return Err(mlua::Error::runtime(format!(
        "executionCode must define `{}(inputs, properties, context)` or return a function",
        sandbox::ENTRY_POINT
      )));
    };

    let inputs = to_lua(&lua, &Value::Object(inputs))?;
    let properties = to_lua(&lua, &Value::Object(self.script.merge_properties(properties)))?;
    let context = build_context(&lua, ctx)?;

    let returned: LuaValue = entry.call_async((inputs, properties, context)).await?;
    Ok((lua, returned))
  }

  fn check_inputs(&self, inputs: &PortValues) -> Result<(), NodeError> {
    let missing: Vec<&str> = self
      .script
      .required_inputs
      .iter()
      .filter(|port| inputs.get(port.as_str()).is_none_or(Value::is_null))
      .map(String::as_str)
      .collect();
    if missing.is_empty() {
      Ok(())
    } else {
      Err(NodeError::invalid_input(format!(
        "missing required input(s): {}",
        missing.join(", ")
      )))
    }
  }

  fn convert_output(&self, lua: &Lua, returned: LuaValue, ctx: &NodeContext) -> Result<Value, NodeError> {
    if !matches!(returned, LuaValue::Table(_)) {
      return Err(NodeError::invalid_output(format!(
        "custom node must return a table keyed by output port, got {}",
        returned.type_name()
      )));
    }
    let value: Value = lua
      .from_value(returned)
      .map_err(|e| NodeError::invalid_output(format!("returned table is not JSON compatible: {e}")))?;
    let Value::Object(outputs) = value else {
      return Err(NodeError::invalid_output(
        "custom node must return a table keyed by output port, got a list",
      ));
    };

    if !self.script.declared_outputs.is_empty() {
      for port in outputs.keys() {
        if !self.script.declared_outputs.contains(port) {
          ctx.warn(format!("returned undeclared output port '{port}'"));
        }
      }
    }

    Ok(Value::Object(outputs))
  }
}

#[async_trait]
impl NodeExecutor for LuaNodeExecutor {
  #[instrument(
    name = "lua_node",
    skip(self, inputs, properties, ctx),
    fields(node_type = %self.script.node_type, node_id = %ctx.node_id())
  )]
  async fn execute(
    &self,
    inputs: PortValues,
    properties: PortValues,
    ctx: NodeContext,
  ) -> Result<Value, NodeError> {
    self.check_inputs(&inputs)?;

    let limit = self.config.timeout;
    let limit_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
    let started = Instant::now();
    let deadline = started + limit;

    let outcome = tokio::time::timeout(limit, self.invoke(inputs, properties, &ctx, deadline)).await;
    let (lua, returned) = match outcome {
      Err(_) => {
        warn!(limit_ms, "lua_node_timeout");
        return Err(NodeError::Timeout { limit_ms });
      }
      Ok(Err(e)) => {
        if Instant::now() >= deadline || e.to_string().contains(DEADLINE_EXCEEDED) {
          warn!(limit_ms, "lua_node_timeout");
          return Err(NodeError::Timeout { limit_ms });
        }
        return Err(NodeError::execution(describe(&e)));
      }
      Ok(Ok(result)) => result,
    };

    let output = self.convert_output(&lua, returned, &ctx)?;
    debug!(duration_ms = started.elapsed().as_millis() as u64, "lua_node_completed");
    Ok(output)
  }
}

/// Error text without the Lua stack traceback.
fn describe(error: &mlua::Error) -> String {
  let text = match error {
    mlua::Error::MemoryError(message) => format!("memory limit exceeded: {message}"),
    other => other.to_string(),
  };
  match text.split_once("\nstack traceback:") {
    Some((head, _)) => head.trim_end().to_string(),
    None => text,
  }
}
