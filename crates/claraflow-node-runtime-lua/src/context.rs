use std::time::Duration;

use claraflow_host_log::LogLevel;
use claraflow_node_runtime::NodeContext;
use mlua::{Lua, LuaSerdeExt, Table, Value as LuaValue, Variadic};

use crate::sandbox::{render_message, to_lua};

/// Build the `context` table passed as the entry point's third argument.
///
/// Functions work both as `context.info("x")` and `context:info("x")`.
pub(crate) fn build_context(lua: &Lua, ctx: &NodeContext) -> mlua::Result<Table> {
  let table = lua.create_table()?;
  table.set("node_id", ctx.node_id())?;
  table.set("flow_id", ctx.flow_id())?;
  table.set("run_id", ctx.run_id())?;
  table.set("sandboxed", ctx.sandboxed())?;

  let self_ptr = table.to_pointer() as usize;

  let levels = [
    ("log", LogLevel::Info),
    ("debug", LogLevel::Debug),
    ("info", LogLevel::Info),
    ("warn", LogLevel::Warn),
    ("error", LogLevel::Error),
  ];
  for (name, level) in levels {
    let logger = ctx.logger().clone();
    let log = lua.create_function(move |lua, args: Variadic<LuaValue>| {
      logger.log(level, render_message(lua, skip_self(&args, self_ptr)));
      Ok(())
    })?;
    table.set(name, log)?;
  }

  let cancel = ctx.cancel_token().clone();
  table.set(
    "is_cancelled",
    lua.create_function(move |_, _: Variadic<LuaValue>| Ok(cancel.is_cancelled()))?,
  )?;

  table.set(
    "sleep",
    lua.create_async_function(move |_, args: Variadic<LuaValue>| {
      let millis = sleep_millis(skip_self(&args, self_ptr));
      async move {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(())
      }
    })?,
  )?;

  table.set(
    "json_encode",
    lua.create_function(move |lua, args: Variadic<LuaValue>| {
      let value = skip_self(&args, self_ptr)
        .first()
        .cloned()
        .unwrap_or(LuaValue::Nil);
      let json: serde_json::Value = lua.from_value(value)?;
      Ok(json.to_string())
    })?,
  )?;

  table.set(
    "json_decode",
    lua.create_function(move |lua, args: Variadic<LuaValue>| {
      let text = match skip_self(&args, self_ptr).first() {
        Some(LuaValue::String(s)) => s.to_str()?.to_string(),
        _ => return Err(mlua::Error::runtime("json_decode expects a string")),
      };
      let json: serde_json::Value = serde_json::from_str(&text).map_err(mlua::Error::external)?;
      to_lua(lua, &json)
    })?,
  )?;

  Ok(table)
}

/// Drop the leading `context` argument of a method-style call.
fn skip_self(args: &[LuaValue], self_ptr: usize) -> &[LuaValue] {
  match args.first() {
    Some(LuaValue::Table(t)) if t.to_pointer() as usize == self_ptr => &args[1..],
    _ => args,
  }
}

fn sleep_millis(args: &[LuaValue]) -> u64 {
  match args.first() {
    Some(LuaValue::Integer(i)) => (*i).max(0) as u64,
    Some(LuaValue::Number(n)) if n.is_finite() => n.max(0.0) as u64,
    _ => 0,
  }
}
