use std::time::Instant;

use mlua::{
  Function, HookTriggers, Lua, LuaOptions, LuaSerdeExt, SerializeOptions, StdLib,
  Value as LuaValue, Variadic, VmState,
};

use crate::config::LuaRuntimeConfig;

/// Name of the global entry point.
pub(crate) const ENTRY_POINT: &str = "execute";

/// Error raised from the instruction hook once the deadline has passed.
pub(crate) const DEADLINE_EXCEEDED: &str = "custom node exceeded its time limit";

const BLOCKED_GLOBALS: &[&str] = &["dofile", "loadfile", "load", "require", "collectgarbage"];

/// Create a Lua state for one invocation.
///
/// `print` is routed to `tracing`; callers with a node logger replace it.
pub(crate) fn new_state(
  config: &LuaRuntimeConfig,
  sandboxed: bool,
  deadline: Instant,
) -> mlua::Result<Lua> {
  let libs = if sandboxed {
    StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8 | StdLib::COROUTINE
  } else {
    StdLib::ALL_SAFE
  };
  let lua = Lua::new_with(libs, LuaOptions::new())?;
  lua.set_memory_limit(config.memory_limit)?;

  lua.set_hook(
    HookTriggers::new().every_nth_instruction(config.hook_instruction_interval),
    move |_lua, _debug| {
      if Instant::now() >= deadline {
        Err(mlua::Error::runtime(DEADLINE_EXCEEDED))
      } else {
        Ok(VmState::Continue)
      }
    },
  );

  let globals = lua.globals();
  if sandboxed {
    for name in BLOCKED_GLOBALS {
      globals.raw_set(*name, LuaValue::Nil)?;
    }
  }
  let print = lua.create_function(|lua, args: Variadic<LuaValue>| {
    tracing::debug!("{}", render_message(lua, &args));
    Ok(())
  })?;
  globals.set("print", print)?;

  Ok(lua)
}

/// Run the chunk and find its entry point.
///
/// A function returned by the chunk wins over a global `execute`.
pub(crate) fn load_entry(lua: &Lua, chunk_name: &str, source: &str) -> mlua::Result<Option<Function>> {
  let returned: LuaValue = lua.load(source).set_name(chunk_name).eval()?;
  if let LuaValue::Function(entry) = returned {
    return Ok(Some(entry));
  }
  let entry: Option<Function> = lua.globals().get(ENTRY_POINT)?;
  Ok(entry)
}

/// Convert JSON into Lua. JSON `null` becomes `nil`.
pub(crate) fn to_lua(lua: &Lua, value: &serde_json::Value) -> mlua::Result<LuaValue> {
  let options = SerializeOptions::new()
    .serialize_none_to_null(false)
    .serialize_unit_to_null(false);
  lua.to_value_with(value, options)
}

/// Join values the way `print` does, with tables rendered as JSON.
pub(crate) fn render_message(lua: &Lua, values: &[LuaValue]) -> String {
  values
    .iter()
    .map(|value| match value {
      LuaValue::Nil => "nil".to_string(),
      LuaValue::Boolean(b) => b.to_string(),
      LuaValue::Integer(i) => i.to_string(),
      LuaValue::Number(n) => n.to_string(),
      LuaValue::String(s) => s.to_string_lossy().to_string(),
      other => lua
        .from_value::<serde_json::Value>(other.clone())
        .map(|json| json.to_string())
        .unwrap_or_else(|_| format!("<{}>", other.type_name())),
    })
    .collect::<Vec<_>>()
    .join(" ")
}
