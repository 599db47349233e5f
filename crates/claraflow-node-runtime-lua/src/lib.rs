//! Claraflow Lua Node Runtime
//!
//! Runs custom node definitions whose `executionCode` is Lua 5.4 source.
//!
//! The code defines its entry point either as a global
//! `function execute(inputs, properties, context) ... end` or by returning a
//! function from the chunk. The entry point must return a table keyed by
//! output port id:
//!
//! ```lua
//! function execute(inputs, properties, context)
//!   context.info("multiplying")
//!   return { result = inputs.a * inputs.b * properties.factor }
//! end
//! ```
//!
//! Every invocation gets a fresh Lua state, so nothing leaks between calls.
//! Sandboxed invocations only see `table`, `string`, `math`, `utf8` and
//! `coroutine` plus the base library without `load`, `loadfile`, `dofile`,
//! `require` and `collectgarbage`.

mod compiler;
mod config;
mod context;
mod executor;
mod sandbox;

pub use compiler::LuaNodeCompiler;
pub use config::LuaRuntimeConfig;
pub use executor::LuaNodeExecutor;
