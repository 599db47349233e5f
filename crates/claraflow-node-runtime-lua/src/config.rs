use std::time::Duration;

/// Resource limits applied to every Lua invocation.
#[derive(Debug, Clone)]
pub struct LuaRuntimeConfig {
  /// Wall-clock limit of a single invocation.
  pub timeout: Duration,
  /// Upper bound on memory allocated by one Lua state, in bytes.
  pub memory_limit: usize,
  /// How many VM instructions run between deadline checks.
  pub hook_instruction_interval: u32,
  /// Largest accepted `executionCode`, in bytes.
  pub max_source_len: usize,
}

impl Default for LuaRuntimeConfig {
  fn default() -> Self {
    Self {
      timeout: Duration::from_secs(30),
      memory_limit: 64 * 1024 * 1024,
      hook_instruction_interval: 1_000,
      max_source_len: 256 * 1024,
    }
  }
}
