use std::time::Duration;

use claraflow_host_log::{LogLevel, LogSettings};
use serde::{Deserialize, Serialize};

/// Per-run options.
///
/// ```json
/// { "timeout": 5000, "sandbox": true, "enableLogging": true, "logLevel": "debug", "strictValidation": false }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionOptions {
  /// Whole-run deadline in milliseconds. `None` uses the engine default.
  #[serde(rename = "timeout", skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  /// Run custom node code with the restricted standard library.
  pub sandbox: bool,
  pub enable_logging: bool,
  pub log_level: LogLevel,
  /// Validate before running and reject flows with structural errors.
  pub strict_validation: bool,
}

impl Default for ExecutionOptions {
  fn default() -> Self {
    Self {
      timeout_ms: None,
      sandbox: true,
      enable_logging: true,
      log_level: LogLevel::Info,
      strict_validation: false,
    }
  }
}

impl ExecutionOptions {
  pub fn timeout(&self) -> Option<Duration> {
    self.timeout_ms.map(Duration::from_millis)
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
    self
  }

  pub fn with_sandbox(mut self, sandbox: bool) -> Self {
    self.sandbox = sandbox;
    self
  }

  pub fn with_log_level(mut self, level: LogLevel) -> Self {
    self.log_level = level;
    self
  }

  pub fn with_strict_validation(mut self, strict: bool) -> Self {
    self.strict_validation = strict;
    self
  }

  pub fn log_settings(&self) -> LogSettings {
    LogSettings {
      enabled: self.enable_logging,
      min_level: self.log_level,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_defaults_from_empty_object() {
    let options: ExecutionOptions = serde_json::from_value(json!({})).unwrap();
    assert_eq!(options, ExecutionOptions::default());
    assert!(options.sandbox);
    assert!(options.enable_logging);
  }

  #[test]
  fn test_camel_case_fields() {
    let options: ExecutionOptions = serde_json::from_value(json!({
      "timeout": 5000,
      "sandbox": false,
      "logLevel": "debug",
      "strictValidation": true
    }))
    .unwrap();
    assert_eq!(options.timeout(), Some(Duration::from_secs(5)));
    assert!(!options.sandbox);
    assert_eq!(options.log_level, LogLevel::Debug);
    assert!(options.strict_validation);
  }
}
