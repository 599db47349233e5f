use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::level::LogLevel;

/// A single log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
  pub timestamp: DateTime<Utc>,
  pub level: LogLevel,
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub node_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub run_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<serde_json::Value>,
}

impl LogEntry {
  pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
    Self {
      timestamp: Utc::now(),
      level,
      message: message.into(),
      node_id: None,
      run_id: None,
      data: None,
    }
  }

  pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
    self.node_id = Some(node_id.into());
    self
  }

  pub fn with_run(mut self, run_id: impl Into<String>) -> Self {
    self.run_id = Some(run_id.into());
    self
  }

  pub fn with_data(mut self, data: serde_json::Value) -> Self {
    self.data = Some(data);
    self
  }

  /// Emit this entry as a `tracing` event.
  pub(crate) fn emit(&self) {
    let run_id = self.run_id.as_deref().unwrap_or("-");
    let node_id = self.node_id.as_deref().unwrap_or("-");
    match self.level {
      LogLevel::Debug => {
        tracing::debug!(run_id = %run_id, node_id = %node_id, "{}", self.message)
      }
      LogLevel::Info => {
        tracing::info!(run_id = %run_id, node_id = %node_id, "{}", self.message)
      }
      LogLevel::Warn => {
        tracing::warn!(run_id = %run_id, node_id = %node_id, "{}", self.message)
      }
      LogLevel::Error => {
        tracing::error!(run_id = %run_id, node_id = %node_id, "{}", self.message)
      }
    }
  }
}
