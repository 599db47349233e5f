use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::entry::LogEntry;
use crate::level::LogLevel;
use crate::log::ExecutionLog;

/// Per-run filter applied before an entry is recorded anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSettings {
  pub enabled: bool,
  pub min_level: LogLevel,
}

impl Default for LogSettings {
  fn default() -> Self {
    Self {
      enabled: true,
      min_level: LogLevel::Info,
    }
  }
}

impl LogSettings {
  pub fn allows(&self, level: LogLevel) -> bool {
    self.enabled && level >= self.min_level
  }
}

#[derive(Debug)]
struct RunLogInner {
  run_id: String,
  flow_id: String,
  settings: LogSettings,
  entries: Mutex<Vec<LogEntry>>,
  sink: ExecutionLog,
}

/// Log of a single run.
///
/// Entries are tagged with the run id, kept locally for the run result, and
/// forwarded to the engine-wide [`ExecutionLog`].
#[derive(Debug, Clone)]
pub struct RunLog {
  inner: Arc<RunLogInner>,
}

impl RunLog {
  pub fn new(
    sink: ExecutionLog,
    run_id: impl Into<String>,
    flow_id: impl Into<String>,
    settings: LogSettings,
  ) -> Self {
    Self {
      inner: Arc::new(RunLogInner {
        run_id: run_id.into(),
        flow_id: flow_id.into(),
        settings,
        entries: Mutex::new(Vec::new()),
        sink,
      }),
    }
  }

  /// A run log that is not attached to any engine.
  pub fn detached(run_id: impl Into<String>, flow_id: impl Into<String>) -> Self {
    Self::new(
      ExecutionLog::new(),
      run_id,
      flow_id,
      LogSettings {
        enabled: true,
        min_level: LogLevel::Debug,
      },
    )
  }

  pub fn run_id(&self) -> &str {
    &self.inner.run_id
  }

  pub fn flow_id(&self) -> &str {
    &self.inner.flow_id
  }

  pub fn record(&self, entry: LogEntry) {
    if !self.inner.settings.allows(entry.level) {
      return;
    }
    let entry = entry.with_run(self.inner.run_id.clone());
    entry.emit();
    self
      .inner
      .entries
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(entry.clone());
    self.inner.sink.append(entry);
  }

  pub fn log(&self, level: LogLevel, message: impl Into<String>) {
    self.record(LogEntry::new(level, message));
  }

  pub fn log_with_data(&self, level: LogLevel, message: impl Into<String>, data: serde_json::Value) {
    self.record(LogEntry::new(level, message).with_data(data));
  }

  pub fn debug(&self, message: impl Into<String>) {
    self.log(LogLevel::Debug, message);
  }

  pub fn info(&self, message: impl Into<String>) {
    self.log(LogLevel::Info, message);
  }

  pub fn warn(&self, message: impl Into<String>) {
    self.log(LogLevel::Warn, message);
  }

  pub fn error(&self, message: impl Into<String>) {
    self.log(LogLevel::Error, message);
  }

  /// Logger tagged with a node id.
  pub fn node(&self, node_id: impl Into<String>) -> NodeLogger {
    NodeLogger {
      run: self.clone(),
      node_id: node_id.into(),
    }
  }

  /// Snapshot of this run's entries.
  pub fn entries(&self) -> Vec<LogEntry> {
    self
      .inner
      .entries
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }
}

/// Node-scoped view of a [`RunLog`].
#[derive(Debug, Clone)]
pub struct NodeLogger {
  run: RunLog,
  node_id: String,
}

impl NodeLogger {
  pub fn node_id(&self) -> &str {
    &self.node_id
  }

  pub fn run_id(&self) -> &str {
    self.run.run_id()
  }

  pub fn flow_id(&self) -> &str {
    self.run.flow_id()
  }

  pub fn log(&self, level: LogLevel, message: impl Into<String>) {
    self
      .run
      .record(LogEntry::new(level, message).with_node(self.node_id.clone()));
  }

  pub fn log_with_data(&self, level: LogLevel, message: impl Into<String>, data: serde_json::Value) {
    self.run.record(
      LogEntry::new(level, message)
        .with_node(self.node_id.clone())
        .with_data(data),
    );
  }

  pub fn debug(&self, message: impl Into<String>) {
    self.log(LogLevel::Debug, message);
  }

  pub fn info(&self, message: impl Into<String>) {
    self.log(LogLevel::Info, message);
  }

  pub fn warn(&self, message: impl Into<String>) {
    self.log(LogLevel::Warn, message);
  }

  pub fn error(&self, message: impl Into<String>) {
    self.log(LogLevel::Error, message);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_run_entries_are_tagged_and_forwarded() {
    let sink = ExecutionLog::new();
    let run = RunLog::new(sink.clone(), "run-1", "flow-1", LogSettings::default());

    run.info("started");
    run.node("multiply").warn("factor missing");

    let entries = run.entries();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.run_id.as_deref() == Some("run-1")));
    assert_eq!(entries[1].node_id.as_deref(), Some("multiply"));
    assert_eq!(sink.entries(), entries);
  }

  #[test]
  fn test_runs_are_isolated() {
    let sink = ExecutionLog::new();
    let a = RunLog::new(sink.clone(), "a", "flow", LogSettings::default());
    let b = RunLog::new(sink.clone(), "b", "flow", LogSettings::default());

    a.info("from a");
    b.info("from b");

    assert_eq!(a.entries().len(), 1);
    assert_eq!(b.entries()[0].message, "from b");
    assert_eq!(sink.len(), 2);
  }

  #[test]
  fn test_level_filter() {
    let settings = LogSettings {
      enabled: true,
      min_level: LogLevel::Warn,
    };
    let run = RunLog::new(ExecutionLog::new(), "r", "f", settings);
    run.debug("hidden");
    run.info("hidden");
    run.error("shown");
    assert_eq!(run.entries().len(), 1);
  }

  #[test]
  fn test_disabled_logging_records_nothing() {
    let sink = ExecutionLog::new();
    let settings = LogSettings {
      enabled: false,
      min_level: LogLevel::Debug,
    };
    let run = RunLog::new(sink.clone(), "r", "f", settings);
    run.error("dropped");
    assert!(run.entries().is_empty());
    assert!(sink.is_empty());
  }
}
