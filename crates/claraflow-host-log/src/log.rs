use std::sync::{Arc, Mutex, PoisonError};

use crate::entry::LogEntry;
use crate::level::LogLevel;

/// Engine-wide log shared by all runs of one engine instance.
///
/// Cloning is cheap and every clone appends to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
  entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl ExecutionLog {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append an entry and emit it as a `tracing` event.
  pub fn record(&self, entry: LogEntry) {
    entry.emit();
    self.append(entry);
  }

  pub(crate) fn append(&self, entry: LogEntry) {
    self
      .entries
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(entry);
  }

  pub fn log(&self, level: LogLevel, message: impl Into<String>) {
    self.record(LogEntry::new(level, message));
  }

  /// Snapshot of every entry recorded so far.
  pub fn entries(&self) -> Vec<LogEntry> {
    self
      .entries
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  /// Entries recorded for one run.
  pub fn entries_for_run(&self, run_id: &str) -> Vec<LogEntry> {
    self
      .entries
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .iter()
      .filter(|e| e.run_id.as_deref() == Some(run_id))
      .cloned()
      .collect()
  }

  pub fn len(&self) -> usize {
    self
      .entries
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn clear(&self) {
    self
      .entries
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clear();
  }
}
