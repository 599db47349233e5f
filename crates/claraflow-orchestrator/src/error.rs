//! Run error types.

use claraflow_node_runtime::CompilationError;
use claraflow_workflow::ValidationReport;

use crate::result::RunResult;

/// Errors that end a run.
///
/// Node failures are not run errors; they are recorded in the
/// [`RunResult`] and the run continues.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
  /// A custom node reached during the run failed to compile.
  #[error(transparent)]
  Compilation(#[from] CompilationError),

  /// The connections form a cycle.
  #[error("flow contains a cycle: {}", .nodes.join(" -> "))]
  Cycle { nodes: Vec<String> },

  /// Strict validation found structural errors.
  #[error("flow failed validation with {} error(s)", .report.errors.len())]
  Validation { report: Box<ValidationReport> },

  /// The run deadline passed.
  #[error("flow execution timed out after {timeout_ms}ms")]
  Timeout {
    timeout_ms: u64,
    partial: Box<RunResult>,
  },

  /// The run was cancelled by the caller.
  #[error("flow execution cancelled")]
  Cancelled { partial: Box<RunResult> },
}

impl RunError {
  /// What the run produced before it was cut short.
  pub fn partial(&self) -> Option<&RunResult> {
    match self {
      RunError::Timeout { partial, .. } | RunError::Cancelled { partial } => Some(partial),
      _ => None,
    }
  }
}
