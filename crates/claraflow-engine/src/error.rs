use claraflow_config::FormatError;
use claraflow_orchestrator::{RunError, RunResult};

/// Errors returned by [`FlowEngine`](crate::FlowEngine).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  /// The document is not an accepted flow export.
  #[error("invalid flow document: {0}")]
  Format(#[from] FormatError),

  #[error(transparent)]
  Run(#[from] RunError),
}

impl EngineError {
  /// Partial result of a run cut short by its deadline or by cancellation.
  pub fn partial(&self) -> Option<&RunResult> {
    match self {
      EngineError::Run(err) => err.partial(),
      EngineError::Format(_) => None,
    }
  }
}
