use thiserror::Error;

/// Failure of a single node invocation.
///
/// Node errors are local to the node: the run continues with every branch
/// that does not depend on the failed node.
#[derive(Debug, Clone, Error)]
pub enum NodeError {
  #[error("no executor registered for node type '{node_type}'")]
  MissingExecutor { node_type: String },

  #[error("invalid input: {message}")]
  InvalidInput { message: String },

  #[error("execution failed: {message}")]
  Execution { message: String },

  #[error("invalid output: {message}")]
  InvalidOutput { message: String },

  #[error("node exceeded its {limit_ms}ms time limit")]
  Timeout { limit_ms: u64 },
}

impl NodeError {
  pub fn execution(message: impl Into<String>) -> Self {
    NodeError::Execution {
      message: message.into(),
    }
  }

  pub fn invalid_input(message: impl Into<String>) -> Self {
    NodeError::InvalidInput {
      message: message.into(),
    }
  }

  pub fn invalid_output(message: impl Into<String>) -> Self {
    NodeError::InvalidOutput {
      message: message.into(),
    }
  }

  /// Stable machine-readable name of the variant.
  pub fn kind(&self) -> &'static str {
    match self {
      NodeError::MissingExecutor { .. } => "missing_executor",
      NodeError::InvalidInput { .. } => "invalid_input",
      NodeError::Execution { .. } => "execution",
      NodeError::InvalidOutput { .. } => "invalid_output",
      NodeError::Timeout { .. } => "timeout",
    }
  }
}

/// A custom node definition whose source could not be turned into an executor.
///
/// Raised the first time a node of that type is reached, and fatal for the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to compile custom node '{node_type}': {message}")]
pub struct CompilationError {
  pub node_type: String,
  pub message: String,
}

impl CompilationError {
  pub fn new(node_type: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      node_type: node_type.into(),
      message: message.into(),
    }
  }
}
