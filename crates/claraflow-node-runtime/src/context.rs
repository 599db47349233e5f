use claraflow_host_log::{LogLevel, NodeLogger, RunLog};
use tokio_util::sync::CancellationToken;

/// Per-invocation context handed to a [`NodeExecutor`](crate::NodeExecutor).
///
/// Contexts are created fresh for every node call and must not be kept past
/// it. Cloning shares the logger and the cancellation signal.
#[derive(Debug, Clone)]
pub struct NodeContext {
  logger: NodeLogger,
  cancel: CancellationToken,
  sandboxed: bool,
}

impl NodeContext {
  pub fn new(logger: NodeLogger, cancel: CancellationToken, sandboxed: bool) -> Self {
    Self {
      logger,
      cancel,
      sandboxed,
    }
  }

  /// Context outside of any run, for calling an executor directly.
  pub fn detached(node_id: impl Into<String>) -> Self {
    let run = RunLog::detached("detached", "detached");
    Self::new(run.node(node_id), CancellationToken::new(), true)
  }

  pub fn node_id(&self) -> &str {
    self.logger.node_id()
  }

  pub fn run_id(&self) -> &str {
    self.logger.run_id()
  }

  pub fn flow_id(&self) -> &str {
    self.logger.flow_id()
  }

  /// Whether custom code must run with the restricted standard library.
  pub fn sandboxed(&self) -> bool {
    self.sandboxed
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancel.is_cancelled()
  }

  pub fn cancel_token(&self) -> &CancellationToken {
    &self.cancel
  }

  pub fn logger(&self) -> &NodeLogger {
    &self.logger
  }

  pub fn log(&self, level: LogLevel, message: impl Into<String>) {
    self.logger.log(level, message);
  }

  pub fn debug(&self, message: impl Into<String>) {
    self.logger.debug(message);
  }

  pub fn info(&self, message: impl Into<String>) {
    self.logger.info(message);
  }

  pub fn warn(&self, message: impl Into<String>) {
    self.logger.warn(message);
  }

  pub fn error(&self, message: impl Into<String>) {
    self.logger.error(message);
  }
}
