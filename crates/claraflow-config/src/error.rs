use thiserror::Error;

use crate::document::DocumentShape;

/// Errors raised while reading a flow document.
///
/// All of these are fatal for the call that produced them: nothing has been
/// executed yet when a format error is returned.
#[derive(Debug, Error)]
pub enum FormatError {
  #[error("invalid JSON: {0}")]
  Json(#[from] serde_json::Error),

  #[error("flow document must be a JSON object, found {found}")]
  NotAnObject { found: &'static str },

  #[error("unrecognized flow document shape (top-level keys: {keys})")]
  UnrecognizedShape { keys: String },

  #[error("unsupported export format '{format}'")]
  UnsupportedFormat { format: String },

  #[error("malformed {shape}: {source}")]
  Malformed {
    shape: DocumentShape,
    #[source]
    source: serde_json::Error,
  },

  #[error("node '{node_id}' declares a port with neither id nor name")]
  UnnamedPort { node_id: String },
}
