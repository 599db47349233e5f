//! Claraflow Host Log
//!
//! Structured log used by the engine and exposed to node code.
//!
//! - [`ExecutionLog`] is the engine-wide log. It is shared by every run and
//!   can be queried and cleared.
//! - [`RunLog`] is created per run. It captures the run's own entries, so
//!   concurrent runs never see each other's output, and forwards them to the
//!   engine log.
//! - [`NodeLogger`] is a [`RunLog`] tagged with a node id, handed to node
//!   code through its execution context.
//!
//! Every recorded entry is also emitted as a `tracing` event.

mod entry;
mod level;
mod log;
mod run;

pub use entry::LogEntry;
pub use level::{LogLevel, ParseLogLevelError};
pub use log::ExecutionLog;
pub use run::{LogSettings, NodeLogger, RunLog};
