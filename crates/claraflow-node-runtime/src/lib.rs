//! Claraflow Node Runtime
//!
//! Everything a node needs to run, independent of how its logic is provided:
//!
//! - [`NodeExecutor`]: the calling contract shared by built-in, collaborator
//!   and custom nodes.
//! - [`NodeContext`]: the per-invocation context handed to an executor.
//! - [`NodeRegistry`]: maps node types to executors. Custom node definitions
//!   are compiled lazily through a [`CustomNodeCompiler`] and cached by type.
//! - [`builtin`]: the nodes every engine ships with.

pub mod builtin;
mod context;
mod error;
mod executor;
mod registry;

pub use context::NodeContext;
pub use error::{CompilationError, NodeError};
pub use executor::{CustomNodeCompiler, NodeExecutor, PortValues};
pub use registry::{NodeRegistry, RunRegistry};
