use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use claraflow_config::CustomNodeDef;
use tracing::{debug, info, warn};

use crate::builtin;
use crate::error::CompilationError;
use crate::executor::{CustomNodeCompiler, NodeExecutor};

type Compiled = Result<Arc<dyn NodeExecutor>, CompilationError>;

/// A custom node definition and its compiled executor, built on first use.
struct LazyCustomNode {
  definition: CustomNodeDef,
  compiled: OnceLock<Compiled>,
}

impl LazyCustomNode {
  fn new(definition: CustomNodeDef) -> Self {
    Self {
      definition,
      compiled: OnceLock::new(),
    }
  }

  fn get_or_compile(&self, compiler: &dyn CustomNodeCompiler) -> Compiled {
    self
      .compiled
      .get_or_init(|| {
        debug!(node_type = %self.definition.node_type, "custom_node_compiling");
        let compiled = compiler.compile(&self.definition);
        if let Err(e) = &compiled {
          warn!(node_type = %self.definition.node_type, error = %e, "custom_node_compile_failed");
        }
        compiled
      })
      .clone()
  }
}

#[derive(Clone)]
enum Entry {
  Executor(Arc<dyn NodeExecutor>),
  Custom(Arc<LazyCustomNode>),
}

/// Node type to executor mapping for one engine instance.
///
/// Reads take a shared lock and may run concurrently with other runs.
/// Custom node compilation happens outside the lock.
pub struct NodeRegistry {
  entries: RwLock<HashMap<String, Entry>>,
  compiler: Arc<dyn CustomNodeCompiler>,
}

impl NodeRegistry {
  /// Registry pre-populated with the built-in nodes.
  pub fn new(compiler: Arc<dyn CustomNodeCompiler>) -> Self {
    let registry = Self::empty(compiler);
    for (node_type, executor) in builtin::builtin_executors() {
      registry.register_executor(node_type, executor);
    }
    registry
  }

  /// Registry with no node types at all.
  pub fn empty(compiler: Arc<dyn CustomNodeCompiler>) -> Self {
    Self {
      entries: RwLock::new(HashMap::new()),
      compiler,
    }
  }

  /// Register a custom node definition, replacing any executor of that type.
  ///
  /// Compilation is deferred until a node of this type is first executed.
  pub fn register(&self, definition: CustomNodeDef) {
    let node_type = definition.node_type.clone();
    let replaced = self
      .entries
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(
        node_type.clone(),
        Entry::Custom(Arc::new(LazyCustomNode::new(definition))),
      )
      .is_some();
    info!(node_type = %node_type, replaced, "custom_node_registered");
  }

  /// Register a native executor, e.g. a model-calling node.
  pub fn register_executor(&self, node_type: impl Into<String>, executor: Arc<dyn NodeExecutor>) {
    self
      .entries
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(node_type.into(), Entry::Executor(executor));
  }

  pub fn unregister(&self, node_type: &str) -> bool {
    self
      .entries
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(node_type)
      .is_some()
  }

  pub fn has(&self, node_type: &str) -> bool {
    self
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .contains_key(node_type)
  }

  /// Executor for a node type, compiling a custom definition on first use.
  ///
  /// `Ok(None)` means the type is unknown.
  pub fn resolve(&self, node_type: &str) -> Result<Option<Arc<dyn NodeExecutor>>, CompilationError> {
    let entry = self
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(node_type)
      .cloned();
    match entry {
      None => Ok(None),
      Some(Entry::Executor(executor)) => Ok(Some(executor)),
      Some(Entry::Custom(lazy)) => lazy.get_or_compile(self.compiler.as_ref()).map(Some),
    }
  }

  /// Registered custom definition for a type, if the type is a custom node.
  pub fn definition(&self, node_type: &str) -> Option<CustomNodeDef> {
    match self
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(node_type)
    {
      Some(Entry::Custom(lazy)) => Some(lazy.definition.clone()),
      _ => None,
    }
  }

  /// All registered node types, sorted.
  pub fn node_types(&self) -> Vec<String> {
    let mut types: Vec<String> = self
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .keys()
      .cloned()
      .collect();
    types.sort();
    types
  }

  /// View used by a single run: `definitions` shadow registered types for
  /// that run only and are compiled at most once per run.
  pub fn overlay(&self, definitions: &[CustomNodeDef]) -> RunRegistry<'_> {
    let transient = definitions
      .iter()
      .map(|d| (d.node_type.clone(), LazyCustomNode::new(d.clone())))
      .collect();
    RunRegistry {
      base: self,
      transient,
    }
  }
}

/// A [`NodeRegistry`] with per-run inline definitions layered on top.
pub struct RunRegistry<'a> {
  base: &'a NodeRegistry,
  transient: HashMap<String, LazyCustomNode>,
}

impl RunRegistry<'_> {
  pub fn has(&self, node_type: &str) -> bool {
    self.transient.contains_key(node_type) || self.base.has(node_type)
  }

  pub fn resolve(&self, node_type: &str) -> Result<Option<Arc<dyn NodeExecutor>>, CompilationError> {
    match self.transient.get(node_type) {
      Some(lazy) => lazy.get_or_compile(self.base.compiler.as_ref()).map(Some),
      None => self.base.resolve(node_type),
    }
  }
}
