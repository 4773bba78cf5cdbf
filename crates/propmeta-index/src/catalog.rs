//! Delegate cache over a type resolver, plus query cancellation.

use crate::class_node::ClassNode;
use crate::error::ResolveError;
use crate::resolver::TypeResolver;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between a query and its caller.
///
/// Checked before every call into the type resolver and at each descent step.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the token has fired.
    pub fn check(&self) -> Result<(), ResolveError> {
        if self.is_cancelled() {
            Err(ResolveError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Class metadata nodes keyed by declared type name.
///
/// Successful resolutions are cached so structurally identical delegates
/// are shared. Failures are not cached: a type that becomes resolvable later
/// is picked up on the next request. `invalidate` drops a cached entry.
pub struct TypeCatalog {
    resolver: Arc<dyn TypeResolver>,
    delegates: DashMap<String, Arc<ClassNode>>,
}

impl TypeCatalog {
    pub fn new(resolver: Arc<dyn TypeResolver>) -> Self {
        TypeCatalog {
            resolver,
            delegates: DashMap::new(),
        }
    }

    /// Class node for `type_name`, resolving and caching it on first use.
    pub fn node_for(
        &self,
        type_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Arc<ClassNode>>, ResolveError> {
        if let Some(node) = self.delegates.get(type_name).map(|r| r.value().clone()) {
            return Ok(Some(node));
        }

        cancel.check()?;

        match self.resolver.resolve(type_name) {
            Some(descriptor) => {
                let node = self
                    .delegates
                    .entry(type_name.to_string())
                    .or_insert_with(|| Arc::new(ClassNode::new(descriptor)))
                    .value()
                    .clone();
                Ok(Some(node))
            }
            None => {
                tracing::debug!("Type not resolvable: {}", type_name);
                Ok(None)
            }
        }
    }

    /// Drop the cached node for one type name.
    pub fn invalidate(&self, type_name: &str) {
        self.delegates.remove(type_name);
    }

    /// Drop every cached node.
    pub fn invalidate_all(&self) {
        self.delegates.clear();
    }

    /// Number of cached nodes.
    pub fn cached_len(&self) -> usize {
        self.delegates.len()
    }
}

/// Everything a traversal step needs besides the node itself.
#[derive(Clone, Copy)]
pub struct ResolveCx<'a> {
    pub catalog: &'a TypeCatalog,
    pub cancel: &'a CancellationToken,
}

impl<'a> ResolveCx<'a> {
    pub fn new(catalog: &'a TypeCatalog, cancel: &'a CancellationToken) -> Self {
        ResolveCx { catalog, cancel }
    }

    /// Class node for `type_name`; unresolvable names become an unknown leaf.
    pub fn node_or_unknown(&self, type_name: &str) -> Result<Arc<ClassNode>, ResolveError> {
        Ok(self
            .catalog
            .node_for(type_name, self.cancel)?
            .unwrap_or_else(|| Arc::new(ClassNode::unknown(type_name))))
    }
}
