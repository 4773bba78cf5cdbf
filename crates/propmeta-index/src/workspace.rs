//! Global metadata index.

use crate::property::PropertyNode;
use crate::tree::PropertyTree;
use dashmap::DashMap;
use parking_lot::RwLock;
use propmeta_parser::diagnostics::{check_document, Severity};
use propmeta_parser::MetadataDocument;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// All ingested metadata sources, merged into one property tree.
///
/// Sources are keyed by URI (or any stable id). The tree is rebuilt on every
/// update; readers take a snapshot with `tree()` and keep using it while a
/// rebuild happens.
pub struct MetadataIndex {
    /// Source id → (ingestion sequence, document)
    sources: DashMap<String, (u64, MetadataDocument)>,
    next_seq: AtomicU64,
    tree: RwLock<Arc<PropertyTree>>,
}

impl Default for MetadataIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataIndex {
    pub fn new() -> Self {
        MetadataIndex {
            sources: DashMap::new(),
            next_seq: AtomicU64::new(0),
            tree: RwLock::new(Arc::new(PropertyTree::default())),
        }
    }

    /// Add or replace one source and rebuild the tree.
    ///
    /// A replaced source keeps its original position in ingestion order.
    pub fn update_source(&self, uri: &str, doc: MetadataDocument) {
        for diag in check_document(&doc) {
            match diag.severity {
                Severity::Warning => tracing::warn!("{}: {}", uri, diag.message),
                Severity::Info => tracing::debug!("{}: {}", uri, diag.message),
            }
        }

        let seq = match self.sources.get(uri) {
            Some(existing) => existing.0,
            None => self.next_seq.fetch_add(1, Ordering::SeqCst),
        };
        self.sources.insert(uri.to_string(), (seq, doc));
        self.rebuild();
    }

    /// Remove a source and rebuild the tree.
    pub fn remove_source(&self, uri: &str) {
        if self.sources.remove(uri).is_some() {
            self.rebuild();
        }
    }

    fn rebuild(&self) {
        let mut ordered: Vec<(u64, MetadataDocument)> = self
            .sources
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        ordered.sort_by_key(|(seq, _)| *seq);

        let tree = PropertyTree::build(ordered.iter().map(|(_, doc)| doc));
        tracing::info!(
            "Metadata index rebuilt: {} sources, {} properties",
            ordered.len(),
            tree.len()
        );
        *self.tree.write() = Arc::new(tree);
    }

    /// Current tree snapshot.
    pub fn tree(&self) -> Arc<PropertyTree> {
        self.tree.read().clone()
    }

    pub fn property(&self, name: &str) -> Option<Arc<PropertyNode>> {
        self.tree().property(name).cloned()
    }

    /// Re-resolve property types on next use.
    ///
    /// Call after the type catalog changed so properties that memoized an
    /// unresolvable type pick up the new descriptors.
    pub fn invalidate_delegates(&self) {
        self.tree().invalidate_delegates();
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CancellationToken, ResolveCx, TypeCatalog};
    use crate::resolver::CatalogResolver;
    use propmeta_parser::parse_metadata_str;
    use propmeta_types::{NodeKind, TypeDescriptor, TypeShape};

    fn doc(json: &str) -> MetadataDocument {
        parse_metadata_str(json).unwrap()
    }

    #[test]
    fn test_update_and_remove_source() {
        let index = MetadataIndex::new();
        index.update_source(
            "file:///a.json",
            doc(r#"{ "properties": [ { "name": "a.one" } ] }"#),
        );
        index.update_source(
            "file:///b.json",
            doc(r#"{ "properties": [ { "name": "b.two" } ] }"#),
        );
        assert_eq!(index.len(), 2);
        assert_eq!(index.tree().len(), 2);

        index.remove_source("file:///a.json");
        assert!(index.property("a.one").is_none());
        assert!(index.property("b.two").is_some());
    }

    #[test]
    fn test_replaced_source_keeps_order() {
        let index = MetadataIndex::new();
        index.update_source(
            "first",
            doc(r#"{ "properties": [ { "name": "x", "type": "int" } ] }"#),
        );
        index.update_source(
            "second",
            doc(r#"{ "properties": [ { "name": "x", "type": "long" } ] }"#),
        );
        // Re-ingesting "first" must not let it shadow "second"
        index.update_source(
            "first",
            doc(r#"{ "properties": [ { "name": "x", "type": "short" } ] }"#),
        );
        assert_eq!(
            index.property("x").and_then(|p| p.type_name.clone()).as_deref(),
            Some("long")
        );
    }

    #[test]
    fn test_snapshot_survives_rebuild() {
        let index = MetadataIndex::new();
        index.update_source("a", doc(r#"{ "properties": [ { "name": "a.b" } ] }"#));
        let snapshot = index.tree();
        index.remove_source("a");
        assert_eq!(snapshot.len(), 1);
        assert!(index.tree().is_empty());
    }

    #[test]
    fn test_invalidate_delegates_after_new_types() {
        let index = MetadataIndex::new();
        index.update_source(
            "a",
            doc(r#"{ "properties": [ { "name": "app.mode", "type": "com.acme.Mode" } ] }"#),
        );
        let resolver = Arc::new(CatalogResolver::new());
        let catalog = TypeCatalog::new(resolver.clone());
        let cancel = CancellationToken::new();
        let cx = ResolveCx::new(&catalog, &cancel);

        let prop = index.property("app.mode").unwrap();
        assert_eq!(prop.classification(cx).unwrap(), NodeKind::Undefined);

        resolver.register(TypeDescriptor::new(
            "com.acme.Mode",
            TypeShape::Enum {
                constants: vec!["FAST".to_string(), "SLOW".to_string()],
            },
        ));
        catalog.invalidate_all();
        // Still memoized as unresolvable
        assert_eq!(prop.classification(cx).unwrap(), NodeKind::Undefined);

        index.invalidate_delegates();
        assert_eq!(prop.classification(cx).unwrap(), NodeKind::DelegatedClass);
        assert!(prop.delegate(cx).unwrap().is_some());
    }
}
