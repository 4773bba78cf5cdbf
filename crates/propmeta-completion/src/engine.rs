//! Path resolution and suggestion queries.
//!
//! Every query walks one tree snapshot from the metadata index. Queries that
//! take a `CancellationToken` stop with `ResolveError::Cancelled` at the next
//! descent step or resolver call after the token fires.

use crate::suggestion::{key_suggestion, value_suggestion};
use propmeta_index::{
    CancellationToken, MetadataIndex, Node, ResolveCx, ResolveError, TypeCatalog,
};
use propmeta_parser::path::join_path;
use propmeta_types::{FileType, Suggestion};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

pub struct CompletionEngine {
    index: Arc<MetadataIndex>,
    catalog: Arc<TypeCatalog>,
}

impl CompletionEngine {
    pub fn new(index: Arc<MetadataIndex>, catalog: Arc<TypeCatalog>) -> Self {
        CompletionEngine { index, catalog }
    }

    pub fn index(&self) -> &Arc<MetadataIndex> {
        &self.index
    }

    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.catalog
    }

    /// Longest chain of nodes matching every segment, root first.
    pub fn resolve_deepest(&self, segments: &[String]) -> Result<Option<Vec<Node>>, ResolveError> {
        self.resolve_deepest_with(segments, &CancellationToken::new())
    }

    pub fn resolve_deepest_with(
        &self,
        segments: &[String],
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<Node>>, ResolveError> {
        let tree = self.index.tree();
        let cx = ResolveCx::new(&self.catalog, cancel);
        match tree.find_deepest(cx, segments)? {
            Some(chain) if !chain.is_empty() => Ok(Some(chain)),
            _ => Ok(None),
        }
    }

    /// Key suggestions for the last segment, which is a prefix.
    pub fn suggest_keys(
        &self,
        segments: &[String],
        siblings: &HashSet<String>,
    ) -> Result<Vec<Suggestion>, ResolveError> {
        self.suggest_keys_with(
            segments,
            siblings,
            FileType::Properties,
            &CancellationToken::new(),
        )
    }

    /// Key suggestions below `segments[..len - 1]` whose name starts with
    /// the last segment, sorted by display text without duplicates.
    ///
    /// A parent path that does not resolve, or resolves to a leaf, yields
    /// no suggestions.
    pub fn suggest_keys_with(
        &self,
        segments: &[String],
        siblings: &HashSet<String>,
        file_type: FileType,
        cancel: &CancellationToken,
    ) -> Result<Vec<Suggestion>, ResolveError> {
        let tree = self.index.tree();
        let cx = ResolveCx::new(&self.catalog, cancel);

        let (prefix, parent_segments) = match segments.split_last() {
            Some((last, parent)) => (last.as_str(), parent),
            None => ("", segments),
        };

        let parent_chain = if parent_segments.is_empty() {
            Vec::new()
        } else {
            match tree.find_deepest(cx, parent_segments)? {
                Some(chain) => chain,
                None => return Ok(Vec::new()),
            }
        };
        let parent = parent_chain
            .last()
            .cloned()
            .unwrap_or_else(|| Node::Tree(tree.root().clone()));

        if parent.is_leaf(cx)? {
            return Ok(Vec::new());
        }

        let mut suggestions = BTreeSet::new();
        for child in parent.children_for_prefix(cx, prefix, siblings)? {
            cx.cancel.check()?;
            let leaf = child.is_leaf(cx)?;
            let mut chain = parent_chain.clone();
            chain.push(child);
            if let Some(suggestion) = key_suggestion(&chain, leaf, file_type) {
                suggestions.insert(suggestion);
            }
        }

        tracing::debug!(
            "Key suggestions for '{}': {}",
            join_path(segments),
            suggestions.len()
        );
        Ok(suggestions.into_iter().collect())
    }

    /// Value suggestions for the leaf at `segments`.
    pub fn suggest_values(
        &self,
        segments: &[String],
        prefix: &str,
        siblings: &HashSet<String>,
    ) -> Result<Vec<Suggestion>, ResolveError> {
        self.suggest_values_with(segments, prefix, siblings, &CancellationToken::new())
    }

    /// Value suggestions starting with `prefix`, sorted without duplicates.
    ///
    /// A path that does not resolve yields nothing; a path resolving to a
    /// non-leaf is a contract violation.
    pub fn suggest_values_with(
        &self,
        segments: &[String],
        prefix: &str,
        siblings: &HashSet<String>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Suggestion>, ResolveError> {
        let tree = self.index.tree();
        let cx = ResolveCx::new(&self.catalog, cancel);

        let chain = match tree.find_deepest(cx, segments)? {
            Some(chain) if !chain.is_empty() => chain,
            _ => return Ok(Vec::new()),
        };
        let Some(last) = chain.last() else {
            return Ok(Vec::new());
        };

        let default_value_text = last.property().and_then(|p| p.default_value_text());
        let suggestions: BTreeSet<Suggestion> = last
            .value_candidates(cx, prefix, siblings)?
            .into_iter()
            .map(|candidate| value_suggestion(&chain, candidate, default_value_text.clone()))
            .collect();
        Ok(suggestions.into_iter().collect())
    }

    /// Whether the path resolves to a position that takes a value.
    ///
    /// Lets callers avoid asking a non-leaf for values.
    pub fn accepts_values(
        &self,
        segments: &[String],
        cancel: &CancellationToken,
    ) -> Result<bool, ResolveError> {
        let tree = self.index.tree();
        let cx = ResolveCx::new(&self.catalog, cancel);
        match tree.find_deepest(cx, segments)? {
            Some(chain) => match chain.last() {
                Some(last) => last.accepts_values(cx),
                None => Ok(false),
            },
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propmeta_index::{CatalogResolver, TypeResolver};
    use propmeta_parser::parse_metadata_str;
    use propmeta_parser::path::split_path;
    use propmeta_types::{DeprecationLevel, SuggestionKind, TypeDescriptor, TypeShape};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const METADATA: &str = r#"{
        "groups": [
            { "name": "server", "type": "com.acme.ServerProperties", "description": "Server settings." }
        ],
        "properties": [
            { "name": "server.port", "type": "java.lang.Integer", "defaultValue": 8080.0 },
            { "name": "server.address", "type": "java.net.InetAddress" },
            { "name": "server.compression.enabled", "type": "java.lang.Boolean", "defaultValue": false },
            { "name": "spring.main.banner-mode", "type": "com.acme.Banner" },
            { "name": "spring.main.lazy", "type": "boolean" },
            { "name": "app.retries", "type": "java.lang.Byte", "defaultValue": 127.0 },
            { "name": "app.note" },
            { "name": "app.pool", "type": "com.acme.Pool" },
            { "name": "app.old", "type": "java.lang.String",
              "deprecation": { "level": "error", "replacement": "app.new" } },
            { "name": "logging.level", "type": "java.util.Map<java.lang.String,java.lang.String>" },
            { "name": "app.routes", "type": "java.util.Map<java.lang.String,com.acme.Pool>" },
            { "name": "app.mode", "type": "java.lang.String" }
        ],
        "hints": [
            { "name": "logging.level.keys", "values": [
                { "value": "root", "description": "Root logger." },
                { "value": "sql" },
                { "value": "security" },
                { "value": "com" }
            ] },
            { "name": "logging.level.values", "values": [
                { "value": "info" }, { "value": "debug" }, { "value": "warn" }
            ] },
            { "name": "app.routes.keys", "values": [ { "value": "home" }, { "value": "admin" } ] },
            { "name": "app.mode", "values": [ { "value": "fast" }, { "value": "slow" } ] },
            { "name": "app.note", "values": [ { "value": "hello" } ] }
        ]
    }"#;

    struct CountingResolver {
        inner: CatalogResolver,
        calls: AtomicUsize,
    }

    impl TypeResolver for CountingResolver {
        fn resolve(&self, type_name: &str) -> Option<TypeDescriptor> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.resolve(type_name)
        }
    }

    fn resolver() -> Arc<CountingResolver> {
        let inner = CatalogResolver::new();
        inner.register(TypeDescriptor::new(
            "com.acme.Banner",
            TypeShape::Enum {
                constants: vec!["OFF".to_string(), "CONSOLE".to_string(), "LOG".to_string()],
            },
        ));
        let mut fields = BTreeMap::new();
        fields.insert("size".to_string(), "int".to_string());
        fields.insert("name".to_string(), "java.lang.String".to_string());
        fields.insert("nested".to_string(), "com.acme.Pool".to_string());
        inner.register(TypeDescriptor::new("com.acme.Pool", TypeShape::Bean { fields }));
        Arc::new(CountingResolver {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    fn engine_with(resolver: Arc<CountingResolver>) -> CompletionEngine {
        let index = Arc::new(MetadataIndex::new());
        index.update_source("test", parse_metadata_str(METADATA).unwrap());
        CompletionEngine::new(index, Arc::new(TypeCatalog::new(resolver)))
    }

    fn engine() -> CompletionEngine {
        engine_with(resolver())
    }

    fn segs(path: &str) -> Vec<String> {
        split_path(path)
    }

    fn texts(suggestions: &[Suggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.display_text.as_str()).collect()
    }

    fn none() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn test_resolve_deepest_round_trip() {
        let engine = engine();
        let chain = engine
            .resolve_deepest(&segs("server.compression.enabled"))
            .unwrap()
            .unwrap();
        let names: Vec<String> = chain.iter().map(Node::name).collect();
        assert_eq!(join_path(&names), "server.compression.enabled");
    }

    #[test]
    fn test_resolve_deepest_past_leaf() {
        let engine = engine();
        assert!(engine
            .resolve_deepest(&segs("server.port.extra"))
            .unwrap()
            .is_none());
        assert!(engine.resolve_deepest(&segs("app.note.x")).unwrap().is_none());
        assert!(engine.resolve_deepest(&segs("nothing")).unwrap().is_none());
    }

    #[test]
    fn test_resolve_through_bean_delegate() {
        let engine = engine();
        let chain = engine
            .resolve_deepest(&segs("app.pool.nested.size"))
            .unwrap()
            .unwrap();
        assert_eq!(chain.len(), 4);
        assert!(matches!(chain[3], Node::Class(_)));

        let chain = engine
            .resolve_deepest(&segs("app.routes.home.name"))
            .unwrap()
            .unwrap();
        assert!(matches!(chain[2], Node::HintKey(_)));
        assert!(matches!(chain[3], Node::Class(_)));
    }

    #[test]
    fn test_root_and_group_suggestions() {
        let engine = engine();
        let root = engine.suggest_keys(&segs("s"), &none()).unwrap();
        assert_eq!(texts(&root), vec!["server", "spring"]);
        assert_eq!(root[0].kind, SuggestionKind::Group);
        assert_eq!(root[0].short_type.as_deref(), Some("ServerProperties"));
        assert_eq!(root[0].description.as_deref(), Some("Server settings."));

        let server = engine.suggest_keys(&segs("server."), &none()).unwrap();
        assert_eq!(
            texts(&server),
            vec!["server.address", "server.compression", "server.port"]
        );
    }

    #[test]
    fn test_property_suggestion_fields() {
        let engine = engine();
        let port = engine.suggest_keys(&segs("server.po"), &none()).unwrap();
        assert_eq!(port.len(), 1);
        assert_eq!(port[0].kind, SuggestionKind::Property);
        assert_eq!(port[0].short_type.as_deref(), Some("Integer"));
        assert_eq!(port[0].default_value_text.as_deref(), Some("8080"));
        assert_eq!(port[0].ancestor_path, vec!["server", "port"]);
        assert!(port[0].leaf);
        assert_eq!(port[0].append_colon, None);

        let retries = engine.suggest_keys(&segs("app.re"), &none()).unwrap();
        assert_eq!(retries[0].default_value_text.as_deref(), Some("127"));

        let old = engine.suggest_keys(&segs("app.ol"), &none()).unwrap();
        assert_eq!(old[0].deprecation_level, Some(DeprecationLevel::Error));
    }

    #[test]
    fn test_map_key_hint_prefix_order_and_exclusion() {
        let engine = engine();
        let keys = engine.suggest_keys(&segs("logging.level.s"), &none()).unwrap();
        assert_eq!(
            texts(&keys),
            vec!["logging.level.security", "logging.level.sql"]
        );
        assert!(keys.iter().all(|s| s.kind == SuggestionKind::MapKey));

        let siblings: HashSet<String> = ["security".to_string()].into_iter().collect();
        let rest = engine
            .suggest_keys(&segs("logging.level.s"), &siblings)
            .unwrap();
        assert_eq!(texts(&rest), vec!["logging.level.sql"]);

        // Case-sensitive
        assert!(engine
            .suggest_keys(&segs("logging.level.ROOT"), &none())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_sibling_exclusion_makes_results_disjoint() {
        let engine = engine();
        let first = engine.suggest_keys(&segs("logging.level."), &none()).unwrap();
        assert_eq!(first.len(), 4);

        let siblings: HashSet<String> = first
            .iter()
            .filter_map(|s| s.ancestor_path.last().cloned())
            .collect();
        let second = engine
            .suggest_keys(&segs("logging.level."), &siblings)
            .unwrap();
        let first_texts: HashSet<&str> = texts(&first).into_iter().collect();
        assert!(second
            .iter()
            .all(|s| !first_texts.contains(s.display_text.as_str())));
    }

    #[test]
    fn test_bean_field_suggestions() {
        let engine = engine();
        let fields = engine.suggest_keys(&segs("app.pool."), &none()).unwrap();
        assert_eq!(
            texts(&fields),
            vec!["app.pool.name", "app.pool.nested", "app.pool.size"]
        );
        assert_eq!(fields[2].kind, SuggestionKind::Field);
        assert_eq!(fields[2].short_type.as_deref(), Some("int"));
        assert!(!fields[1].leaf);

        let below_key = engine
            .suggest_keys(&segs("app.routes.admin.si"), &none())
            .unwrap();
        assert_eq!(texts(&below_key), vec!["app.routes.admin.size"]);
    }

    #[test]
    fn test_leaf_parent_yields_no_keys() {
        let engine = engine();
        assert!(engine.suggest_keys(&segs("server.port."), &none()).unwrap().is_empty());
        assert!(engine.suggest_keys(&segs("missing.x"), &none()).unwrap().is_empty());
    }

    #[test]
    fn test_yaml_suggestions_append_colon() {
        let engine = engine();
        let keys = engine
            .suggest_keys_with(
                &segs("server."),
                &none(),
                FileType::Yaml,
                &CancellationToken::new(),
            )
            .unwrap();
        assert!(keys.iter().all(|s| s.append_colon == Some(true)));
        let compression = keys
            .iter()
            .find(|s| s.display_text == "server.compression")
            .unwrap();
        assert!(!compression.leaf);
    }

    #[test]
    fn test_value_suggestions() {
        let engine = engine();

        let bools = engine
            .suggest_values(&segs("spring.main.lazy"), "", &none())
            .unwrap();
        assert_eq!(texts(&bools), vec!["false", "true"]);

        let banner = engine
            .suggest_values(&segs("spring.main.banner-mode"), "", &none())
            .unwrap();
        assert_eq!(texts(&banner), vec!["CONSOLE", "LOG", "OFF"]);

        let mode = engine.suggest_values(&segs("app.mode"), "f", &none()).unwrap();
        assert_eq!(texts(&mode), vec!["fast"]);
        assert_eq!(mode[0].kind, SuggestionKind::Value);

        // Untyped property still offers its hinted values
        let note = engine.suggest_values(&segs("app.note"), "", &none()).unwrap();
        assert_eq!(texts(&note), vec!["hello"]);

        let level = engine
            .suggest_values(&segs("logging.level.root"), "", &none())
            .unwrap();
        assert_eq!(texts(&level), vec!["debug", "info", "warn"]);
        let sql = engine
            .suggest_values(&segs("logging.level.sql"), "w", &none())
            .unwrap();
        assert_eq!(texts(&sql), vec!["warn"]);

        let enabled = engine
            .suggest_values(&segs("server.compression.enabled"), "", &none())
            .unwrap();
        assert_eq!(enabled[0].default_value_text.as_deref(), Some("false"));
    }

    #[test]
    fn test_value_suggestions_on_non_leaf_is_contract_violation() {
        let engine = engine();
        assert!(matches!(
            engine.suggest_values(&segs("app.pool"), "", &none()),
            Err(ResolveError::ContractViolation(_))
        ));
        assert!(matches!(
            engine.suggest_values(&segs("server"), "", &none()),
            Err(ResolveError::ContractViolation(_))
        ));
        assert!(engine
            .suggest_values(&segs("no.such.key"), "", &none())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_accepts_values() {
        let engine = engine();
        let cancel = CancellationToken::new();
        assert!(engine.accepts_values(&segs("server.port"), &cancel).unwrap());
        assert!(!engine.accepts_values(&segs("server"), &cancel).unwrap());
        assert!(!engine.accepts_values(&segs("app.pool"), &cancel).unwrap());
        assert!(engine
            .accepts_values(&segs("app.pool.size"), &cancel)
            .unwrap());
    }

    #[test]
    fn test_classification_resolves_each_type_once() {
        let resolver = resolver();
        let engine = engine_with(resolver.clone());

        engine.suggest_keys(&segs("app.pool."), &none()).unwrap();
        let after_first = resolver.calls.load(Ordering::SeqCst);
        engine.suggest_keys(&segs("app.pool."), &none()).unwrap();
        assert_eq!(resolver.calls.load(Ordering::SeqCst), after_first);
    }

    #[test]
    fn test_cancelled_query() {
        let engine = engine();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(
            engine
                .suggest_keys_with(&segs("app.pool."), &none(), FileType::Properties, &cancel)
                .unwrap_err(),
            ResolveError::Cancelled
        );
        assert_eq!(
            engine
                .resolve_deepest_with(&segs("server.port"), &cancel)
                .unwrap_err(),
            ResolveError::Cancelled
        );
    }
}
