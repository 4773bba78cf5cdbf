//! Type descriptor resolution.
//!
//! `TypeResolver` is the seam between the metadata tree and whatever knows
//! the structure of declared types. `CatalogResolver` is the built-in
//! implementation: JVM scalars and standard containers are recognised by
//! name, enums and beans come from JSON catalog files.

use dashmap::DashMap;
use propmeta_parser::MetadataError;
use propmeta_types::{PrimitiveKind, TypeDescriptor, TypeShape};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const OBJECT: &str = "java.lang.Object";

const MAP_TYPES: &[&str] = &[
    "java.util.Map",
    "java.util.HashMap",
    "java.util.LinkedHashMap",
    "java.util.TreeMap",
    "java.util.SortedMap",
    "java.util.concurrent.ConcurrentMap",
    "java.util.concurrent.ConcurrentHashMap",
];

const ITERABLE_TYPES: &[&str] = &[
    "java.lang.Iterable",
    "java.util.Collection",
    "java.util.List",
    "java.util.ArrayList",
    "java.util.LinkedList",
    "java.util.Set",
    "java.util.HashSet",
    "java.util.LinkedHashSet",
    "java.util.SortedSet",
    "java.util.TreeSet",
    "java.util.Queue",
    "java.util.Deque",
];

/// Resolves a fully qualified type name into a structural descriptor.
///
/// `None` means "currently unresolvable". Implementations must return the
/// same answer for the same name until their own inputs change.
pub trait TypeResolver: Send + Sync {
    fn resolve(&self, type_name: &str) -> Option<TypeDescriptor>;
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    types: Vec<TypeDescriptor>,
}

/// Resolver backed by built-in JVM knowledge plus registered descriptors.
#[derive(Default)]
pub struct CatalogResolver {
    types: DashMap<String, TypeDescriptor>,
}

impl CatalogResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a descriptor under its own name.
    pub fn register(&self, descriptor: TypeDescriptor) {
        self.types.insert(descriptor.name.clone(), descriptor);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Register every descriptor in a catalog document. Returns the count.
    pub fn load_catalog_str(&self, source: &str) -> Result<usize, MetadataError> {
        let catalog: CatalogFile = serde_json::from_str(source)?;
        let count = catalog.types.len();
        for descriptor in catalog.types {
            self.register(descriptor);
        }
        Ok(count)
    }

    pub fn load_catalog_file(&self, path: &Path) -> Result<usize, MetadataError> {
        let source = std::fs::read_to_string(path).map_err(|source| MetadataError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_catalog_str(&source)
    }

    fn resolve_generic(&self, raw: &str, args: &[String]) -> Option<TypeDescriptor> {
        let name = format!("{}<{}>", raw, args.join(","));
        if MAP_TYPES.contains(&raw) && args.len() == 2 {
            return Some(TypeDescriptor::new(
                name,
                TypeShape::Map {
                    key: args[0].clone(),
                    value: args[1].clone(),
                },
            ));
        }
        if ITERABLE_TYPES.contains(&raw) && args.len() == 1 {
            return Some(TypeDescriptor::new(
                name,
                TypeShape::Iterable {
                    element: args[0].clone(),
                },
            ));
        }
        // Generic bean: fall back to the raw registration
        self.types.get(raw).map(|d| d.value().clone())
    }
}

impl TypeResolver for CatalogResolver {
    fn resolve(&self, type_name: &str) -> Option<TypeDescriptor> {
        let name: String = type_name.chars().filter(|c| !c.is_whitespace()).collect();
        if name.is_empty() {
            return None;
        }

        if let Some(kind) = PrimitiveKind::from_type_name(&name) {
            let shape = if PrimitiveKind::is_unboxed_name(&name) {
                TypeShape::Primitive { primitive: kind }
            } else {
                TypeShape::Boxed { primitive: kind }
            };
            return Some(TypeDescriptor::new(name, shape));
        }

        if let Some(element) = name.strip_suffix("[]") {
            return Some(TypeDescriptor::new(
                name.clone(),
                TypeShape::Array {
                    element: element.to_string(),
                },
            ));
        }

        if let Some((raw, args)) = split_generic(&name) {
            return self.resolve_generic(raw, &args);
        }

        if MAP_TYPES.contains(&name.as_str()) {
            return self.resolve_generic(&name, &[OBJECT.to_string(), OBJECT.to_string()]);
        }
        if ITERABLE_TYPES.contains(&name.as_str()) {
            return self.resolve_generic(&name, &[OBJECT.to_string()]);
        }
        if name == OBJECT {
            return Some(TypeDescriptor::new(name, TypeShape::Unknown));
        }

        self.types.get(&name).map(|d| d.value().clone())
    }
}

/// Split `Raw<A,B<C,D>>` into `Raw` and its top-level arguments.
fn split_generic(name: &str) -> Option<(&str, Vec<String>)> {
    let open = name.find('<')?;
    let inner = name[open + 1..].strip_suffix('>')?;
    let raw = &name[..open];

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in inner.chars() {
        match c {
            '<' => {
                depth += 1;
                current.push(c);
            }
            '>' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                args.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    args.push(current);

    if args.iter().any(|a| a.is_empty()) {
        return None;
    }
    Some((raw, args))
}

/// Load catalogs from files or directories (non-recursive, `.json` only).
///
/// Unreadable or malformed files are logged and skipped. Returns the number
/// of catalog files loaded.
pub fn load_catalogs(resolver: &CatalogResolver, paths: &[PathBuf]) -> usize {
    let mut loaded_files = 0;

    for path in paths {
        let files = if path.is_dir() {
            collect_json_files(path)
        } else if path.is_file() {
            vec![path.clone()]
        } else {
            tracing::debug!("Type catalog path not found: {}", path.display());
            continue;
        };

        for file in &files {
            match resolver.load_catalog_file(file) {
                Ok(count) => {
                    tracing::debug!("Loaded type catalog {}: {} types", file.display(), count);
                    loaded_files += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to load type catalog {}: {}", file.display(), e);
                }
            }
        }
    }

    loaded_files
}

fn collect_json_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "types": [
            {
                "name": "com.acme.Mode",
                "shape": { "kind": "enum", "constants": ["FAST", "SLOW"] }
            },
            {
                "name": "com.acme.Pool",
                "shape": {
                    "kind": "bean",
                    "fields": { "size": "int", "mode": "com.acme.Mode" }
                }
            }
        ]
    }"#;

    #[test]
    fn test_resolve_scalars() {
        let r = CatalogResolver::new();
        assert_eq!(
            r.resolve("int").unwrap().shape,
            TypeShape::Primitive {
                primitive: PrimitiveKind::Int
            }
        );
        assert_eq!(
            r.resolve("java.lang.Integer").unwrap().shape,
            TypeShape::Boxed {
                primitive: PrimitiveKind::Int
            }
        );
        assert_eq!(
            r.resolve("java.lang.String").unwrap().primitive_kind(),
            Some(PrimitiveKind::String)
        );
        assert_eq!(r.resolve("java.lang.Object").unwrap().shape, TypeShape::Unknown);
    }

    #[test]
    fn test_resolve_generic_containers() {
        let r = CatalogResolver::new();
        let map = r
            .resolve("java.util.Map<java.lang.String, java.util.List<java.lang.Integer>>")
            .unwrap();
        match map.shape {
            TypeShape::Map { key, value } => {
                assert_eq!(key, "java.lang.String");
                assert_eq!(value, "java.util.List<java.lang.Integer>");
            }
            other => panic!("Expected map shape, got {:?}", other),
        }

        let list = r.resolve("java.util.Set<com.acme.Mode>").unwrap();
        assert_eq!(
            list.shape,
            TypeShape::Iterable {
                element: "com.acme.Mode".to_string()
            }
        );

        let raw = r.resolve("java.util.List").unwrap();
        assert_eq!(
            raw.shape,
            TypeShape::Iterable {
                element: OBJECT.to_string()
            }
        );
    }

    #[test]
    fn test_resolve_array() {
        let r = CatalogResolver::new();
        assert_eq!(
            r.resolve("java.lang.String[]").unwrap().shape,
            TypeShape::Array {
                element: "java.lang.String".to_string()
            }
        );
    }

    #[test]
    fn test_catalog_types() {
        let r = CatalogResolver::new();
        assert!(r.resolve("com.acme.Pool").is_none());

        assert_eq!(r.load_catalog_str(CATALOG).unwrap(), 2);
        match r.resolve("com.acme.Pool").unwrap().shape {
            TypeShape::Bean { fields } => {
                assert_eq!(fields.get("size").map(String::as_str), Some("int"));
            }
            other => panic!("Expected bean shape, got {:?}", other),
        }
        assert!(matches!(
            r.resolve("com.acme.Mode").unwrap().shape,
            TypeShape::Enum { .. }
        ));
    }

    #[test]
    fn test_malformed_catalog_is_error() {
        let r = CatalogResolver::new();
        assert!(r.load_catalog_str("{ not json").is_err());
        assert!(r.is_empty());
    }

    #[test]
    fn test_load_catalogs_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("acme.json"), CATALOG).unwrap();
        std::fs::write(dir.path().join("broken.json"), "[").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let r = CatalogResolver::new();
        let loaded = load_catalogs(
            &r,
            &[dir.path().to_path_buf(), dir.path().join("missing")],
        );
        assert_eq!(loaded, 1);
        assert_eq!(r.len(), 2);
    }
}
