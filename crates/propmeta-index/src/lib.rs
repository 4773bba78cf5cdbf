//! Metadata tree for propmeta.
//!
//! Holds ingested metadata sources as a property trie, resolves declared
//! type names into structural descriptors, and provides the traversal nodes
//! (property, hint-aware map key, class metadata) the completion engine walks.

pub mod catalog;
pub mod class_node;
pub mod error;
pub mod node;
pub mod property;
pub mod resolver;
pub mod tree;
pub mod workspace;

pub use catalog::{CancellationToken, ResolveCx, TypeCatalog};
pub use class_node::{ClassChild, ClassNode, ValueCandidate};
pub use error::ResolveError;
pub use node::{HintKeyNode, Node};
pub use property::PropertyNode;
pub use resolver::{CatalogResolver, TypeResolver};
pub use tree::{PropertyTree, TreeNode};
pub use workspace::MetadataIndex;
