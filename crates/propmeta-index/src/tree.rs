//! The declared property trie.
//!
//! Property and group names are split into segments and merged into one
//! trie; a trie node may carry a group declaration, a property, or both.

use crate::catalog::ResolveCx;
use crate::error::ResolveError;
use crate::node::Node;
use crate::property::PropertyNode;
use propmeta_parser::path::split_path;
use propmeta_parser::MetadataDocument;
use propmeta_types::{GroupDecl, Hint, HintRole};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

#[derive(Debug)]
pub struct TreeNode {
    segment: String,
    path: String,
    group: Option<GroupDecl>,
    property: Option<Arc<PropertyNode>>,
    children: BTreeMap<String, Arc<TreeNode>>,
}

impl TreeNode {
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Full dotted path from the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn group(&self) -> Option<&GroupDecl> {
        self.group.as_ref()
    }

    pub fn property(&self) -> Option<&Arc<PropertyNode>> {
        self.property.as_ref()
    }

    pub fn children(&self) -> &BTreeMap<String, Arc<TreeNode>> {
        &self.children
    }

    pub fn child(&self, segment: &str) -> Option<&Arc<TreeNode>> {
        self.children.get(segment)
    }

    /// Children whose segment starts with `prefix`, in name order.
    pub fn children_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = &'a Arc<TreeNode>> + 'a {
        self.children
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(segment, _)| segment.starts_with(prefix))
            .map(|(_, child)| child)
    }

    /// Deepest match for `segments[start..]` below this node.
    ///
    /// A trie child wins over the property's own type for the same segment.
    pub fn find_deepest(
        self: &Arc<Self>,
        cx: ResolveCx<'_>,
        mut chain: Vec<Node>,
        segments: &[String],
        start: usize,
    ) -> Result<Option<Vec<Node>>, ResolveError> {
        cx.cancel.check()?;
        if start >= segments.len() {
            return Ok(Some(chain));
        }
        if let Some(child) = self.children.get(&segments[start]) {
            chain.push(Node::Tree(child.clone()));
            return child.find_deepest(cx, chain, segments, start + 1);
        }
        match &self.property {
            Some(property) => property.find_child_deepest(cx, chain, segments, start),
            None => Ok(None),
        }
    }
}

#[derive(Default)]
struct TreeBuilder {
    group: Option<GroupDecl>,
    property: Option<PropertyNode>,
    children: BTreeMap<String, TreeBuilder>,
}

impl TreeBuilder {
    fn slot(&mut self, name: &str) -> &mut TreeBuilder {
        let mut node = self;
        for segment in split_path(name) {
            node = node.children.entry(segment).or_default();
        }
        node
    }

    fn freeze(
        self,
        segment: String,
        path: String,
        properties: &mut HashMap<String, Arc<PropertyNode>>,
    ) -> Arc<TreeNode> {
        let property = self.property.map(Arc::new);
        if let Some(p) = &property {
            properties.insert(p.name.clone(), p.clone());
        }
        let children = self
            .children
            .into_iter()
            .map(|(seg, child)| {
                let child_path = if path.is_empty() {
                    seg.clone()
                } else {
                    format!("{}.{}", path, seg)
                };
                let node = child.freeze(seg.clone(), child_path, properties);
                (seg, node)
            })
            .collect();
        Arc::new(TreeNode {
            segment,
            path,
            group: self.group,
            property,
            children,
        })
    }
}

/// The root property set built from one or more metadata documents.
#[derive(Debug)]
pub struct PropertyTree {
    root: Arc<TreeNode>,
    properties: HashMap<String, Arc<PropertyNode>>,
}

impl Default for PropertyTree {
    fn default() -> Self {
        Self::build(std::iter::empty::<&MetadataDocument>())
    }
}

impl PropertyTree {
    /// Build a tree from documents in ingestion order.
    ///
    /// A later property or group with the same name replaces an earlier one.
    /// Hints attach to their target property; hints naming an unknown
    /// property are dropped.
    pub fn build<'a>(docs: impl IntoIterator<Item = &'a MetadataDocument>) -> Self {
        let docs: Vec<&MetadataDocument> = docs.into_iter().collect();

        let mut declared: HashMap<String, PropertyNode> = HashMap::new();
        for doc in &docs {
            for decl in &doc.properties {
                if decl.name.trim().is_empty() {
                    continue;
                }
                declared.insert(decl.name.clone(), PropertyNode::from_decl(decl.clone()));
            }
        }

        for doc in &docs {
            for decl in &doc.hints {
                let (target, role) = HintRole::split_hint_name(&decl.name);
                match declared.get_mut(target) {
                    Some(property) => {
                        property.set_hint(Hint::new(decl.name.clone(), role, decl.values.clone()))
                    }
                    None => {
                        tracing::warn!("Dropping hint {}: no property named {}", decl.name, target)
                    }
                }
            }
        }

        let mut root = TreeBuilder::default();
        for doc in &docs {
            for group in &doc.groups {
                if group.name.trim().is_empty() {
                    continue;
                }
                root.slot(&group.name).group = Some(group.clone());
            }
        }
        for (name, property) in declared {
            root.slot(&name).property = Some(property);
        }

        let mut properties = HashMap::new();
        let root = root.freeze(String::new(), String::new(), &mut properties);
        tracing::debug!("Built property tree: {} properties", properties.len());
        PropertyTree { root, properties }
    }

    pub fn root(&self) -> &Arc<TreeNode> {
        &self.root
    }

    /// Property by its full dotted name.
    pub fn property(&self, name: &str) -> Option<&Arc<PropertyNode>> {
        self.properties.get(name)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Forget every property's memoized classification and delegate.
    pub fn invalidate_delegates(&self) {
        for property in self.properties.values() {
            property.invalidate();
        }
    }

    /// Deepest match from the root. The chain excludes the root itself.
    pub fn find_deepest(
        &self,
        cx: ResolveCx<'_>,
        segments: &[String],
    ) -> Result<Option<Vec<Node>>, ResolveError> {
        self.root.find_deepest(cx, Vec::new(), segments, 0)
    }
}
