//! The traversal node handed back by deepest-match and prefix queries.

use crate::catalog::ResolveCx;
use crate::class_node::{ClassChild, ClassNode, ValueCandidate};
use crate::error::ResolveError;
use crate::property::{hint_candidates, PropertyNode};
use crate::tree::TreeNode;
use propmeta_types::HintValue;
use std::collections::HashSet;
use std::sync::{Arc, Weak};

/// A map key enumerated by its property's key hint.
///
/// Holds a non-owning reference back to the property; if the property has
/// been dropped (metadata reloaded) the node behaves as a leaf.
#[derive(Debug, Clone)]
pub struct HintKeyNode {
    property: Weak<PropertyNode>,
    pub value: HintValue,
}

impl HintKeyNode {
    pub fn new(property: Weak<PropertyNode>, value: HintValue) -> Self {
        HintKeyNode { property, value }
    }

    pub fn name(&self) -> String {
        self.value.text()
    }

    pub fn property(&self) -> Option<Arc<PropertyNode>> {
        self.property.upgrade()
    }

    fn value_node(&self, cx: ResolveCx<'_>) -> Result<Option<Arc<ClassNode>>, ResolveError> {
        match self.property() {
            Some(property) => property.map_value_node(cx),
            None => Ok(None),
        }
    }

    /// Leaf when the map's values are hint-enumerated, or its value type is
    /// a leaf or cannot be resolved.
    pub fn is_leaf(&self, cx: ResolveCx<'_>) -> Result<bool, ResolveError> {
        let Some(property) = self.property() else {
            return Ok(true);
        };
        if property.map_with_predefined_values() || property.leaf_with_known_values() {
            return Ok(true);
        }
        Ok(property.map_value_node(cx)?.map_or(true, |v| v.is_leaf()))
    }

    fn children_for_prefix(
        &self,
        cx: ResolveCx<'_>,
        prefix: &str,
        siblings: &HashSet<String>,
    ) -> Result<Vec<Node>, ResolveError> {
        if self.is_leaf(cx)? {
            return Err(ResolveError::ContractViolation(format!(
                "key suggestions requested below map key '{}'",
                self.name()
            )));
        }
        match self.value_node(cx)? {
            Some(value_node) => Ok(value_node
                .children_for_prefix(cx, prefix, siblings)?
                .into_iter()
                .map(Node::Class)
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    fn value_candidates(
        &self,
        cx: ResolveCx<'_>,
        prefix: &str,
        siblings: &HashSet<String>,
    ) -> Result<Vec<ValueCandidate>, ResolveError> {
        if !self.is_leaf(cx)? {
            return Err(ResolveError::ContractViolation(format!(
                "value suggestions requested for non-leaf map key '{}'",
                self.name()
            )));
        }
        let Some(property) = self.property() else {
            return Ok(Vec::new());
        };
        if let Some(hint) = property
            .value_hint()
            .filter(|h| h.represents_map_value_role())
        {
            return Ok(hint_candidates(hint, prefix, siblings));
        }
        match property.map_value_node(cx)? {
            Some(value_node) => value_node.value_candidates(prefix, siblings),
            None => Ok(Vec::new()),
        }
    }
}

/// One step in a matched path.
#[derive(Debug, Clone)]
pub enum Node {
    /// A node of the declared property trie (group, property, or both).
    Tree(Arc<TreeNode>),
    /// A map key taken from a key hint.
    HintKey(HintKeyNode),
    /// A child reached through a resolved type.
    Class(ClassChild),
}

impl Node {
    pub fn name(&self) -> String {
        match self {
            Node::Tree(t) => t.segment().to_string(),
            Node::HintKey(h) => h.name(),
            Node::Class(c) => c.segment.clone(),
        }
    }

    /// Declared property at this position, if any.
    pub fn property(&self) -> Option<Arc<PropertyNode>> {
        match self {
            Node::Tree(t) => t.property().cloned(),
            Node::HintKey(h) => h.property(),
            Node::Class(_) => None,
        }
    }

    /// True when no further key segment can follow this node.
    pub fn is_leaf(&self, cx: ResolveCx<'_>) -> Result<bool, ResolveError> {
        match self {
            Node::Tree(t) => {
                if !t.children().is_empty() {
                    return Ok(false);
                }
                match t.property() {
                    Some(property) => property.is_leaf(cx),
                    None => Ok(false),
                }
            }
            Node::HintKey(h) => h.is_leaf(cx),
            Node::Class(c) => Ok(c.node.is_leaf()),
        }
    }

    /// True when values (rather than further keys) can be suggested here.
    pub fn accepts_values(&self, cx: ResolveCx<'_>) -> Result<bool, ResolveError> {
        match self {
            Node::Tree(t) => match t.property() {
                Some(property) => property.is_leaf(cx),
                None => Ok(false),
            },
            other => other.is_leaf(cx),
        }
    }

    /// Key candidates below this node starting with `prefix`.
    ///
    /// Trie children come first; their names are then excluded from what
    /// the node's own property contributes.
    pub fn children_for_prefix(
        &self,
        cx: ResolveCx<'_>,
        prefix: &str,
        siblings: &HashSet<String>,
    ) -> Result<Vec<Node>, ResolveError> {
        match self {
            Node::Tree(t) => {
                let mut children: Vec<Node> = t
                    .children_with_prefix(prefix)
                    .filter(|c| !siblings.contains(c.segment()))
                    .map(|c| Node::Tree(c.clone()))
                    .collect();

                if let Some(property) = t.property() {
                    if !property.is_leaf(cx)? {
                        let mut exclude = siblings.clone();
                        exclude.extend(children.iter().map(Node::name));
                        children.extend(property.children_for_prefix(cx, prefix, &exclude)?);
                    }
                }
                Ok(children)
            }
            Node::HintKey(h) => h.children_for_prefix(cx, prefix, siblings),
            Node::Class(c) => Ok(c
                .node
                .children_for_prefix(cx, prefix, siblings)?
                .into_iter()
                .map(Node::Class)
                .collect()),
        }
    }

    /// Value candidates for a leaf position.
    pub fn value_candidates(
        &self,
        cx: ResolveCx<'_>,
        prefix: &str,
        siblings: &HashSet<String>,
    ) -> Result<Vec<ValueCandidate>, ResolveError> {
        match self {
            Node::Tree(t) => match t.property() {
                Some(property) => property.value_candidates(cx, prefix, siblings),
                None => Err(ResolveError::ContractViolation(format!(
                    "value suggestions requested for group '{}'",
                    t.path()
                ))),
            },
            Node::HintKey(h) => h.value_candidates(cx, prefix, siblings),
            Node::Class(c) => c.node.value_candidates(prefix, siblings),
        }
    }
}
