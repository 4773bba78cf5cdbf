//! Class metadata nodes: traversal over a resolved type descriptor.
//!
//! One `ClassNode` wraps one immutable `TypeDescriptor`. Scalars, enums and
//! unknown types are leaves; beans, maps, iterables and arrays can be
//! descended into.

use crate::catalog::ResolveCx;
use crate::error::ResolveError;
use crate::node::Node;
use dashmap::DashMap;
use propmeta_types::{NodeKind, PrimitiveKind, TypeDescriptor, TypeShape};
use std::collections::HashSet;
use std::sync::Arc;

/// A child reached from a class node through one path segment.
#[derive(Debug, Clone)]
pub struct ClassChild {
    pub segment: String,
    pub node: Arc<ClassNode>,
}

/// A value suggestion produced by a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCandidate {
    pub text: String,
    pub description: Option<String>,
}

#[derive(Debug)]
pub struct ClassNode {
    descriptor: TypeDescriptor,
    /// Bean field nodes by field name; only successful resolutions are kept.
    fields: DashMap<String, Arc<ClassNode>>,
}

impl ClassNode {
    pub fn new(descriptor: TypeDescriptor) -> Self {
        ClassNode {
            descriptor,
            fields: DashMap::new(),
        }
    }

    /// Leaf standing in for a type the resolver could not describe.
    pub fn unknown(type_name: &str) -> Self {
        Self::new(TypeDescriptor::new(type_name, TypeShape::Unknown))
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn is_leaf(&self) -> bool {
        matches!(
            self.descriptor.shape,
            TypeShape::Primitive { .. }
                | TypeShape::Boxed { .. }
                | TypeShape::Enum { .. }
                | TypeShape::Unknown
        )
    }

    pub fn is_boolean(&self) -> bool {
        self.descriptor.primitive_kind() == Some(PrimitiveKind::Boolean)
    }

    /// Classification a property reports when this node is its delegate.
    pub fn node_kind(&self) -> NodeKind {
        match self.descriptor.primitive_kind() {
            Some(PrimitiveKind::Boolean) => NodeKind::Boolean,
            Some(kind) => NodeKind::Leaf(kind),
            None => NodeKind::DelegatedClass,
        }
    }

    /// Whether a leaf accepts `literal` as one of its values.
    fn accepts_literal(&self, literal: &str) -> bool {
        match &self.descriptor.shape {
            TypeShape::Primitive { primitive } | TypeShape::Boxed { primitive } => {
                primitive.parses(literal)
            }
            TypeShape::Enum { constants } => constants.iter().any(|c| c == literal),
            TypeShape::Unknown => !literal.is_empty(),
            _ => false,
        }
    }

    /// Exact child for one path segment.
    ///
    /// Leaves answer with themselves when the segment is a valid literal,
    /// which is how map keys are validated against their key type.
    pub fn find_direct_child(
        self: &Arc<Self>,
        cx: ResolveCx<'_>,
        segment: &str,
    ) -> Result<Option<ClassChild>, ResolveError> {
        let child = |node: Arc<ClassNode>| {
            Some(ClassChild {
                segment: segment.to_string(),
                node,
            })
        };

        match &self.descriptor.shape {
            TypeShape::Primitive { .. } | TypeShape::Boxed { .. } | TypeShape::Enum { .. } => {
                Ok(self.accepts_literal(segment).then(|| ClassChild {
                    segment: segment.to_string(),
                    node: self.clone(),
                }))
            }
            TypeShape::Unknown => Ok(None),
            TypeShape::Bean { fields } => match fields.get(segment) {
                Some(field_type) => Ok(child(self.field_node(cx, segment, field_type)?)),
                None => Ok(None),
            },
            TypeShape::Map { key, value } => {
                let key_node = cx.node_or_unknown(key)?;
                let key_ok = if key_node.is_leaf() {
                    key_node.accepts_literal(segment)
                } else {
                    !segment.is_empty()
                };
                if !key_ok {
                    return Ok(None);
                }
                Ok(child(cx.node_or_unknown(value)?))
            }
            TypeShape::Iterable { element } | TypeShape::Array { element } => {
                if segment.parse::<usize>().is_err() {
                    return Ok(None);
                }
                Ok(child(cx.node_or_unknown(element)?))
            }
        }
    }

    fn field_node(
        &self,
        cx: ResolveCx<'_>,
        field: &str,
        field_type: &str,
    ) -> Result<Arc<ClassNode>, ResolveError> {
        if let Some(node) = self.fields.get(field).map(|r| r.value().clone()) {
            return Ok(node);
        }
        match cx.catalog.node_for(field_type, cx.cancel)? {
            Some(node) => {
                self.fields.insert(field.to_string(), node.clone());
                Ok(node)
            }
            None => Ok(Arc::new(ClassNode::unknown(field_type))),
        }
    }

    /// Walk `segments[start..]` below this node, appending each match to `chain`.
    ///
    /// `None` when a segment does not match or the walk runs past a leaf.
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
        if self.is_leaf() {
            return Ok(None);
        }
        let Some(child) = self.find_direct_child(cx, &segments[start])? else {
            return Ok(None);
        };
        let next = child.node.clone();
        chain.push(Node::Class(child));
        next.find_deepest(cx, chain, segments, start + 1)
    }

    /// Children whose name starts with `prefix`, in name order, skipping
    /// names in `siblings`.
    ///
    /// Only beans and maps keyed by an enum or boolean have enumerable
    /// children; other containers return nothing.
    pub fn children_for_prefix(
        self: &Arc<Self>,
        cx: ResolveCx<'_>,
        prefix: &str,
        siblings: &HashSet<String>,
    ) -> Result<Vec<ClassChild>, ResolveError> {
        if self.is_leaf() {
            return Err(ResolveError::ContractViolation(format!(
                "key suggestions requested from leaf type '{}'",
                self.name()
            )));
        }

        let mut children = Vec::new();
        match &self.descriptor.shape {
            TypeShape::Bean { fields } => {
                for (field, field_type) in fields {
                    if !field.starts_with(prefix) || siblings.contains(field) {
                        continue;
                    }
                    children.push(ClassChild {
                        segment: field.clone(),
                        node: self.field_node(cx, field, field_type)?,
                    });
                }
            }
            TypeShape::Map { key, value } => {
                let key_node = cx.node_or_unknown(key)?;
                let keys = key_node.value_candidates(prefix, siblings)?;
                if !keys.is_empty() {
                    let value_node = cx.node_or_unknown(value)?;
                    children.extend(keys.into_iter().map(|k| ClassChild {
                        segment: k.text,
                        node: value_node.clone(),
                    }));
                }
            }
            _ => {}
        }
        Ok(children)
    }

    /// Known values of a leaf: `true`/`false` for booleans, constants for enums.
    pub fn value_candidates(
        &self,
        prefix: &str,
        siblings: &HashSet<String>,
    ) -> Result<Vec<ValueCandidate>, ResolveError> {
        if !self.is_leaf() {
            return Err(ResolveError::ContractViolation(format!(
                "value suggestions requested from non-leaf type '{}'",
                self.name()
            )));
        }

        let values: Vec<String> = match &self.descriptor.shape {
            _ if self.is_boolean() => vec!["false".to_string(), "true".to_string()],
            TypeShape::Enum { constants } => {
                let mut constants = constants.clone();
                constants.sort();
                constants
            }
            _ => Vec::new(),
        };

        Ok(values
            .into_iter()
            .filter(|v| v.starts_with(prefix) && !siblings.contains(v))
            .map(|text| ValueCandidate {
                text,
                description: None,
            })
            .collect())
    }

    /// Node for the value side of a map type.
    pub fn map_value_node(&self, cx: ResolveCx<'_>) -> Result<Option<Arc<ClassNode>>, ResolveError> {
        match &self.descriptor.shape {
            TypeShape::Map { value, .. } => Ok(Some(cx.node_or_unknown(value)?)),
            _ => Ok(None),
        }
    }

    /// Short summary of the type for documentation popups.
    pub fn describe(&self) -> String {
        let name = &self.descriptor.name;
        match &self.descriptor.shape {
            TypeShape::Primitive { primitive } => format!("{} (primitive {:?})", name, primitive),
            TypeShape::Boxed { primitive } => {
                format!("{} (boxed {})", name, primitive.short_type_name())
            }
            TypeShape::Array { element } => format!("{} (array of {})", name, element),
            TypeShape::Iterable { element } => format!("{} (collection of {})", name, element),
            TypeShape::Map { key, value } => format!("{} (map of {} to {})", name, key, value),
            TypeShape::Enum { constants } => format!("{} (enum: {})", name, constants.join(", ")),
            TypeShape::Bean { fields } => format!("{} ({} fields)", name, fields.len()),
            TypeShape::Unknown => format!("{} (unknown type)", name),
        }
    }
}
