//! Declared properties and their lazy classification.

use crate::catalog::ResolveCx;
use crate::class_node::{ClassNode, ValueCandidate};
use crate::error::ResolveError;
use crate::node::{HintKeyNode, Node};
use parking_lot::Mutex;
use propmeta_types::{
    Deprecation, DeprecationLevel, Hint, HintRole, Literal, NodeKind, PrimitiveKind, PropertyDecl,
};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
enum DelegateState {
    #[default]
    NotAttempted,
    Resolved(Arc<ClassNode>),
    Unresolvable,
}

/// Memoized classification. Written at most once until `invalidate`.
#[derive(Debug, Default)]
struct LazyState {
    kind: Option<NodeKind>,
    delegate: DelegateState,
}

/// A property declared in a metadata document.
///
/// Declared fields are immutable after ingestion. Classification and the
/// delegate class node are computed on first use under a lock, so
/// concurrent callers never construct the delegate twice. Equality and
/// ordering use the name only.
#[derive(Debug)]
pub struct PropertyNode {
    pub name: String,
    pub type_name: Option<String>,
    pub description: Option<String>,
    pub source_type: Option<String>,
    pub deprecation: Option<Deprecation>,
    pub default_value: Option<Literal>,
    key_hint: Option<Hint>,
    value_hint: Option<Hint>,
    lazy: Mutex<LazyState>,
}

impl PropertyNode {
    pub fn from_decl(decl: PropertyDecl) -> Self {
        let deprecation = match decl.deprecation {
            Some(d) => Some(d),
            None if decl.deprecated => Some(Deprecation::default()),
            None => None,
        };
        PropertyNode {
            name: decl.name,
            type_name: decl.type_name.filter(|t| !t.trim().is_empty()),
            description: decl.description,
            source_type: decl.source_type,
            deprecation,
            default_value: decl.default_value,
            key_hint: None,
            value_hint: None,
            lazy: Mutex::new(LazyState::default()),
        }
    }

    /// Attach a hint. Value-role hints go to the value slot; generic and
    /// key-role hints share the key slot. Resets any memoized classification.
    pub fn set_hint(&mut self, hint: Hint) {
        match hint.role() {
            HintRole::MapValues => self.value_hint = Some(hint),
            HintRole::Generic | HintRole::MapKeys => self.key_hint = Some(hint),
        }
        *self.lazy.get_mut() = LazyState::default();
    }

    pub fn key_hint(&self) -> Option<&Hint> {
        self.key_hint.as_ref()
    }

    pub fn value_hint(&self) -> Option<&Hint> {
        self.value_hint.as_ref()
    }

    pub fn deprecation_level(&self) -> Option<DeprecationLevel> {
        self.deprecation.as_ref().map(|d| d.level)
    }

    pub fn map_with_predefined_keys(&self) -> bool {
        self.key_hint
            .as_ref()
            .is_some_and(|h| h.represents_map_key_role())
    }

    pub fn map_with_predefined_values(&self) -> bool {
        self.value_hint
            .as_ref()
            .is_some_and(|h| h.represents_map_value_role())
    }

    pub fn leaf_with_known_values(&self) -> bool {
        !self.map_with_predefined_keys()
            && !self.map_with_predefined_values()
            && self.key_hint.as_ref().is_some_and(|h| h.has_predefined_values())
    }

    /// Classify this property, resolving its delegate if needed.
    ///
    /// Computed once; later calls return the memoized kind without touching
    /// the resolver.
    pub fn classification(&self, cx: ResolveCx<'_>) -> Result<NodeKind, ResolveError> {
        let mut state = self.lazy.lock();
        if let Some(kind) = state.kind {
            return Ok(kind);
        }
        let kind = self.classify_locked(cx, &mut state)?;
        state.kind = Some(kind);
        Ok(kind)
    }

    fn classify_locked(
        &self,
        cx: ResolveCx<'_>,
        state: &mut LazyState,
    ) -> Result<NodeKind, ResolveError> {
        if self.type_name.is_none() {
            return Ok(NodeKind::Undefined);
        }
        if self.map_with_predefined_keys() || self.map_with_predefined_values() {
            return Ok(NodeKind::Map);
        }
        if self.leaf_with_known_values() {
            return Ok(NodeKind::EnumeratedValues);
        }
        Ok(match self.delegate_locked(cx, state)? {
            Some(delegate) => delegate.node_kind(),
            None => NodeKind::Undefined,
        })
    }

    /// Class node for the declared type, resolved at most once.
    ///
    /// A cancelled resolution leaves the delegate unattempted.
    pub fn delegate(&self, cx: ResolveCx<'_>) -> Result<Option<Arc<ClassNode>>, ResolveError> {
        let mut state = self.lazy.lock();
        self.delegate_locked(cx, &mut state)
    }

    fn delegate_locked(
        &self,
        cx: ResolveCx<'_>,
        state: &mut LazyState,
    ) -> Result<Option<Arc<ClassNode>>, ResolveError> {
        match &state.delegate {
            DelegateState::Resolved(node) => return Ok(Some(node.clone())),
            DelegateState::Unresolvable => return Ok(None),
            DelegateState::NotAttempted => {}
        }
        let Some(type_name) = self.type_name.as_deref() else {
            return Ok(None);
        };
        match cx.catalog.node_for(type_name, cx.cancel)? {
            Some(node) => {
                state.delegate = DelegateState::Resolved(node.clone());
                Ok(Some(node))
            }
            None => {
                tracing::debug!("Property {} has unresolvable type {}", self.name, type_name);
                state.delegate = DelegateState::Unresolvable;
                Ok(None)
            }
        }
    }

    /// Forget the memoized classification and delegate.
    pub fn invalidate(&self) {
        *self.lazy.lock() = LazyState::default();
    }

    pub fn is_leaf(&self, cx: ResolveCx<'_>) -> Result<bool, ResolveError> {
        let kind = self.classification(cx)?;
        if matches!(kind, NodeKind::EnumeratedValues | NodeKind::Undefined) {
            return Ok(true);
        }
        Ok(self.delegate(cx)?.is_some_and(|d| d.is_leaf()))
    }

    /// Node for the value side of a map-typed property.
    pub fn map_value_node(&self, cx: ResolveCx<'_>) -> Result<Option<Arc<ClassNode>>, ResolveError> {
        match self.delegate(cx)? {
            Some(delegate) => delegate.map_value_node(cx),
            None => Ok(None),
        }
    }

    /// Continue a deepest-match walk below this property.
    ///
    /// Hint-enumerated map keys are authoritative: a segment missing from the
    /// key hint fails even if the declared type would accept it.
    pub fn find_child_deepest(
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
        if self.is_leaf(cx)? {
            return Ok(None);
        }

        if let Some(hint) = self.key_hint.as_ref().filter(|h| h.represents_map_key_role()) {
            let Some(value) = hint.find_exact(&segments[start]) else {
                return Ok(None);
            };
            chain.push(Node::HintKey(HintKeyNode::new(Arc::downgrade(self), value.clone())));
            if start + 1 == segments.len() {
                return Ok(Some(chain));
            }
            if self.map_with_predefined_values() {
                return Ok(None);
            }
            return match self.map_value_node(cx)? {
                Some(value_node) => value_node.find_deepest(cx, chain, segments, start + 1),
                None => Ok(None),
            };
        }

        match self.delegate(cx)? {
            Some(delegate) => delegate.find_deepest(cx, chain, segments, start),
            None => Ok(None),
        }
    }

    /// Children of this property whose name starts with `prefix`.
    pub fn children_for_prefix(
        self: &Arc<Self>,
        cx: ResolveCx<'_>,
        prefix: &str,
        siblings: &HashSet<String>,
    ) -> Result<Vec<Node>, ResolveError> {
        if self.is_leaf(cx)? {
            return Err(ResolveError::ContractViolation(format!(
                "key suggestions requested from leaf property '{}'",
                self.name
            )));
        }

        if let Some(hint) = self.key_hint.as_ref().filter(|h| h.represents_map_key_role()) {
            return Ok(hint
                .find_by_prefix(prefix)
                .into_iter()
                .filter(|v| !siblings.contains(&v.text()))
                .map(|v| Node::HintKey(HintKeyNode::new(Arc::downgrade(self), v.clone())))
                .collect());
        }

        match self.delegate(cx)? {
            Some(delegate) => Ok(delegate
                .children_for_prefix(cx, prefix, siblings)?
                .into_iter()
                .map(Node::Class)
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    /// Value suggestions for a leaf property.
    ///
    /// A generic hint with values wins; otherwise the delegate supplies its
    /// own values (booleans, enum constants).
    pub fn value_candidates(
        &self,
        cx: ResolveCx<'_>,
        prefix: &str,
        siblings: &HashSet<String>,
    ) -> Result<Vec<ValueCandidate>, ResolveError> {
        if !self.is_leaf(cx)? {
            return Err(ResolveError::ContractViolation(format!(
                "value suggestions requested from non-leaf property '{}'",
                self.name
            )));
        }

        if let Some(hint) = self.key_hint.as_ref().filter(|h| h.has_predefined_values()) {
            return Ok(hint_candidates(hint, prefix, siblings));
        }

        match self.delegate(cx)? {
            Some(delegate) if delegate.is_leaf() => delegate.value_candidates(prefix, siblings),
            _ => Ok(Vec::new()),
        }
    }

    /// Default value as display text, `None` for lists and objects.
    pub fn default_value_text(&self) -> Option<String> {
        let value = self.default_value.as_ref()?;
        render_default(self.type_name.as_deref(), value)
    }

    pub fn describe(&self) -> String {
        let mut out = self.name.clone();
        if let Some(type_name) = &self.type_name {
            out.push_str(&format!(" ({})", type_name));
        }
        if let Some(default) = self.default_value_text() {
            out.push_str(&format!(", default {}", default));
        }
        if let Some(deprecation) = &self.deprecation {
            out.push_str(match deprecation.level {
                DeprecationLevel::Warning => ", deprecated",
                DeprecationLevel::Error => ", deprecated (error)",
            });
            if let Some(replacement) = &deprecation.replacement {
                out.push_str(&format!(", use {}", replacement));
            }
        }
        out
    }
}

pub(crate) fn hint_candidates(
    hint: &Hint,
    prefix: &str,
    siblings: &HashSet<String>,
) -> Vec<ValueCandidate> {
    hint.find_by_prefix(prefix)
        .into_iter()
        .map(|v| (v.text(), v))
        .filter(|(text, _)| !siblings.contains(text))
        .map(|(text, v)| ValueCandidate {
            text,
            description: v.description.clone(),
        })
        .collect()
}

/// Render a stored default for display.
///
/// Floating defaults of `byte`, `short` and `int` properties are narrowed
/// through the target integer width (`8080.0` becomes `8080`).
pub fn render_default(type_name: Option<&str>, value: &Literal) -> Option<String> {
    match value {
        Literal::Null | Literal::List(_) | Literal::Object(_) => None,
        Literal::Float(f) => {
            let narrowed = type_name
                .and_then(PrimitiveKind::from_type_name)
                .filter(|kind| kind.is_bounded_integer())
                .map(|kind| {
                    // `as i32` saturates, the narrower casts then wrap
                    let int = *f as i32;
                    match kind {
                        PrimitiveKind::Byte => (int as i8).to_string(),
                        PrimitiveKind::Short => (int as i16).to_string(),
                        _ => int.to_string(),
                    }
                });
            Some(narrowed.unwrap_or_else(|| value.to_string()))
        }
        other => Some(other.to_string()),
    }
}

impl PartialEq for PropertyNode {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for PropertyNode {}

impl PartialOrd for PropertyNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PropertyNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}
