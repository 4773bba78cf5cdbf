//! Hints: explicit enumerations of known keys or values for a property.

use crate::Literal;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One enumerated candidate value (or map key) with an optional description.
///
/// Compared and ordered by the textual form of the literal.
#[derive(Debug, Clone, Deserialize)]
pub struct HintValue {
    pub value: Literal,
    #[serde(default)]
    pub description: Option<String>,
}

impl HintValue {
    pub fn new(value: impl Into<Literal>, description: Option<String>) -> Self {
        HintValue {
            value: value.into(),
            description,
        }
    }

    /// Textual form used for matching and display.
    pub fn text(&self) -> String {
        self.value.to_string()
    }

    /// Case-sensitive prefix match against the textual form.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.text().starts_with(prefix)
    }
}

impl PartialEq for HintValue {
    fn eq(&self, other: &Self) -> bool {
        self.text() == other.text()
    }
}

impl Eq for HintValue {}

impl PartialOrd for HintValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HintValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text().cmp(&other.text())
    }
}

/// Which part of its property a hint enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HintRole {
    /// Values of a plain (non-map) property.
    #[default]
    Generic,
    /// Keys of a map-typed property (`<name>.keys`).
    MapKeys,
    /// Values of a map-typed property (`<name>.values`).
    MapValues,
}

impl HintRole {
    /// Split a hint name into its target property name and role.
    ///
    /// `logging.level.keys` targets `logging.level` as `MapKeys`.
    pub fn split_hint_name(hint_name: &str) -> (&str, HintRole) {
        if let Some(target) = hint_name.strip_suffix(".keys") {
            (target, HintRole::MapKeys)
        } else if let Some(target) = hint_name.strip_suffix(".values") {
            (target, HintRole::MapValues)
        } else {
            (hint_name, HintRole::Generic)
        }
    }
}

/// A named set of hint values, unique by textual value.
#[derive(Debug, Clone, Default)]
pub struct Hint {
    pub name: String,
    role: HintRole,
    values: BTreeMap<String, HintValue>,
}

impl Hint {
    /// Build a hint. A later value with the same text replaces an earlier one.
    pub fn new(
        name: impl Into<String>,
        role: HintRole,
        values: impl IntoIterator<Item = HintValue>,
    ) -> Self {
        let values = values.into_iter().map(|v| (v.text(), v)).collect();
        Hint {
            name: name.into(),
            role,
            values,
        }
    }

    pub fn role(&self) -> HintRole {
        self.role
    }

    /// Exact lookup by textual value.
    pub fn find_exact(&self, name: &str) -> Option<&HintValue> {
        self.values.get(name)
    }

    /// All values whose text starts with `prefix`, in name order.
    pub fn find_by_prefix(&self, prefix: &str) -> Vec<&HintValue> {
        self.values
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(|(_, value)| value.matches_prefix(prefix))
            .map(|(_, value)| value)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn represents_map_key_role(&self) -> bool {
        self.role == HintRole::MapKeys
    }

    pub fn represents_map_value_role(&self) -> bool {
        self.role == HintRole::MapValues
    }

    /// True when the hint enumerates the values of a plain leaf property.
    pub fn has_predefined_values(&self) -> bool {
        !self.values.is_empty() && self.role == HintRole::Generic
    }
}
