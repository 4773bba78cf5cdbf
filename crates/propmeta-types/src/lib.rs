//! Shared types for propmeta.
//!
//! Contains the declared metadata records, hint data, type descriptors and
//! suggestion records used across parser, index, and completion crates.

pub mod descriptor;
pub mod hint;

pub use descriptor::{PrimitiveKind, TypeDescriptor, TypeShape};
pub use hint::{Hint, HintRole, HintValue};

use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A literal value as it appears in a metadata document.
///
/// Integral JSON numbers become `Integer`; anything with a fraction or
/// exponent becomes `Float`, which is why integer-typed defaults can show up
/// as `8080.0`.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<Literal>),
    Object(BTreeMap<String, Literal>),
}

impl From<serde_json::Value> for Literal {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Literal::Null,
            serde_json::Value::Bool(b) => Literal::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Literal::Integer(i),
                None => Literal::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Literal::Text(s),
            serde_json::Value::Array(items) => {
                Literal::List(items.into_iter().map(Literal::from).collect())
            }
            serde_json::Value::Object(map) => Literal::Object(
                map.into_iter().map(|(k, v)| (k, Literal::from(v))).collect(),
            ),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

impl<'de> Deserialize<'de> for Literal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Literal::from)
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Integer(i) => write!(f, "{}", i),
            // Debug keeps the trailing `.0` on integral floats
            Literal::Float(v) => write!(f, "{:?}", v),
            Literal::Text(s) => write!(f, "{}", s),
            Literal::List(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Literal::Object(map) => {
                let parts: Vec<String> = map.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

/// Severity of a deprecated property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeprecationLevel {
    #[default]
    Warning,
    Error,
}

/// Deprecation record attached to a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Deprecation {
    #[serde(default)]
    pub level: DeprecationLevel,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub replacement: Option<String>,
}

/// A property entry from the `properties` array of a metadata document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDecl {
    /// Dot-separated name (e.g. "server.servlet.path")
    #[serde(default)]
    pub name: String,
    /// Declared type name (e.g. "java.lang.Integer")
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Class that contributed this property
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub deprecation: Option<Deprecation>,
    /// Older documents flag deprecation with a bare boolean
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub default_value: Option<Literal>,
}

/// A group entry from the `groups` array of a metadata document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDecl {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_type: Option<String>,
}

/// A hint entry from the `hints` array of a metadata document.
#[derive(Debug, Clone, Deserialize)]
pub struct HintDecl {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub values: Vec<HintValue>,
}

/// How a property has been classified for traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Boolean,
    Leaf(PrimitiveKind),
    EnumeratedValues,
    Map,
    DelegatedClass,
    Undefined,
}

impl NodeKind {
    /// Kinds that end descent on their own, without consulting a delegate.
    pub fn represents_leaf(self) -> bool {
        matches!(
            self,
            NodeKind::Boolean | NodeKind::Leaf(_) | NodeKind::EnumeratedValues | NodeKind::Undefined
        )
    }
}

/// The kind of configuration file being completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FileType {
    #[default]
    Properties,
    Yaml,
}

impl FileType {
    /// Guess the file type from a path or URI.
    pub fn from_path(path: &str) -> Option<FileType> {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".properties") {
            Some(FileType::Properties)
        } else if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            Some(FileType::Yaml)
        } else {
            None
        }
    }
}

/// What a suggestion points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuggestionKind {
    Group,
    Property,
    MapKey,
    Field,
    Value,
}

/// A ranked completion candidate.
///
/// Equality and ordering use `display_text` only, so collecting into a
/// `BTreeSet` yields a sorted, duplicate-free result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// Text shown in the completion list (dotted path for keys)
    pub display_text: String,
    /// Names of the matched nodes, root first
    pub ancestor_path: Vec<String>,
    pub kind: SuggestionKind,
    pub short_type: Option<String>,
    pub description: Option<String>,
    pub default_value_text: Option<String>,
    pub deprecation_level: Option<DeprecationLevel>,
    pub append_colon: Option<bool>,
    /// No further key can follow (a value comes next)
    #[serde(default)]
    pub leaf: bool,
}

impl PartialEq for Suggestion {
    fn eq(&self, other: &Self) -> bool {
        self.display_text == other.display_text
    }
}

impl Eq for Suggestion {}

impl PartialOrd for Suggestion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Suggestion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.display_text.cmp(&other.display_text)
    }
}

/// Strip package qualifiers from a (possibly generic) type name.
///
/// `java.util.Map<java.lang.String,java.lang.Integer>` becomes
/// `Map<String,Integer>`.
pub fn shorten_type(type_name: &str) -> String {
    let mut out = String::with_capacity(type_name.len());
    let mut word = String::new();
    for c in type_name.chars() {
        if c.is_alphanumeric() || c == '_' || c == '.' || c == '$' {
            word.push(c);
        } else {
            out.push_str(last_name_part(&word));
            word.clear();
            out.push(c);
        }
    }
    out.push_str(last_name_part(&word));
    out
}

fn last_name_part(word: &str) -> &str {
    word.rsplit('.').next().unwrap_or(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_from_json() {
        let lit: Literal = serde_json::from_str("8080").unwrap();
        assert_eq!(lit, Literal::Integer(8080));
        let lit: Literal = serde_json::from_str("8080.0").unwrap();
        assert_eq!(lit, Literal::Float(8080.0));
        let lit: Literal = serde_json::from_str(r#"["a", 1]"#).unwrap();
        assert_eq!(
            lit,
            Literal::List(vec![Literal::Text("a".into()), Literal::Integer(1)])
        );
    }

    #[test]
    fn test_literal_display() {
        assert_eq!(Literal::Float(8080.0).to_string(), "8080.0");
        assert_eq!(Literal::Float(0.75).to_string(), "0.75");
        assert_eq!(Literal::Integer(-3).to_string(), "-3");
        assert_eq!(Literal::Bool(true).to_string(), "true");
        assert_eq!(Literal::Text("utf-8".into()).to_string(), "utf-8");
    }

    #[test]
    fn test_shorten_type() {
        assert_eq!(shorten_type("java.lang.String"), "String");
        assert_eq!(
            shorten_type("java.util.Map<java.lang.String,java.lang.Integer>"),
            "Map<String,Integer>"
        );
        assert_eq!(shorten_type("java.lang.String[]"), "String[]");
        assert_eq!(shorten_type("int"), "int");
    }

    #[test]
    fn test_suggestion_ordering_by_display_text() {
        let make = |text: &str, desc: Option<&str>| Suggestion {
            display_text: text.to_string(),
            ancestor_path: vec![],
            kind: SuggestionKind::Property,
            short_type: None,
            description: desc.map(str::to_string),
            default_value_text: None,
            deprecation_level: None,
            append_colon: None,
            leaf: true,
        };
        let set: std::collections::BTreeSet<Suggestion> = [
            make("server.port", None),
            make("server.address", None),
            make("server.port", Some("duplicate")),
        ]
        .into_iter()
        .collect();
        let texts: Vec<&str> = set.iter().map(|s| s.display_text.as_str()).collect();
        assert_eq!(texts, vec!["server.address", "server.port"]);
    }

    #[test]
    fn test_property_decl_deserialize() {
        let decl: PropertyDecl = serde_json::from_str(
            r#"{
                "name": "server.port",
                "type": "java.lang.Integer",
                "defaultValue": 8080,
                "deprecation": { "level": "error", "reason": "moved" }
            }"#,
        )
        .unwrap();
        assert_eq!(decl.type_name.as_deref(), Some("java.lang.Integer"));
        assert_eq!(decl.default_value, Some(Literal::Integer(8080)));
        let dep = decl.deprecation.unwrap();
        assert_eq!(dep.level, DeprecationLevel::Error);
        assert_eq!(dep.reason.as_deref(), Some("moved"));
    }

    #[test]
    fn test_file_type_from_path() {
        assert_eq!(
            FileType::from_path("file:///app/application.properties"),
            Some(FileType::Properties)
        );
        assert_eq!(FileType::from_path("application.yml"), Some(FileType::Yaml));
        assert_eq!(FileType::from_path("Main.java"), None);
    }
}
