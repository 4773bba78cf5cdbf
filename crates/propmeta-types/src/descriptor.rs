//! Structural type descriptors produced by a type resolver.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scalar kinds that end path descent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
    String,
}

impl PrimitiveKind {
    /// Classify a primitive or boxed JVM type name.
    pub fn from_type_name(name: &str) -> Option<PrimitiveKind> {
        let kind = match name {
            "boolean" | "java.lang.Boolean" => PrimitiveKind::Boolean,
            "byte" | "java.lang.Byte" => PrimitiveKind::Byte,
            "short" | "java.lang.Short" => PrimitiveKind::Short,
            "int" | "java.lang.Integer" => PrimitiveKind::Int,
            "long" | "java.lang.Long" => PrimitiveKind::Long,
            "float" | "java.lang.Float" => PrimitiveKind::Float,
            "double" | "java.lang.Double" => PrimitiveKind::Double,
            "char" | "java.lang.Character" => PrimitiveKind::Char,
            "java.lang.String" | "java.lang.CharSequence" => PrimitiveKind::String,
            _ => return None,
        };
        Some(kind)
    }

    /// True for the bare (unboxed) spelling, e.g. `int` rather than `java.lang.Integer`.
    pub fn is_unboxed_name(name: &str) -> bool {
        matches!(
            name,
            "boolean" | "byte" | "short" | "int" | "long" | "float" | "double" | "char"
        )
    }

    /// Fully qualified name of the boxed form.
    pub fn boxed_type_name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "java.lang.Boolean",
            PrimitiveKind::Byte => "java.lang.Byte",
            PrimitiveKind::Short => "java.lang.Short",
            PrimitiveKind::Int => "java.lang.Integer",
            PrimitiveKind::Long => "java.lang.Long",
            PrimitiveKind::Float => "java.lang.Float",
            PrimitiveKind::Double => "java.lang.Double",
            PrimitiveKind::Char => "java.lang.Character",
            PrimitiveKind::String => "java.lang.String",
        }
    }

    /// Unqualified name of the boxed form.
    pub fn short_type_name(self) -> &'static str {
        let fqn = self.boxed_type_name();
        fqn.rsplit('.').next().unwrap_or(fqn)
    }

    /// `byte`, `short` and `int`: kinds whose defaults get narrowed on display.
    pub fn is_bounded_integer(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte | PrimitiveKind::Short | PrimitiveKind::Int
        )
    }

    /// Whether `literal` is a well-formed literal of this kind.
    ///
    /// Empty input never parses. Failure means "no match", not an error.
    pub fn parses(self, literal: &str) -> bool {
        if literal.is_empty() {
            return false;
        }
        match self {
            PrimitiveKind::Boolean => {
                literal.eq_ignore_ascii_case("true") || literal.eq_ignore_ascii_case("false")
            }
            PrimitiveKind::Byte => literal.parse::<i8>().is_ok(),
            PrimitiveKind::Short => literal.parse::<i16>().is_ok(),
            PrimitiveKind::Int => literal.parse::<i32>().is_ok(),
            PrimitiveKind::Long => literal.parse::<i64>().is_ok(),
            PrimitiveKind::Float | PrimitiveKind::Double => parses_floating(literal),
            PrimitiveKind::Char => literal.chars().count() == 1,
            PrimitiveKind::String => true,
        }
    }
}

/// Floating literal grammar: optional sign, decimal digits with optional
/// fraction and exponent, an optional `f`/`d` suffix, or `NaN`/`Infinity`.
/// Surrounding whitespace is tolerated.
fn parses_floating(literal: &str) -> bool {
    let trimmed = literal.trim();
    let unsigned = trimmed
        .strip_prefix('+')
        .or_else(|| trimmed.strip_prefix('-'))
        .unwrap_or(trimmed);
    if unsigned == "NaN" || unsigned == "Infinity" {
        return true;
    }
    let body = unsigned
        .strip_suffix(&['f', 'F', 'd', 'D'][..])
        .unwrap_or(unsigned);
    // rejects `inf`, `nan` and friends that f64::from_str would accept
    if body
        .chars()
        .any(|c| !(c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || c == '+' || c == '-'))
    {
        return false;
    }
    body.parse::<f64>().is_ok()
}

/// Structural classification of a declared type.
///
/// Element, key, value and field types are type names; they are resolved
/// lazily when traversal reaches them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeShape {
    Primitive { primitive: PrimitiveKind },
    Boxed { primitive: PrimitiveKind },
    Array { element: String },
    Iterable { element: String },
    Map { key: String, value: String },
    Enum { constants: Vec<String> },
    Bean { fields: BTreeMap<String, String> },
    Unknown,
}

/// A resolved type: its fully qualified name plus its shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
    pub shape: TypeShape,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, shape: TypeShape) -> Self {
        TypeDescriptor {
            name: name.into(),
            shape,
        }
    }

    /// Unqualified type name, generics shortened too.
    pub fn short_name(&self) -> String {
        crate::shorten_type(&self.name)
    }

    /// The scalar kind for primitive and boxed shapes.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.shape {
            TypeShape::Primitive { primitive } | TypeShape::Boxed { primitive } => Some(primitive),
            _ => None,
        }
    }
}
