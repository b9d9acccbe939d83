//! # Type Tags
//!
//! Defines `TypeTag`, the fixed set of runtime types a state variable can
//! be declared with, and `TypeSpec`, the declaration form that may also
//! say "infer from the value" (`auto`) or "no type" (`none`).
//!
//! Aliases are resolved through one table. Strings outside that table are
//! rejected at the boundary rather than silently treated as `str`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::StateVarError;
use crate::value::Value;

/// The runtime type of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    /// Double-precision float.
    Float,
    /// Signed integer.
    Int,
    /// Boolean.
    Bool,
    /// String.
    Str,
    /// List.
    List,
    /// String-keyed mapping.
    Dict,
    /// Deduplicated collection.
    Set,
    /// Fixed sequence.
    Tuple,
    /// Complex number.
    Complex,
}

impl TypeTag {
    /// Every tag, in alias-table order.
    pub fn all() -> &'static [TypeTag] {
        &[
            Self::Float,
            Self::Int,
            Self::Bool,
            Self::Str,
            Self::List,
            Self::Dict,
            Self::Set,
            Self::Tuple,
            Self::Complex,
        ]
    }

    /// The alias string for this tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Str => "str",
            Self::List => "list",
            Self::Dict => "dict",
            Self::Set => "set",
            Self::Tuple => "tuple",
            Self::Complex => "complex",
        }
    }

    /// Whether `value` has this runtime type.
    pub fn matches(&self, value: &Value) -> bool {
        value.type_tag() == Some(*self)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = StateVarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| StateVarError::UnknownTypeTag(s.to_string()))
    }
}

/// A type declaration as written by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TypeSpec {
    /// Infer from the runtime type of the value.
    #[default]
    Auto,
    /// Explicitly untyped; the type gate never fires.
    Untyped,
    /// A concrete type.
    Tag(TypeTag),
}

impl TypeSpec {
    /// The alias string for this spec.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Untyped => "none",
            Self::Tag(t) => t.as_str(),
        }
    }
}

impl From<TypeTag> for TypeSpec {
    fn from(tag: TypeTag) -> Self {
        Self::Tag(tag)
    }
}

impl From<Option<TypeTag>> for TypeSpec {
    fn from(tag: Option<TypeTag>) -> Self {
        tag.map_or(Self::Untyped, Self::Tag)
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeSpec {
    type Err = StateVarError;

    /// Parse a type alias. `auto` and `none` are case-insensitive; the
    /// concrete aliases are matched exactly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => return Ok(Self::Auto),
            "none" => return Ok(Self::Untyped),
            _ => {}
        }
        TypeTag::from_str(s).map(Self::Tag)
    }
}

impl Serialize for TypeSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TypeSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(Self::Untyped),
            Some(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Resolve a type declaration against an example value.
///
/// `Tag` passes through, `Untyped` yields `None`, and `Auto` yields the
/// runtime type of `example` (or `None` when there is no example or the
/// example is itself `None`).
pub fn canonical_type(spec: TypeSpec, example: Option<&Value>) -> Option<TypeTag> {
    match spec {
        TypeSpec::Tag(tag) => Some(tag),
        TypeSpec::Untyped => None,
        TypeSpec::Auto => example.and_then(Value::type_tag),
    }
}
