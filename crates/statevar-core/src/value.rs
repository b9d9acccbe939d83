//! # Dynamic Values
//!
//! `Value` is the closed set of runtime values a state variable can hold.
//! It mirrors the primitive and container kinds that the type-tag table
//! knows about, so every value has a well-defined runtime [`TypeTag`]
//! (except `Value::None`, which has no type).
//!
//! Values arrive from three places: Rust literals via the `From` impls,
//! JSON documents via `serde_json::Value`, and YAML documents normalized
//! to JSON first (see [`crate::loader`]).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::TypeTag;

/// A dynamically-typed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Absence of a value.
    None,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// Complex number.
    Complex {
        /// Real part.
        re: f64,
        /// Imaginary part.
        im: f64,
    },
    /// UTF-8 string.
    Str(String),
    /// Ordered, mutable sequence.
    List(Vec<Value>),
    /// Ordered, fixed sequence.
    Tuple(Vec<Value>),
    /// Deduplicated collection, kept in insertion order.
    Set(Vec<Value>),
    /// String-keyed mapping.
    Dict(BTreeMap<String, Value>),
}

impl Value {
    /// Build a set, dropping duplicates while keeping first occurrence order.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        let mut out: Vec<Value> = Vec::new();
        for item in items {
            if !out.contains(&item) {
                out.push(item);
            }
        }
        Self::Set(out)
    }

    /// The runtime type of this value. `Value::None` has no type.
    pub fn type_tag(&self) -> Option<TypeTag> {
        match self {
            Self::None => None,
            Self::Bool(_) => Some(TypeTag::Bool),
            Self::Int(_) => Some(TypeTag::Int),
            Self::Float(_) => Some(TypeTag::Float),
            Self::Complex { .. } => Some(TypeTag::Complex),
            Self::Str(_) => Some(TypeTag::Str),
            Self::List(_) => Some(TypeTag::List),
            Self::Tuple(_) => Some(TypeTag::Tuple),
            Self::Set(_) => Some(TypeTag::Set),
            Self::Dict(_) => Some(TypeTag::Dict),
        }
    }

    /// Whether this is `Value::None`.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Borrow the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the mapping payload, if any.
    pub fn as_dict(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Dict(m) => Some(m),
            _ => None,
        }
    }

    /// Interpret the value as a float the way a numeric cast would:
    /// booleans and integers widen, strings are parsed after trimming.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Str(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Natural truthiness: empty/zero/None are false, everything else true.
    pub fn truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Complex { re, im } => *re != 0.0 || *im != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(v) | Self::Tuple(v) | Self::Set(v) => !v.is_empty(),
            Self::Dict(m) => !m.is_empty(),
        }
    }

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "'{s}'"),
            other => fmt::Display::fmt(other, f),
        }
    }
}

fn fmt_float(x: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 {
        write!(f, "{x:.1}")
    } else {
        write!(f, "{x}")
    }
}

fn fmt_items(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    close: &str,
    items: &[Value],
) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item.fmt_repr(f)?;
    }
    if open == "(" && items.len() == 1 {
        f.write_str(",")?;
    }
    f.write_str(close)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => fmt_float(*x, f),
            Self::Complex { re, im } => {
                let sign = if *im < 0.0 { '-' } else { '+' };
                write!(f, "({re}{sign}{}j)", im.abs())
            }
            Self::Str(s) => f.write_str(s),
            Self::List(items) => fmt_items(f, "[", "]", items),
            Self::Tuple(items) => fmt_items(f, "(", ")", items),
            Self::Set(items) if items.is_empty() => f.write_str("set()"),
            Self::Set(items) => fmt_items(f, "{", "}", items),
            Self::Dict(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{k}': ")?;
                    v.fmt_repr(f)?;
                }
                f.write_str("}")
            }
        }
    }
}

// ─── Conversions ─────────────────────────────────────────────────────

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::Str(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Dict(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::None, Into::into)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::Dict(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_numbers_split_into_int_and_float() {
        assert_eq!(Value::from(json!(3)), Value::Int(3));
        assert_eq!(Value::from(json!(1420.0)), Value::Float(1420.0));
        assert_eq!(Value::from(json!(null)), Value::None);
    }

    #[test]
    fn json_containers_map_to_list_and_dict() {
        let v = Value::from(json!({"a": [1, "x"], "b": true}));
        let map = v.as_dict().unwrap();
        assert_eq!(
            map["a"],
            Value::List(vec![Value::Int(1), Value::Str("x".into())])
        );
        assert_eq!(map["b"], Value::Bool(true));
    }

    #[test]
    fn type_tags_follow_variant() {
        assert_eq!(Value::None.type_tag(), None);
        assert_eq!(Value::from(1.5).type_tag(), Some(TypeTag::Float));
        assert_eq!(Value::from("abc").type_tag(), Some(TypeTag::Str));
        assert_eq!(Value::set(vec![]).type_tag(), Some(TypeTag::Set));
        assert_eq!(
            Value::Complex { re: 1.0, im: 0.0 }.type_tag(),
            Some(TypeTag::Complex)
        );
    }

    #[test]
    fn set_drops_duplicates() {
        let s = Value::set(vec![Value::Int(1), Value::Int(2), Value::Int(1)]);
        assert_eq!(s, Value::Set(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn display_is_python_like() {
        assert_eq!(Value::from(1420.0).to_string(), "1420.0");
        assert_eq!(Value::from(true).to_string(), "True");
        assert_eq!(Value::None.to_string(), "None");
        assert_eq!(
            Value::from(vec!["a", "b"]).to_string(),
            "['a', 'b']"
        );
        assert_eq!(Value::Tuple(vec![Value::Int(1)]).to_string(), "(1,)");
        assert_eq!(Value::Complex { re: 1.0, im: -2.0 }.to_string(), "(1-2j)");
    }

    #[test]
    fn numeric_cast_accepts_numeric_strings() {
        assert_eq!(Value::from(" 2.5 ").as_number(), Some(2.5));
        assert_eq!(Value::from("abc").as_number(), None);
        assert_eq!(Value::from(true).as_number(), Some(1.0));
        assert_eq!(Value::from(vec![1]).as_number(), None);
    }

    #[test]
    fn truthiness() {
        assert!(!Value::from("").truthy());
        assert!(Value::from(vec![0]).truthy());
        assert!(!Value::Int(0).truthy());
    }

    #[test]
    fn deserializes_through_json() {
        let v: Value = serde_json::from_str(r#"{"x": [1, 2.5]}"#).unwrap();
        assert_eq!(
            v.as_dict().unwrap()["x"],
            Value::List(vec![Value::Int(1), Value::Float(2.5)])
        );
    }
}
