//! # Canonical Boolean Coercion
//!
//! Turns loose yes/no style input into a `bool`. Strings are judged by
//! their first character only, case-insensitively:
//!
//! | first char | result |
//! |---|---|
//! | `f`, `n`, `0` | `false` |
//! | `t`, `y`, `1` | `true` |
//! | anything else | [`StateVarError::AmbiguousBool`] |
//!
//! Every non-string value uses its natural truthiness.

use crate::error::StateVarError;
use crate::value::Value;

/// Coerce a value to a canonical boolean.
///
/// # Errors
///
/// Returns [`StateVarError::AmbiguousBool`] for strings (including the
/// empty string) whose first character is not one of `fFnN0tTyY1`.
pub fn canonical_bool(input: &Value) -> Result<bool, StateVarError> {
    match input {
        Value::Bool(b) => Ok(*b),
        Value::Str(s) => bool_from_str(s),
        other => Ok(other.truthy()),
    }
}

/// String form of [`canonical_bool`], used for interactive answers.
pub fn bool_from_str(s: &str) -> Result<bool, StateVarError> {
    match s.chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('f' | 'n' | '0') => Ok(false),
        Some('t' | 'y' | '1') => Ok(true),
        _ => Err(StateVarError::AmbiguousBool(s.to_string())),
    }
}
