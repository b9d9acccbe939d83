//! # Governance Parameters
//!
//! The fixed schema of registry-wide settings:
//!
//! | name | type | allowed values | default |
//! |---|---|---|---|
//! | `label` | string | any | `StateVarDef` |
//! | `note` | string | any | `StateVariable class` |
//! | `verbose` | bool | true/false | `false` |
//! | `enforce_set` | bool | true/false | `false` |
//! | `enforce_type` | bool | true/false | `false` |
//! | `notify_set` | enum | ignore/alert/error | `ignore` |
//! | `notify_type` | enum | ignore/alert/error | `ignore` |
//! | `package` | string | package name, file reference, or `user` | `default` |
//!
//! Every field always holds a value that conforms to its schema. Input
//! arrives as loose [`Value`]s and goes through [`ParamKey::coerce`]
//! before it can reach a [`Governance`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use statevar_core::{canonical_bool, StateVarError, Value};

/// Ordered map of loose governance parameter input, keyed by parameter name.
pub type ParamMap = BTreeMap<String, Value>;

/// Canonical spelling of a parameter name. Recognised names are matched
/// case-insensitively; anything else passes through unchanged.
pub fn canonical_param_name(key: &str) -> String {
    key.parse::<ParamKey>()
        .map_or_else(|_| key.to_string(), |k| k.as_str().to_string())
}

/// Rewrite every recognised key of `params` to its canonical spelling.
pub fn canonical_params(params: ParamMap) -> ParamMap {
    params
        .into_iter()
        .map(|(k, v)| (canonical_param_name(&k), v))
        .collect()
}

/// Package name recorded once governance no longer matches a named package.
pub const USER_PACKAGE: &str = "user";

// ─── Notify Mode ─────────────────────────────────────────────────────

/// How a non-conforming variable update is reported.
///
/// Variants are ordered from least to most strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyMode {
    /// Say nothing.
    Ignore,
    /// Emit an advisory notice.
    Alert,
    /// Fail the update with a validation error.
    Error,
}

impl NotifyMode {
    /// Allowed choices, least strict first.
    pub fn choices() -> &'static [NotifyMode] {
        &[Self::Ignore, Self::Alert, Self::Error]
    }

    /// The most strict choice, used as the fallback for invalid input.
    pub fn strictest() -> Self {
        Self::Error
    }

    /// The string identifier for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Alert => "alert",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for NotifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotifyMode {
    type Err = StateVarError;

    /// Case-insensitive match against the choice list.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::choices()
            .iter()
            .copied()
            .find(|m| m.as_str() == lower)
            .ok_or_else(|| {
                StateVarError::Configuration(format!(
                    "invalid notify choice {s:?}; must be one of ignore, alert, error"
                ))
            })
    }
}

// ─── Parameter Keys ──────────────────────────────────────────────────

/// The governance parameter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKey {
    /// Registry label, used as the diagnostic prefix.
    Label,
    /// Free-text note.
    Note,
    /// Verbose diagnostics.
    Verbose,
    /// Reject updates that introduce new names.
    EnforceSet,
    /// Reject updates whose value has the wrong type.
    EnforceType,
    /// Reporting for new-name updates.
    NotifySet,
    /// Reporting for wrong-type updates.
    NotifyType,
    /// Name of the active policy package.
    Package,
}

impl ParamKey {
    /// Every key, in schema order.
    pub fn all() -> &'static [ParamKey] {
        &[
            Self::Label,
            Self::Note,
            Self::Verbose,
            Self::EnforceSet,
            Self::EnforceType,
            Self::NotifySet,
            Self::NotifyType,
            Self::Package,
        ]
    }

    /// The parameter name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Label => "label",
            Self::Note => "note",
            Self::Verbose => "verbose",
            Self::EnforceSet => "enforce_set",
            Self::EnforceType => "enforce_type",
            Self::NotifySet => "notify_set",
            Self::NotifyType => "notify_type",
            Self::Package => "package",
        }
    }

    /// Coerce a loose value into this parameter's schema.
    ///
    /// - Boolean parameters go through [`canonical_bool`]; ambiguous strings
    ///   are a hard error.
    /// - Notify parameters match case-insensitively and fall back to the
    ///   strictest mode (with a note) on any mismatch.
    /// - String parameters accept strings only. `package` additionally
    ///   accepts an inline package mapping and takes its `package` entry
    ///   (or `user`) as the name.
    pub fn coerce(&self, value: &Value) -> Result<Coercion, StateVarError> {
        let coerced = match self {
            Self::Verbose | Self::EnforceSet | Self::EnforceType => {
                Coercion::valid(*self, ParamValue::Flag(canonical_bool(value)?))
            }
            Self::NotifySet | Self::NotifyType => {
                match value.as_str().map(NotifyMode::from_str) {
                    Some(Ok(mode)) => Coercion::valid(*self, ParamValue::Notify(mode)),
                    _ => {
                        let fallback = NotifyMode::strictest();
                        Coercion::Valid {
                            key: *self,
                            value: ParamValue::Notify(fallback),
                            note: Some(format!(
                                "invalid {} choice [{value}] - must be one of ignore, alert, error; using {fallback}",
                                self.as_str()
                            )),
                        }
                    }
                }
            }
            Self::Label | Self::Note => match value {
                Value::Str(s) => Coercion::valid(*self, ParamValue::Text(s.clone())),
                other => Coercion::invalid(self.as_str(), other),
            },
            Self::Package => match value {
                Value::Str(s) => Coercion::valid(*self, ParamValue::Text(s.clone())),
                Value::Dict(map) => {
                    let name = map
                        .get(self.as_str())
                        .and_then(Value::as_str)
                        .unwrap_or(USER_PACKAGE);
                    Coercion::valid(*self, ParamValue::Text(name.to_string()))
                }
                other => Coercion::invalid(self.as_str(), other),
            },
        };
        Ok(coerced)
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamKey {
    type Err = StateVarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| {
                StateVarError::Configuration(format!("{s} is not a governance parameter"))
            })
    }
}

// ─── Coerced Values ──────────────────────────────────────────────────

/// A governance value that already conforms to its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// String parameter.
    Text(String),
    /// Boolean parameter.
    Flag(bool),
    /// Notify-mode parameter.
    Notify(NotifyMode),
}

impl ParamValue {
    /// Loose form, suitable for a [`ParamMap`].
    pub fn to_value(&self) -> Value {
        match self {
            Self::Text(s) => Value::Str(s.clone()),
            Self::Flag(b) => Value::Bool(*b),
            Self::Notify(m) => Value::Str(m.as_str().to_string()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_value(), f)
    }
}

/// Result of coercing one governance input.
#[derive(Debug, Clone, PartialEq)]
pub enum Coercion {
    /// The input conforms (possibly after a fallback described by `note`).
    Valid {
        /// Parameter the value belongs to.
        key: ParamKey,
        /// Conforming value.
        value: ParamValue,
        /// Diagnostic for a fallback substitution.
        note: Option<String>,
    },
    /// The input does not conform; the prior value must be retained.
    Invalid {
        /// Parameter name as given.
        key: String,
        /// Offending input.
        value: Value,
    },
}

impl Coercion {
    fn valid(key: ParamKey, value: ParamValue) -> Self {
        Self::Valid {
            key,
            value,
            note: None,
        }
    }

    pub(crate) fn invalid(key: &str, value: &Value) -> Self {
        Self::Invalid {
            key: key.to_string(),
            value: value.clone(),
        }
    }
}

// ─── Governance ──────────────────────────────────────────────────────

/// Current governance parameter values of a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Governance {
    /// Registry label.
    pub label: String,
    /// Free-text note.
    pub note: String,
    /// Verbose diagnostics.
    pub verbose: bool,
    /// Reject updates that introduce new names.
    pub enforce_set: bool,
    /// Reject updates whose value has the wrong type.
    pub enforce_type: bool,
    /// Reporting for new-name updates.
    pub notify_set: NotifyMode,
    /// Reporting for wrong-type updates.
    pub notify_type: NotifyMode,
    /// Active package name.
    pub package: String,
}

impl Default for Governance {
    fn default() -> Self {
        Self {
            label: "StateVarDef".to_string(),
            note: "StateVariable class".to_string(),
            verbose: false,
            enforce_set: false,
            enforce_type: false,
            notify_set: NotifyMode::Ignore,
            notify_type: NotifyMode::Ignore,
            package: "default".to_string(),
        }
    }
}

impl Governance {
    /// Read one parameter.
    pub fn get(&self, key: ParamKey) -> ParamValue {
        match key {
            ParamKey::Label => ParamValue::Text(self.label.clone()),
            ParamKey::Note => ParamValue::Text(self.note.clone()),
            ParamKey::Verbose => ParamValue::Flag(self.verbose),
            ParamKey::EnforceSet => ParamValue::Flag(self.enforce_set),
            ParamKey::EnforceType => ParamValue::Flag(self.enforce_type),
            ParamKey::NotifySet => ParamValue::Notify(self.notify_set),
            ParamKey::NotifyType => ParamValue::Notify(self.notify_type),
            ParamKey::Package => ParamValue::Text(self.package.clone()),
        }
    }

    /// Write one parameter. Returns `true` if the stored value changed.
    ///
    /// A value of the wrong shape for `key` is ignored and reported as
    /// unchanged; [`ParamKey::coerce`] never produces one.
    pub fn set(&mut self, key: ParamKey, value: ParamValue) -> bool {
        if self.get(key) == value {
            return false;
        }
        match (key, value) {
            (ParamKey::Label, ParamValue::Text(s)) => self.label = s,
            (ParamKey::Note, ParamValue::Text(s)) => self.note = s,
            (ParamKey::Package, ParamValue::Text(s)) => self.package = s,
            (ParamKey::Verbose, ParamValue::Flag(b)) => self.verbose = b,
            (ParamKey::EnforceSet, ParamValue::Flag(b)) => self.enforce_set = b,
            (ParamKey::EnforceType, ParamValue::Flag(b)) => self.enforce_type = b,
            (ParamKey::NotifySet, ParamValue::Notify(m)) => self.notify_set = m,
            (ParamKey::NotifyType, ParamValue::Notify(m)) => self.notify_type = m,
            _ => return false,
        }
        true
    }

    /// Every parameter in loose form, in schema order.
    pub fn to_params(&self) -> ParamMap {
        ParamKey::all()
            .iter()
            .map(|k| (k.as_str().to_string(), self.get(*k).to_value()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_schema_table() {
        let g = Governance::default();
        assert_eq!(g.label, "StateVarDef");
        assert_eq!(g.note, "StateVariable class");
        assert!(!g.verbose && !g.enforce_set && !g.enforce_type);
        assert_eq!(g.notify_set, NotifyMode::Ignore);
        assert_eq!(g.notify_type, NotifyMode::Ignore);
        assert_eq!(g.package, "default");
    }

    #[test]
    fn notify_mode_parses_case_insensitively() {
        assert_eq!("ALERT".parse::<NotifyMode>().unwrap(), NotifyMode::Alert);
        assert!("loud".parse::<NotifyMode>().is_err());
        assert!(NotifyMode::Ignore < NotifyMode::Error);
    }

    #[test]
    fn key_parse_is_case_insensitive() {
        assert_eq!("Enforce_Set".parse::<ParamKey>().unwrap(), ParamKey::EnforceSet);
        assert!("state".parse::<ParamKey>().is_err());
    }

    #[test]
    fn bool_params_use_canonical_bool() {
        let c = ParamKey::Verbose.coerce(&Value::from("yes")).unwrap();
        assert!(matches!(c, Coercion::Valid { value: ParamValue::Flag(true), .. }));
        assert!(ParamKey::EnforceSet.coerce(&Value::from("perhaps")).is_err());
    }

    #[test]
    fn invalid_notify_falls_back_to_error_with_note() {
        match ParamKey::NotifySet.coerce(&Value::from("loud")).unwrap() {
            Coercion::Valid { value, note, .. } => {
                assert_eq!(value, ParamValue::Notify(NotifyMode::Error));
                assert!(note.unwrap().contains("loud"));
            }
            other => panic!("unexpected {other:?}"),
        }
        let c = ParamKey::NotifyType.coerce(&Value::from("Alert")).unwrap();
        assert!(matches!(
            c,
            Coercion::Valid { value: ParamValue::Notify(NotifyMode::Alert), note: None, .. }
        ));
    }

    #[test]
    fn string_params_reject_other_types() {
        let c = ParamKey::Label.coerce(&Value::Int(3)).unwrap();
        assert!(matches!(c, Coercion::Invalid { key, .. } if key == "label"));
    }

    #[test]
    fn canonical_names_fold_case_only_for_known_keys() {
        assert_eq!(canonical_param_name("Enforce_Type"), "enforce_type");
        assert_eq!(canonical_param_name("Shoe_Size"), "Shoe_Size");
    }

    #[test]
    fn package_accepts_inline_mapping_name() {
        let mut map = ParamMap::new();
        map.insert("verbose".into(), Value::Bool(true));
        let c = ParamKey::Package.coerce(&Value::Dict(map)).unwrap();
        assert!(matches!(
            c,
            Coercion::Valid { value: ParamValue::Text(s), .. } if s == USER_PACKAGE
        ));
    }

    #[test]
    fn set_reports_change() {
        let mut g = Governance::default();
        assert!(!g.set(ParamKey::Verbose, ParamValue::Flag(false)));
        assert!(g.set(ParamKey::Verbose, ParamValue::Flag(true)));
        assert!(!g.set(ParamKey::Verbose, ParamValue::Text("x".into())));
        assert!(g.verbose);
    }

    #[test]
    fn to_params_lists_every_key() {
        let params = Governance::default().to_params();
        assert_eq!(params.len(), ParamKey::all().len());
        assert_eq!(params["notify_type"], Value::from("ignore"));
    }
}
