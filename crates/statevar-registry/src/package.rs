//! # Policy Packages
//!
//! A package is a named, reusable bundle of governance overrides. Each
//! registry owns its own [`PackageTable`]; registering a user mapping on
//! one registry never leaks into another.
//!
//! ## Built-ins
//!
//! | package | verbose | enforce_set | enforce_type | notify_set | notify_type |
//! |---|---|---|---|---|---|
//! | `default` | false | false | false | ignore | ignore |
//! | `minimal` | false | false | false | ignore | ignore |
//! | `middle`  | true  | true  | false | alert  | alert  |
//! | `maximal` | true  | true  | true  | error  | error  |
//! | `init`    | (kept) | false | false | ignore | ignore |
//!
//! `init` leaves `verbose` alone; it exists for one-shot bootstrap
//! overrides.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use statevar_core::{is_structured_path, Value};

use crate::governance::{Governance, NotifyMode, ParamKey, ParamMap, USER_PACKAGE};

/// Name of the bootstrap package.
pub const INIT_PACKAGE: &str = "init";

/// A named bundle of governance overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyPackage {
    /// Package name.
    pub name: String,
    /// Overrides, keyed by parameter name. Never contains `package` itself.
    pub overrides: ParamMap,
}

impl PolicyPackage {
    /// Build a package, dropping any `package` entry from `overrides`.
    pub fn new(name: impl Into<String>, mut overrides: ParamMap) -> Self {
        overrides.remove(ParamKey::Package.as_str());
        Self {
            name: name.into(),
            overrides,
        }
    }

    /// The overrides plus a `package` entry naming this package.
    pub fn to_params(&self) -> ParamMap {
        let mut params = self.overrides.clone();
        params.insert(
            ParamKey::Package.as_str().to_string(),
            Value::Str(self.name.clone()),
        );
        params
    }
}

fn enforcement(
    verbose: Option<bool>,
    enforce_set: bool,
    enforce_type: bool,
    notify_set: NotifyMode,
    notify_type: NotifyMode,
) -> ParamMap {
    let mut map = ParamMap::new();
    if let Some(v) = verbose {
        map.insert(ParamKey::Verbose.as_str().into(), Value::Bool(v));
    }
    map.insert(ParamKey::EnforceSet.as_str().into(), Value::Bool(enforce_set));
    map.insert(ParamKey::EnforceType.as_str().into(), Value::Bool(enforce_type));
    map.insert(ParamKey::NotifySet.as_str().into(), Value::from(notify_set.as_str()));
    map.insert(ParamKey::NotifyType.as_str().into(), Value::from(notify_type.as_str()));
    map
}

/// Per-registry table of named packages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageTable {
    packages: BTreeMap<String, PolicyPackage>,
}

impl Default for PackageTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PackageTable {
    /// An empty table with no packages at all.
    pub fn empty() -> Self {
        Self {
            packages: BTreeMap::new(),
        }
    }

    /// A table seeded with `default`, `minimal`, `middle`, `maximal` and `init`.
    pub fn builtin() -> Self {
        let defaults = Governance::default();
        let mut table = Self::empty();
        table.register(PolicyPackage::new(
            "default",
            enforcement(
                Some(defaults.verbose),
                defaults.enforce_set,
                defaults.enforce_type,
                defaults.notify_set,
                defaults.notify_type,
            ),
        ));
        table.register(PolicyPackage::new(
            "minimal",
            enforcement(Some(false), false, false, NotifyMode::Ignore, NotifyMode::Ignore),
        ));
        table.register(PolicyPackage::new(
            "middle",
            enforcement(Some(true), true, false, NotifyMode::Alert, NotifyMode::Alert),
        ));
        table.register(PolicyPackage::new(
            "maximal",
            enforcement(Some(true), true, true, NotifyMode::Error, NotifyMode::Error),
        ));
        table.register(PolicyPackage::new(
            INIT_PACKAGE,
            enforcement(None, false, false, NotifyMode::Ignore, NotifyMode::Ignore),
        ));
        table
    }

    /// Insert or replace a package under its own name.
    pub fn register(&mut self, package: PolicyPackage) {
        self.packages.insert(package.name.clone(), package);
    }

    /// Look up a package by name.
    pub fn get(&self, name: &str) -> Option<&PolicyPackage> {
        self.packages.get(name)
    }

    /// Whether a package is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Registered package names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }
}

/// How a caller refers to a package.
#[derive(Debug, Clone, PartialEq)]
pub enum PackageRef {
    /// No package; resolves to an empty update.
    None,
    /// A package name (known or not).
    Named(String),
    /// A `path[:key[:subkey]]` reference to a JSON/YAML file.
    File(String),
    /// An inline mapping. Its `package` entry names it (default `user`).
    Inline(ParamMap),
}

impl PackageRef {
    /// A reference to a named package.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Classify a loose value: `None`/`"none"` → `None`, a string with a
    /// structured-data extension → `File`, any other string → `Named`,
    /// a mapping → `Inline`. Returns `None` for any other kind.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::None => Some(Self::None),
            Value::Str(s) => Some(Self::from(s.as_str())),
            Value::Dict(map) => Some(Self::Inline(map.clone())),
            _ => None,
        }
    }

    /// The name the package is (or would be) registered under.
    pub fn name(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Named(s) | Self::File(s) => Some(s.clone()),
            Self::Inline(map) => Some(
                map.get(ParamKey::Package.as_str())
                    .and_then(Value::as_str)
                    .unwrap_or(USER_PACKAGE)
                    .to_string(),
            ),
        }
    }
}

impl From<&str> for PackageRef {
    fn from(s: &str) -> Self {
        if s == "none" || s == "None" {
            Self::None
        } else if is_structured_path(s) {
            Self::File(s.to_string())
        } else {
            Self::Named(s.to_string())
        }
    }
}

impl From<ParamMap> for PackageRef {
    fn from(map: ParamMap) -> Self {
        Self::Inline(map)
    }
}
