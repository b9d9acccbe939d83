//! # Registry: Variables Under a Governance Policy
//!
//! The registry owns a set of named [`VariableDescriptor`]s, the
//! [`Governance`] parameters that decide how updates to them are policed,
//! and a per-registry [`PackageTable`].
//!
//! ## Update flow
//!
//! ```text
//! Request ──▶ resolve package ──▶ verbose ──▶ other parameters ──▶ state
//!              (explicit keys win)                 │                  │
//!                                       package := "user"       upsert each
//!                                       if anything changed     (set gate, type gate)
//! ```
//!
//! ## Validation gates
//!
//! Every variable update passes two independent gates:
//!
//! | gate | trips when | enforce flag | notify mode |
//! |---|---|---|---|
//! | set | the name is not yet declared | `enforce_set` | `notify_set` |
//! | type | a concrete expected type is known and the value's runtime type differs | `enforce_type` | `notify_type` |
//!
//! A tripped gate drops the update when its enforce flag is on. The notify
//! mode then decides what the caller hears: nothing (`ignore`), a notice
//! (`alert`), or a [`ValidationError`] (`error`, regardless of enforce).
//!
//! Updates are applied key by key and variable by variable. An error part
//! way through leaves earlier updates from the same request committed.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Deref, DerefMut};

use statevar_core::{
    canonical_type, load_reference, StateVarError, TypeSpec, ValidationError, Value,
};

use crate::descriptor::{DescriptorPatch, StateInput, VariableDescriptor};
use crate::governance::{
    canonical_param_name, canonical_params, Coercion, Governance, NotifyMode, ParamKey, ParamMap,
    USER_PACKAGE,
};
use crate::outcome::{ApplyOutcome, Gate, Notice, NoticeKind, UpsertOutcome};
use crate::package::{PackageRef, PackageTable, PolicyPackage};
use crate::report::{elide, Report, ReportRow, DEFAULT_MAX_ENTRY_LEN};

// ─── Request ─────────────────────────────────────────────────────────

/// One mutation request: governance updates, an optional package, and
/// optional state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    params: ParamMap,
    package: Option<PackageRef>,
    state: Option<StateInput>,
}

impl Request {
    /// An empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one governance parameter.
    ///
    /// Names are matched case-insensitively. A `package` entry that names,
    /// references or inlines a package selects it, exactly as
    /// [`Request::package`] would.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = canonical_param_name(&key.into());
        let value = value.into();
        if key == ParamKey::Package.as_str() {
            if let Some(package) = PackageRef::from_value(&value) {
                self.package = Some(package);
                return self;
            }
        }
        self.params.insert(key, value);
        self
    }

    /// Set several governance parameters.
    pub fn params(self, params: ParamMap) -> Self {
        params
            .into_iter()
            .fold(self, |request, (key, value)| request.param(key, value))
    }

    /// Select a package.
    pub fn package(mut self, package: impl Into<PackageRef>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Supply state.
    pub fn state(mut self, state: StateInput) -> Self {
        self.state = Some(state);
        self
    }

    /// Whether nothing at all was requested.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.package.is_none() && self.state.is_none()
    }

    /// Split off the state part, leaving governance only.
    pub fn take_state(&mut self) -> Option<StateInput> {
        self.state.take()
    }

    /// Build a request from a loose mapping: `package` and `state` entries
    /// are routed to their slots and everything else is a parameter.
    pub fn from_map(map: ParamMap) -> Result<Self, StateVarError> {
        let mut map = canonical_params(map);
        let mut request = Self::new();
        if let Some(package) = map.remove(ParamKey::Package.as_str()) {
            let package = PackageRef::from_value(&package).ok_or_else(|| {
                StateVarError::Configuration(format!("cannot interpret {package} as a package"))
            })?;
            request = request.package(package);
        }
        if let Some(state) = map.remove("state") {
            request = request.state(StateInput::try_from(state)?);
        }
        Ok(request.params(map))
    }
}

// ─── Diff ────────────────────────────────────────────────────────────

/// Governance values that a candidate update would change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamDiff {
    /// Current values of the changed keys.
    pub old: ParamMap,
    /// Candidate values of the changed keys.
    pub new: ParamMap,
}

impl ParamDiff {
    /// Whether the candidate changes nothing.
    pub fn is_empty(&self) -> bool {
        self.old.is_empty() && self.new.is_empty()
    }
}

// ─── Registry ────────────────────────────────────────────────────────

/// Owner of the variable set, the governance parameters and the package table.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    governance: Governance,
    variables: BTreeMap<String, VariableDescriptor>,
    packages: PackageTable,
    protected: BTreeSet<String>,
}

impl Registry {
    /// A registry with default governance, the built-in packages, no
    /// variables and no protected names.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with a caller-supplied package table.
    pub fn with_packages(packages: PackageTable) -> Self {
        Self {
            packages,
            ..Self::default()
        }
    }

    /// Add names that may never be introduced as new variables.
    pub fn protect<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected.extend(names.into_iter().map(Into::into));
    }

    /// The protected-name set.
    pub fn protected(&self) -> &BTreeSet<String> {
        &self.protected
    }

    /// Current governance parameters.
    pub fn governance(&self) -> &Governance {
        &self.governance
    }

    /// The package table.
    pub fn packages(&self) -> &PackageTable {
        &self.packages
    }

    /// Look up a variable.
    pub fn descriptor(&self, name: &str) -> Option<&VariableDescriptor> {
        self.variables.get(name)
    }

    /// Current value of a variable.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name).map(|d| &d.value)
    }

    /// Every variable, in name order.
    pub fn variables(&self) -> impl Iterator<Item = &VariableDescriptor> {
        self.variables.values()
    }

    fn notice(&self, kind: NoticeKind, message: String) -> Notice {
        match kind {
            NoticeKind::Info => {
                tracing::info!(label = %self.governance.label, "{message}");
            }
            _ => {
                tracing::warn!(label = %self.governance.label, ?kind, "{message}");
            }
        }
        Notice {
            label: self.governance.label.clone(),
            kind,
            message,
        }
    }

    // ─── Packages ────────────────────────────────────────────────────

    /// Resolve a package reference into a governance update without
    /// touching the registry.
    ///
    /// Returns the update and, for inline mappings, the package that
    /// [`Registry::resolve_package`] would register. Unknown keys are
    /// dropped (with a verbose-mode notice). An update whose only
    /// remaining key is `package` is returned empty.
    fn lookup_package(
        &self,
        reference: &PackageRef,
        notices: &mut Vec<Notice>,
    ) -> Result<(ParamMap, Option<PolicyPackage>), StateVarError> {
        let package_key = ParamKey::Package.as_str();
        let (mut update, to_register) = match reference {
            PackageRef::None => return Ok((ParamMap::new(), None)),
            PackageRef::Inline(map) => {
                let mut update = canonical_params(map.clone());
                let name = update
                    .get(package_key)
                    .and_then(Value::as_str)
                    .unwrap_or(USER_PACKAGE)
                    .to_string();
                update.insert(package_key.to_string(), Value::Str(name.clone()));
                (update, Some(name))
            }
            PackageRef::File(path) => {
                let mut update = ParamMap::new();
                update.insert(package_key.to_string(), Value::Str(path.clone()));
                match load_reference(path)? {
                    Value::Dict(loaded) => update.extend(canonical_params(loaded)),
                    Value::None => {}
                    other => {
                        return Err(StateVarError::Configuration(format!(
                            "package file {path} resolved to {other} rather than a mapping"
                        )))
                    }
                }
                (update, None)
            }
            PackageRef::Named(name) => match self.packages.get(name) {
                Some(package) => (package.to_params(), None),
                None => {
                    tracing::debug!(package = %name, "unknown package name ignored");
                    return Ok((ParamMap::new(), None));
                }
            },
        };

        let unknown: Vec<String> = update
            .keys()
            .filter(|k| k.parse::<ParamKey>().is_err())
            .cloned()
            .collect();
        for key in unknown {
            update.remove(&key);
            if self.governance.verbose {
                notices.push(self.notice(
                    NoticeKind::Parameter,
                    format!("{key} is not a valid governance parameter"),
                ));
            }
        }

        let registered = to_register.map(|name| PolicyPackage::new(name, update.clone()));
        if update.len() == 1 && update.contains_key(package_key) {
            return Ok((ParamMap::new(), registered));
        }
        Ok((update, registered))
    }

    /// Resolve a package reference into a governance update.
    ///
    /// - `None` → empty update.
    /// - Inline mapping → registered under its `package` entry (or `user`)
    ///   and returned.
    /// - File reference → loaded and merged over `{package: reference}`.
    /// - Known name → that package's overrides.
    /// - Any other name → empty update.
    pub fn resolve_package(&mut self, reference: &PackageRef) -> Result<ParamMap, StateVarError> {
        self.resolve_package_into(reference, &mut Vec::new())
    }

    fn resolve_package_into(
        &mut self,
        reference: &PackageRef,
        notices: &mut Vec<Notice>,
    ) -> Result<ParamMap, StateVarError> {
        let (update, registered) = self.lookup_package(reference, notices)?;
        if let Some(package) = registered {
            tracing::debug!(package = %package.name, "registered inline package");
            self.packages.register(package);
        }
        Ok(update)
    }

    // ─── Governance ──────────────────────────────────────────────────

    /// Coerce one governance input against its schema.
    ///
    /// Unknown keys (including `state`) come back as [`Coercion::Invalid`].
    ///
    /// # Errors
    ///
    /// Returns [`StateVarError::AmbiguousBool`] when a boolean parameter
    /// receives an ambiguous string.
    pub fn coerce_param(&self, key: &str, value: &Value) -> Result<Coercion, StateVarError> {
        match key.parse::<ParamKey>() {
            Ok(param) => param.coerce(value),
            Err(_) => Ok(Coercion::invalid(key, value)),
        }
    }

    /// Coerce and store one parameter. Returns whether the value changed.
    fn assign_param(
        &mut self,
        key: &str,
        value: &Value,
        notices: &mut Vec<Notice>,
    ) -> Result<bool, StateVarError> {
        match self.coerce_param(key, value)? {
            Coercion::Valid { key, value, note } => {
                if let Some(note) = note {
                    notices.push(self.notice(NoticeKind::Parameter, note));
                }
                Ok(self.governance.set(key, value))
            }
            Coercion::Invalid { key, value } => {
                if self.governance.verbose {
                    notices.push(self.notice(
                        NoticeKind::Parameter,
                        format!("{key}={value} not allowed governance option"),
                    ));
                }
                Ok(false)
            }
        }
    }

    /// Apply a request.
    ///
    /// An empty request is a no-op. Otherwise the package (if any) is
    /// resolved and explicit parameters are layered on top of it, `verbose`
    /// is applied first, then every other parameter, then the state.
    ///
    /// # Errors
    ///
    /// - Configuration errors from package resolution, boolean coercion or
    ///   state normalization.
    /// - [`StateVarError::ProtectedName`] for a new variable that shadows a
    ///   protected name.
    /// - [`StateVarError::Validation`] when a gate trips in `error` mode.
    pub fn apply(&mut self, request: Request) -> Result<ApplyOutcome, StateVarError> {
        let mut outcome = ApplyOutcome::default();
        if request.is_empty() {
            return Ok(outcome);
        }
        let Request {
            params,
            package,
            state,
        } = request;

        let mut setargs = match &package {
            Some(reference) => self.resolve_package_into(reference, &mut outcome.notices)?,
            None => ParamMap::new(),
        };
        setargs.extend(params);
        let names_package = setargs.contains_key(ParamKey::Package.as_str());

        if let Some(verbose) = setargs.remove(ParamKey::Verbose.as_str()) {
            self.assign_param(ParamKey::Verbose.as_str(), &verbose, &mut outcome.notices)?;
        }

        for (key, value) in &setargs {
            if self.assign_param(key, value, &mut outcome.notices)? {
                outcome.governance_changed = true;
            }
        }
        if !names_package && outcome.governance_changed {
            self.governance.package = USER_PACKAGE.to_string();
        }

        if let Some(state) = state {
            for (name, patch) in state.normalize()? {
                let result = self.upsert_into(&name, patch, &mut outcome.notices)?;
                outcome.variables.push(result);
            }
        }
        Ok(outcome)
    }

    /// Governance values that `update` would change.
    ///
    /// A `package` entry is expanded the same way [`Registry::apply`] would
    /// expand it, without registering anything. When the update names no
    /// package but changes something, the diff also records the switch to
    /// `user`, so applying `new` and then [`Registry::restore`]-ing `old`
    /// round-trips exactly.
    pub fn diff(&self, update: &ParamMap) -> Result<ParamDiff, StateVarError> {
        let mut diff = ParamDiff::default();
        if update.is_empty() {
            return Ok(diff);
        }
        let mut candidate = ParamMap::new();
        let mut explicit = canonical_params(update.clone());
        if let Some(package) = explicit.remove(ParamKey::Package.as_str()) {
            let reference = PackageRef::from_value(&package).ok_or_else(|| {
                StateVarError::Configuration(format!("cannot interpret {package} as a package"))
            })?;
            let (resolved, _) = self.lookup_package(&reference, &mut Vec::new())?;
            candidate.extend(resolved);
        }
        candidate.extend(explicit);

        for key in ParamKey::all() {
            let Some(raw) = candidate.get(key.as_str()) else {
                continue;
            };
            if let Coercion::Valid { value, .. } = key.coerce(raw)? {
                let current = self.governance.get(*key);
                if value != current {
                    diff.old.insert(key.as_str().to_string(), current.to_value());
                    diff.new.insert(key.as_str().to_string(), value.to_value());
                }
            }
        }

        let package_key = ParamKey::Package.as_str();
        let changes_other = diff.new.keys().any(|k| k != ParamKey::Verbose.as_str());
        if !candidate.contains_key(package_key)
            && changes_other
            && self.governance.package != USER_PACKAGE
        {
            diff.old.insert(package_key.to_string(), Value::from(self.governance.package.as_str()));
            diff.new.insert(package_key.to_string(), Value::from(USER_PACKAGE));
        }
        Ok(diff)
    }

    /// Assign recorded governance values directly.
    ///
    /// Unlike [`Registry::apply`], `package` is stored as a plain name and
    /// never expanded, and nothing is re-labelled `user`.
    pub fn restore(&mut self, values: &ParamMap) -> Result<(), StateVarError> {
        let mut notices = Vec::new();
        for (key, value) in values {
            self.assign_param(key, value, &mut notices)?;
        }
        Ok(())
    }

    /// Apply a governance-only override and return a guard that restores
    /// the prior values when dropped.
    ///
    /// Any state in `overrides` is ignored; apply state through the guard.
    pub fn override_with(
        &mut self,
        mut overrides: Request,
    ) -> Result<OverrideGuard<'_>, StateVarError> {
        overrides.state = None;
        let mut candidate = overrides.params.clone();
        match &overrides.package {
            Some(PackageRef::None) | None => {}
            Some(PackageRef::Inline(map)) => {
                let name = overrides.package.as_ref().and_then(PackageRef::name);
                self.resolve_package(&PackageRef::Inline(map.clone()))?;
                if let Some(name) = name {
                    candidate.insert(ParamKey::Package.as_str().to_string(), Value::Str(name));
                }
            }
            Some(PackageRef::Named(s) | PackageRef::File(s)) => {
                candidate.insert(ParamKey::Package.as_str().to_string(), Value::Str(s.clone()));
            }
        }
        let diff = self.diff(&candidate)?;
        self.restore(&diff.new)?;
        tracing::debug!(keys = diff.new.len(), "governance override applied");
        Ok(OverrideGuard {
            registry: self,
            saved: diff.old,
        })
    }

    /// Run `action` under a one-shot governance override.
    ///
    /// The prior governance values are restored on every exit path,
    /// including when `action` fails.
    pub fn with_override<R>(
        &mut self,
        overrides: Request,
        action: impl FnOnce(&mut Registry) -> Result<R, StateVarError>,
    ) -> Result<R, StateVarError> {
        let mut guard = self.override_with(overrides)?;
        let result = action(&mut *guard);
        let restored = guard.finish();
        let value = result?;
        restored?;
        Ok(value)
    }

    // ─── Variables ───────────────────────────────────────────────────

    /// Validate and store one variable update.
    ///
    /// # Errors
    ///
    /// - [`StateVarError::ProtectedName`] when `name` is protected and not
    ///   already declared, regardless of enforcement.
    /// - [`StateVarError::Validation`] when a gate trips in `error` mode.
    pub fn upsert_variable(
        &mut self,
        name: &str,
        patch: DescriptorPatch,
    ) -> Result<(UpsertOutcome, Vec<Notice>), StateVarError> {
        let mut notices = Vec::new();
        let outcome = self.upsert_into(name, patch, &mut notices)?;
        Ok((outcome, notices))
    }

    fn upsert_into(
        &mut self,
        name: &str,
        patch: DescriptorPatch,
        notices: &mut Vec<Notice>,
    ) -> Result<UpsertOutcome, StateVarError> {
        let existing = self.variables.get(name);
        let created = existing.is_none();
        if created && self.protected.contains(name) {
            return Err(StateVarError::ProtectedName(name.to_string()));
        }

        if let Some(given) = patch.name.as_deref().filter(|given| *given != name) {
            if self.governance.verbose {
                notices.push(self.notice(
                    NoticeKind::Info,
                    format!("{name} != {given} -> using {name}"),
                ));
            }
        }

        let mut next = existing
            .cloned()
            .unwrap_or_else(|| VariableDescriptor::blank(name));
        next.name = name.to_string();
        if let Some(value) = patch.value {
            next.value = value;
        }
        if let Some(description) = patch.description {
            next.description = Some(description);
        }
        let explicit_type = patch.type_spec.is_some();
        let spec = match patch.type_spec {
            Some(spec) => spec,
            None if created => TypeSpec::Auto,
            None => TypeSpec::from(next.type_tag),
        };
        next.type_tag = canonical_type(spec, Some(&next.value));

        if created && self.gate(Gate::Set, name, None, notices)? {
            return Ok(UpsertOutcome::Rejected {
                name: name.to_string(),
                gate: Gate::Set,
            });
        }

        let actual = next.value.type_tag();
        if let (Some(expected), Some(actual)) = (next.type_tag, actual) {
            if expected != actual {
                let types = Some((expected.as_str(), actual.as_str()));
                if self.gate(Gate::Type, name, types, notices)? {
                    return Ok(UpsertOutcome::Rejected {
                        name: name.to_string(),
                        gate: Gate::Type,
                    });
                }
                if !explicit_type {
                    next.type_tag = Some(actual);
                }
            }
        }

        self.variables.insert(name.to_string(), next);
        Ok(UpsertOutcome::Stored {
            name: name.to_string(),
            created,
        })
    }

    /// Evaluate one tripped gate. Returns `true` when the update must be
    /// dropped.
    fn gate(
        &self,
        gate: Gate,
        name: &str,
        types: Option<(&str, &str)>,
        notices: &mut Vec<Notice>,
    ) -> Result<bool, StateVarError> {
        let g = &self.governance;
        let (enforce, notify) = match gate {
            Gate::Set => (g.enforce_set, g.notify_set),
            Gate::Type => (g.enforce_type, g.notify_type),
        };
        match notify {
            NotifyMode::Ignore => {}
            NotifyMode::Alert => {
                let message = match (gate, types) {
                    (Gate::Type, Some((expected, actual))) if enforce => format!(
                        "{name}: not setting value since incorrect type ({actual} is not {expected})"
                    ),
                    (Gate::Type, Some((expected, actual))) => format!(
                        "{name}: setting value although incorrect type ({actual} is not {expected})"
                    ),
                    _ if enforce => {
                        format!("{name} is not a defined state variable; not setting")
                    }
                    _ => format!("{name} is not a defined state variable; setting anyway"),
                };
                notices.push(self.notice(NoticeKind::Alert(gate), message));
            }
            NotifyMode::Error => {
                let label = g.label.clone();
                let err = match (gate, types) {
                    (Gate::Type, Some((expected, actual))) => ValidationError::WrongType {
                        label,
                        name: name.to_string(),
                        expected: expected.to_string(),
                        actual: actual.to_string(),
                        enforced: enforce,
                    },
                    _ => ValidationError::NotDefined {
                        label,
                        name: name.to_string(),
                        enforced: enforce,
                    },
                };
                return Err(err.into());
            }
        }
        Ok(enforce)
    }

    /// Remove every variable. Governance is untouched.
    pub fn reset_variables(&mut self) {
        tracing::info!(
            label = %self.governance.label,
            count = self.variables.len(),
            "erasing all state variables"
        );
        self.variables.clear();
    }

    // ─── Views ───────────────────────────────────────────────────────

    /// Snapshot for display, with the default cell width.
    pub fn describe(&self, include_governance: bool) -> Report {
        self.describe_with_width(include_governance, DEFAULT_MAX_ENTRY_LEN)
    }

    /// Snapshot for display, eliding cells longer than `max_entry_len`.
    pub fn describe_with_width(&self, include_governance: bool, max_entry_len: usize) -> Report {
        let governance = include_governance.then(|| {
            ParamKey::all()
                .iter()
                .map(|k| (k.as_str().to_string(), self.governance.get(*k).to_string()))
                .collect()
        });
        let variables = self
            .variables
            .values()
            .map(|d| ReportRow {
                name: elide(&d.name, max_entry_len),
                value: elide(&d.value.to_string(), max_entry_len),
                type_name: d.type_tag.map_or("None", |t| t.as_str()).to_string(),
                description: elide(d.description.as_deref().unwrap_or("None"), max_entry_len),
            })
            .collect();
        Report {
            governance,
            variables,
        }
    }

    /// Every governance parameter and, unless `skip_state`, the variables
    /// under `state`, as one mapping.
    pub fn to_map(&self, skip_state: bool) -> Value {
        let mut map = self.governance.to_params();
        if !skip_state {
            let state = self
                .variables
                .iter()
                .map(|(k, d)| (k.clone(), d.to_value()))
                .collect();
            map.insert("state".to_string(), Value::Dict(state));
        }
        Value::Dict(map)
    }
}

// ─── Override Guard ──────────────────────────────────────────────────

/// Scoped governance override. Dereferences to the registry; restores
/// the saved governance values on [`OverrideGuard::finish`] or drop.
#[derive(Debug)]
pub struct OverrideGuard<'a> {
    registry: &'a mut Registry,
    saved: ParamMap,
}

impl OverrideGuard<'_> {
    /// Values that will be restored.
    pub fn saved(&self) -> &ParamMap {
        &self.saved
    }

    /// Restore now and report the outcome.
    pub fn finish(mut self) -> Result<(), StateVarError> {
        let saved = std::mem::take(&mut self.saved);
        self.registry.restore(&saved)
    }
}

impl Deref for OverrideGuard<'_> {
    type Target = Registry;

    fn deref(&self) -> &Registry {
        self.registry
    }
}

impl DerefMut for OverrideGuard<'_> {
    fn deref_mut(&mut self) -> &mut Registry {
        self.registry
    }
}

impl Drop for OverrideGuard<'_> {
    fn drop(&mut self) {
        if self.saved.is_empty() {
            return;
        }
        let saved = std::mem::take(&mut self.saved);
        if let Err(e) = self.registry.restore(&saved) {
            tracing::warn!(error = %e, "failed to restore governance after override");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statevar_core::TypeTag;

    fn with_package(name: &str) -> Registry {
        let mut reg = Registry::new();
        reg.apply(Request::new().package(name)).unwrap();
        reg
    }

    fn declare(reg: &mut Registry, name: &str, value: impl Into<Value>) {
        let value: Value = value.into();
        reg.with_override(Request::new().package("init"), |r| {
            r.apply(Request::new().state(StateInput::inline([(name, value)])))
        })
        .unwrap();
    }

    // ---- apply / governance ----

    #[test]
    fn empty_request_is_noop() {
        let mut reg = Registry::new();
        let outcome = reg.apply(Request::new()).unwrap();
        assert_eq!(outcome, ApplyOutcome::default());
        assert_eq!(reg.governance(), &Governance::default());
    }

    #[test]
    fn named_package_sets_its_values_and_name() {
        let reg = with_package("maximal");
        let g = reg.governance();
        assert!(g.verbose && g.enforce_set && g.enforce_type);
        assert_eq!(g.notify_set, NotifyMode::Error);
        assert_eq!(g.package, "maximal");
    }

    #[test]
    fn explicit_params_win_over_package() {
        let mut reg = Registry::new();
        reg.apply(Request::new().package("maximal").param("notify_type", "alert"))
            .unwrap();
        assert_eq!(reg.governance().notify_type, NotifyMode::Alert);
        assert_eq!(reg.governance().package, "maximal");
    }

    #[test]
    fn changing_a_param_without_package_marks_user() {
        let mut reg = with_package("middle");
        let outcome = reg.apply(Request::new().param("enforce_type", true)).unwrap();
        assert!(outcome.governance_changed);
        assert_eq!(reg.governance().package, USER_PACKAGE);
    }

    #[test]
    fn unchanged_param_keeps_package_name() {
        let mut reg = with_package("middle");
        reg.apply(Request::new().param("enforce_set", "yes")).unwrap();
        assert_eq!(reg.governance().package, "middle");
    }

    #[test]
    fn unknown_package_name_is_ignored() {
        let mut reg = Registry::new();
        let outcome = reg.apply(Request::new().package("bogus")).unwrap();
        assert!(!outcome.governance_changed);
        assert_eq!(reg.governance().package, "default");
    }

    #[test]
    fn invalid_param_is_silently_retained() {
        let mut reg = Registry::new();
        let outcome = reg.apply(Request::new().param("label", 7)).unwrap();
        assert_eq!(reg.governance().label, "StateVarDef");
        assert!(outcome.notices.is_empty());
    }

    #[test]
    fn invalid_param_notice_when_verbose() {
        let mut reg = Registry::new();
        let outcome = reg
            .apply(Request::new().param("verbose", true).param("colour", "red"))
            .unwrap();
        assert_eq!(outcome.notices_of(NoticeKind::Parameter).count(), 1);
    }

    #[test]
    fn ambiguous_bool_param_is_fatal() {
        let mut reg = Registry::new();
        let err = reg.apply(Request::new().param("enforce_set", "sure")).unwrap_err();
        assert!(matches!(err, StateVarError::AmbiguousBool(_)));
    }

    #[test]
    fn inline_package_registers_under_its_name() {
        let mut reg = Registry::new();
        let mut map = ParamMap::new();
        map.insert("package".into(), Value::from("strict"));
        map.insert("enforce_type".into(), Value::Bool(true));
        map.insert("shoe_size".into(), Value::Int(9));
        reg.apply(Request::new().package(map)).unwrap();
        assert!(reg.governance().enforce_type);
        assert_eq!(reg.governance().package, "strict");
        let stored = reg.packages().get("strict").unwrap();
        assert!(!stored.overrides.contains_key("shoe_size"));
        assert!(Registry::new().packages().get("strict").is_none());
    }

    #[test]
    fn unknown_package_keys_are_noted_when_verbose() {
        let mut reg = Registry::new();
        reg.apply(Request::new().param("verbose", true)).unwrap();
        let mut map = ParamMap::new();
        map.insert("package".into(), Value::from("strict"));
        map.insert("shoe_size".into(), Value::Int(9));
        let outcome = reg.apply(Request::new().package(map.clone())).unwrap();
        let notes: Vec<_> = outcome.notices_of(NoticeKind::Parameter).collect();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].message.contains("shoe_size is not a valid governance parameter"));

        let mut quiet = Registry::new();
        let outcome = quiet.apply(Request::new().package(map)).unwrap();
        assert_eq!(outcome.notices_of(NoticeKind::Parameter).count(), 0);
    }

    #[test]
    fn package_param_selects_the_package() {
        let mut reg = Registry::new();
        reg.apply(Request::new().param("package", "maximal")).unwrap();
        assert!(reg.governance().enforce_type);
        assert!(reg.governance().enforce_set);
        assert_eq!(reg.governance().package, "maximal");

        let mut map = ParamMap::new();
        map.insert("Package".into(), Value::from("maximal"));
        let mut via_map = Registry::new();
        via_map.apply(Request::new().params(map)).unwrap();
        assert_eq!(via_map.governance(), reg.governance());
    }

    #[test]
    fn diff_predicts_apply_for_package_params() {
        let mut reg = Registry::new();
        let mut update = ParamMap::new();
        update.insert("package".into(), Value::from("middle"));
        update.insert("label".into(), Value::from("rx"));
        let diff = reg.diff(&update).unwrap();
        reg.apply(Request::new().params(update)).unwrap();
        assert_eq!(reg.governance().package, "middle");
        for (key, value) in &diff.new {
            assert_eq!(&reg.to_map(true).as_dict().unwrap()[key], value, "{key}");
        }
    }

    #[test]
    fn param_names_match_case_insensitively() {
        let mut reg = Registry::new();
        let mut update = ParamMap::new();
        update.insert("Verbose".into(), Value::Bool(true));
        update.insert("ENFORCE_SET".into(), Value::Bool(true));
        let diff = reg.diff(&update).unwrap();
        assert_eq!(diff.new["verbose"], Value::Bool(true));
        assert_eq!(diff.new["enforce_set"], Value::Bool(true));

        let outcome = reg.apply(Request::new().params(update)).unwrap();
        assert!(outcome.notices_of(NoticeKind::Parameter).next().is_none());
        assert!(reg.governance().verbose);
        assert!(reg.governance().enforce_set);
        assert_eq!(reg.governance().package, USER_PACKAGE);
    }

    #[test]
    fn custom_package_table_replaces_builtins() {
        let mut table = PackageTable::empty();
        let mut overrides = ParamMap::new();
        overrides.insert("enforce_set".into(), Value::Bool(true));
        table.register(PolicyPackage::new("locked", overrides));
        let mut reg = Registry::with_packages(table);
        reg.apply(Request::new().package("maximal")).unwrap();
        assert_eq!(reg.governance().package, "default");
        reg.apply(Request::new().package("locked")).unwrap();
        assert!(reg.governance().enforce_set);
        assert_eq!(reg.governance().package, "locked");
    }

    #[test]
    fn package_with_only_its_name_is_empty() {
        let mut reg = Registry::new();
        let mut map = ParamMap::new();
        map.insert("package".into(), Value::from("hollow"));
        let update = reg.resolve_package(&PackageRef::Inline(map)).unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn from_map_routes_package_and_state() {
        let mut map = ParamMap::new();
        map.insert("package".into(), Value::from("middle"));
        map.insert("label".into(), Value::from("rx"));
        let mut state = BTreeMap::new();
        state.insert("gain".to_string(), Value::Int(3));
        map.insert("state".into(), Value::Dict(state));
        let mut reg = Registry::new();
        reg.apply(Request::from_map(map).unwrap()).unwrap();
        assert_eq!(reg.governance().label, "rx");
        assert_eq!(reg.governance().package, "middle");
        // middle enforces set with alerts, so the new name is dropped.
        assert!(reg.get("gain").is_none());
    }

    // ---- variables ----

    #[test]
    fn auto_type_resolves_to_runtime_type() {
        let mut reg = Registry::new();
        reg.apply(Request::new().state(StateInput::inline([("frequency", 1420.0)])))
            .unwrap();
        let d = reg.descriptor("frequency").unwrap();
        assert_eq!(d.type_tag, Some(TypeTag::Float));
    }

    #[test]
    fn merge_retains_unspecified_fields() {
        let mut reg = Registry::new();
        let patch = DescriptorPatch::value(1420.0).described("Frequency in MHz");
        reg.upsert_variable("frequency", patch).unwrap();
        reg.upsert_variable("frequency", DescriptorPatch::value(1421.5)).unwrap();
        let d = reg.descriptor("frequency").unwrap();
        assert_eq!(d.value, Value::Float(1421.5));
        assert_eq!(d.description.as_deref(), Some("Frequency in MHz"));
    }

    #[test]
    fn type_gate_rejects_under_enforcement_with_alert() {
        let mut reg = Registry::new();
        declare(&mut reg, "frequency", 1420.0);
        reg.apply(
            Request::new()
                .param("enforce_type", true)
                .param("notify_type", "alert"),
        )
        .unwrap();
        let outcome = reg
            .apply(Request::new().state(StateInput::inline([("frequency", "abc")])))
            .unwrap();
        assert_eq!(outcome.rejected().collect::<Vec<_>>(), vec!["frequency"]);
        let alert = outcome.notices_of(NoticeKind::Alert(Gate::Type)).next().unwrap();
        assert!(alert.message.contains("not setting value since incorrect type"));
        assert_eq!(reg.get("frequency"), Some(&Value::Float(1420.0)));
    }

    #[test]
    fn type_gate_alerts_but_stores_without_enforcement() {
        let mut reg = Registry::new();
        declare(&mut reg, "frequency", 1420.0);
        reg.apply(Request::new().param("notify_type", "alert")).unwrap();
        let outcome = reg
            .apply(Request::new().state(StateInput::inline([("frequency", "abc")])))
            .unwrap();
        let alert = outcome.notices_of(NoticeKind::Alert(Gate::Type)).next().unwrap();
        assert!(alert.message.contains("setting value although incorrect type"));
        assert_eq!(reg.get("frequency"), Some(&Value::from("abc")));
    }

    #[test]
    fn error_mode_raises_even_without_enforcement() {
        let mut reg = Registry::new();
        declare(&mut reg, "frequency", 1420.0);
        reg.apply(Request::new().param("notify_type", "error")).unwrap();
        let err = reg
            .apply(Request::new().state(StateInput::inline([("frequency", "abc")])))
            .unwrap_err();
        assert!(matches!(
            err,
            StateVarError::Validation(ValidationError::WrongType { enforced: false, .. })
        ));
    }

    #[test]
    fn explicit_type_is_kept_when_mismatch_is_tolerated() {
        let mut reg = Registry::new();
        let patch = DescriptorPatch::value(5).typed(TypeSpec::Tag(TypeTag::Float));
        reg.upsert_variable("gain", patch).unwrap();
        let d = reg.descriptor("gain").unwrap();
        assert_eq!(d.type_tag, Some(TypeTag::Float));
        assert_eq!(d.value, Value::Int(5));
    }

    #[test]
    fn none_value_never_trips_type_gate() {
        let mut reg = with_package("maximal");
        declare(&mut reg, "frequency", 1420.0);
        reg.apply(Request::new().state(StateInput::inline([("frequency", Value::None)])))
            .unwrap();
        assert_eq!(reg.get("frequency"), Some(&Value::None));
    }

    #[test]
    fn set_gate_alert_without_enforcement_stores() {
        let mut reg = Registry::new();
        reg.apply(Request::new().param("notify_set", "alert")).unwrap();
        let outcome = reg
            .apply(Request::new().state(StateInput::inline([("gain", 3)])))
            .unwrap();
        assert_eq!(outcome.notices_of(NoticeKind::Alert(Gate::Set)).count(), 1);
        assert_eq!(reg.get("gain"), Some(&Value::Int(3)));
    }

    #[test]
    fn set_gate_ignore_with_enforcement_drops_silently() {
        let mut reg = Registry::new();
        reg.apply(Request::new().param("enforce_set", true)).unwrap();
        let outcome = reg
            .apply(Request::new().state(StateInput::inline([("gain", 3)])))
            .unwrap();
        assert!(outcome.notices.is_empty());
        assert_eq!(outcome.rejected().count(), 1);
        assert!(reg.get("gain").is_none());
    }

    #[test]
    fn type_gate_ignore_with_enforcement_drops_silently() {
        let mut reg = Registry::new();
        declare(&mut reg, "frequency", 1420.0);
        reg.apply(Request::new().param("enforce_type", true)).unwrap();
        let outcome = reg
            .apply(Request::new().state(StateInput::inline([("frequency", "abc")])))
            .unwrap();
        assert!(outcome.notices.is_empty());
        assert_eq!(outcome.rejected().collect::<Vec<_>>(), vec!["frequency"]);
        let d = reg.descriptor("frequency").unwrap();
        assert_eq!(d.value, Value::Float(1420.0));
        assert_eq!(d.type_tag, Some(TypeTag::Float));
    }

    #[test]
    fn protected_name_is_rejected_regardless_of_policy() {
        let mut reg = with_package("minimal");
        reg.protect(["reset"]);
        let err = reg
            .upsert_variable("reset", DescriptorPatch::value(1))
            .unwrap_err();
        assert!(matches!(err, StateVarError::ProtectedName(n) if n == "reset"));
        assert!(reg.get("reset").is_none());
    }

    #[test]
    fn partial_application_keeps_earlier_entries() {
        let mut reg = with_package("maximal");
        reg.with_override(Request::new().package("init"), |r| {
            r.apply(Request::new().state(StateInput::inline([("a", 1), ("b", 2)])))
        })
        .unwrap();
        let mut state = BTreeMap::new();
        state.insert("a".to_string(), DescriptorPatch::value(10));
        state.insert("b".to_string(), DescriptorPatch::value("two"));
        let err = reg
            .apply(Request::new().state(StateInput::Partial(state)))
            .unwrap_err();
        assert!(matches!(err, StateVarError::Validation(_)));
        assert_eq!(reg.get("a"), Some(&Value::Int(10)));
        assert_eq!(reg.get("b"), Some(&Value::Int(2)));
    }

    // ---- diff / override ----

    #[test]
    fn diff_of_empty_update_is_empty() {
        let reg = Registry::new();
        assert!(reg.diff(&ParamMap::new()).unwrap().is_empty());
    }

    #[test]
    fn diff_of_current_values_is_empty() {
        let reg = with_package("middle");
        let mut update = ParamMap::new();
        update.insert("package".into(), Value::from("middle"));
        update.insert("verbose".into(), Value::Bool(true));
        assert!(reg.diff(&update).unwrap().is_empty());
    }

    #[test]
    fn diff_expands_package() {
        let reg = Registry::new();
        let mut update = ParamMap::new();
        update.insert("package".into(), Value::from("maximal"));
        let diff = reg.diff(&update).unwrap();
        assert_eq!(diff.new["enforce_type"], Value::Bool(true));
        assert_eq!(diff.old["enforce_type"], Value::Bool(false));
        assert_eq!(diff.old["package"], Value::from("default"));
        assert!(!diff.new.contains_key("label"));
    }

    #[test]
    fn diff_records_switch_to_user() {
        let reg = with_package("middle");
        let mut update = ParamMap::new();
        update.insert("enforce_type".into(), Value::Bool(true));
        let diff = reg.diff(&update).unwrap();
        assert_eq!(diff.new["package"], Value::from(USER_PACKAGE));
        assert_eq!(diff.old["package"], Value::from("middle"));
    }

    #[test]
    fn override_restores_after_failure() {
        let mut reg = with_package("minimal");
        let before = reg.governance().clone();
        let err = reg
            .with_override(Request::new().package("maximal"), |r| {
                assert!(r.governance().enforce_set);
                r.apply(Request::new().state(StateInput::inline([("gain", 3)])))
            })
            .unwrap_err();
        assert!(matches!(err, StateVarError::Validation(_)));
        assert_eq!(reg.governance(), &before);
    }

    #[test]
    fn guard_restores_on_drop() {
        let mut reg = Registry::new();
        {
            let guard = reg
                .override_with(Request::new().param("label", "temporary"))
                .unwrap();
            assert_eq!(guard.governance().label, "temporary");
        }
        assert_eq!(reg.governance(), &Governance::default());
    }

    // ---- reset / views ----

    #[test]
    fn reset_clears_variables_only() {
        let mut reg = Registry::new();
        reg.apply(
            Request::new()
                .param("label", "rx")
                .state(StateInput::inline([("gain", 3)])),
        )
        .unwrap();
        reg.reset_variables();
        assert_eq!(reg.variables().count(), 0);
        assert_eq!(reg.governance().label, "rx");
    }

    #[test]
    fn describe_includes_governance_on_request() {
        let mut reg = Registry::new();
        reg.apply(Request::new().state(StateInput::inline([("gain", 3)])))
            .unwrap();
        let report = reg.describe(true);
        let governance = report.governance.unwrap();
        assert_eq!(governance.len(), ParamKey::all().len());
        assert_eq!(report.variables[0].type_name, "int");
        assert_eq!(report.variables[0].description, "None");
        assert!(reg.describe(false).governance.is_none());
    }

    #[test]
    fn describe_elides_long_values() {
        let mut reg = Registry::new();
        let long = "x".repeat(80);
        reg.apply(Request::new().state(StateInput::inline([("blob", long.as_str())])))
            .unwrap();
        let row = &reg.describe_with_width(false, 20).variables[0];
        assert_eq!(row.value, format!("{}....{}", "x".repeat(8), "x".repeat(8)));
    }

    #[test]
    fn to_map_can_skip_state() {
        let mut reg = Registry::new();
        reg.apply(Request::new().state(StateInput::inline([("gain", 3)])))
            .unwrap();
        let full = reg.to_map(false);
        assert!(full.as_dict().unwrap().contains_key("state"));
        let bare = reg.to_map(true);
        assert!(!bare.as_dict().unwrap().contains_key("state"));
        assert_eq!(bare.as_dict().unwrap()["label"], Value::from("StateVarDef"));
    }
}
