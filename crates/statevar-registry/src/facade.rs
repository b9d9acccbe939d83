//! # StateVariable Facade
//!
//! Thin public wrapper around one [`Registry`]. The facade never touches
//! registry internals; it forwards to the registry's public operations and
//! exposes variable values through [`StateVariable::get`].
//!
//! The facade's own operation names are protected: no variable may be
//! introduced under one of them, whatever the governance settings.

use std::fmt;
use std::io::{self, BufRead, Write};

use statevar_core::{canonical_bool, StateVarError, Value};

use crate::descriptor::{DescriptorPatch, StateInput};
use crate::governance::ParamMap;
use crate::outcome::ApplyOutcome;
use crate::package::INIT_PACKAGE;
use crate::registry::{Registry, Request};

/// Names reserved by the facade itself.
pub const FACADE_NAMES: &[&str] = &[
    "state",
    "state_with_override",
    "set",
    "set_descriptor",
    "get",
    "reset",
    "registry",
    "describe",
];

const RESET_PROMPT: &str = "This will erase all of the current state keys. Continue? (y/n) ";

// ─── Override ────────────────────────────────────────────────────────

/// A one-shot governance override for a single update.
#[derive(Debug, Clone, PartialEq)]
pub enum Override {
    /// The `init` package: no enforcement, silent.
    Init,
    /// A named package or package file reference.
    Package(String),
    /// Explicit parameter values.
    Params(ParamMap),
}

impl Override {
    fn into_request(self) -> Request {
        match self {
            Self::Init => Request::new().package(INIT_PACKAGE),
            Self::Package(name) => Request::new().package(name.as_str()),
            Self::Params(params) => Request::new().params(params),
        }
    }
}

// ─── Confirmation ────────────────────────────────────────────────────

/// Source of a yes/no answer.
pub trait Confirm {
    /// Ask `prompt` and return the raw answer.
    fn confirm(&mut self, prompt: &str) -> Result<Value, StateVarError>;
}

/// Prompts on standard output and reads one line from standard input.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<Value, StateVarError> {
        let mut stdout = io::stdout();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(Value::Str(line.trim().to_string()))
    }
}

/// How [`StateVariable::reset`] obtains its go-ahead.
pub enum Confirmation<'a> {
    /// Ask interactively.
    Prompt(&'a mut dyn Confirm),
    /// A pre-supplied answer, interpreted like an interactive one.
    Answer(Value),
}

impl fmt::Debug for Confirmation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prompt(_) => f.write_str("Prompt(..)"),
            Self::Answer(v) => f.debug_tuple("Answer").field(v).finish(),
        }
    }
}

// ─── Facade ──────────────────────────────────────────────────────────

/// Public handle on a registry of state variables.
#[derive(Debug, Clone)]
pub struct StateVariable {
    registry: Registry,
}

impl StateVariable {
    /// Build a facade.
    ///
    /// Governance parameters and package in `request` are applied first.
    /// Any state in `request` is then declared under the `init` override,
    /// so the initial variables are accepted whatever the policy.
    pub fn new(request: Request) -> Result<Self, StateVarError> {
        Self::with_protected(request, std::iter::empty::<String>())
    }

    /// Like [`StateVariable::new`], additionally protecting `extra` names.
    pub fn with_protected<I, S>(mut request: Request, extra: I) -> Result<Self, StateVarError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Registry::new();
        registry.protect(FACADE_NAMES.iter().copied());
        registry.protect(extra);

        let state = request.take_state();
        let outcome = registry.apply(request)?;
        log_rejections(&outcome);
        if let Some(state) = state {
            let outcome = registry.with_override(Override::Init.into_request(), |r| {
                r.apply(Request::new().state(state))
            })?;
            log_rejections(&outcome);
        }
        Ok(Self { registry })
    }

    /// Apply a request to the underlying registry.
    pub fn state(&mut self, request: Request) -> Result<ApplyOutcome, StateVarError> {
        self.registry.apply(request)
    }

    /// Apply a request under a one-shot governance override. Prior
    /// governance is restored whether or not the update succeeds.
    pub fn state_with_override(
        &mut self,
        request: Request,
        overrides: Override,
    ) -> Result<ApplyOutcome, StateVarError> {
        self.registry
            .with_override(overrides.into_request(), |r| r.apply(request))
    }

    /// Set one variable to a bare value.
    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<ApplyOutcome, StateVarError> {
        let value: Value = value.into();
        self.state(Request::new().state(StateInput::inline([(name, value)])))
    }

    /// Apply one descriptor that carries its own name.
    pub fn set_descriptor(
        &mut self,
        patch: DescriptorPatch,
    ) -> Result<ApplyOutcome, StateVarError> {
        self.state(Request::new().state(StateInput::Single(patch)))
    }

    /// Current value of a variable.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.registry.get(name)
    }

    /// Clear every variable after confirmation.
    ///
    /// Returns whether the variables were cleared. A negative answer keeps
    /// them; an ambiguous one is an error.
    pub fn reset(&mut self, confirmation: Confirmation<'_>) -> Result<bool, StateVarError> {
        let answer = match confirmation {
            Confirmation::Prompt(source) => source.confirm(RESET_PROMPT)?,
            Confirmation::Answer(value) => value,
        };
        if canonical_bool(&answer)? {
            self.registry.reset_variables();
            return Ok(true);
        }
        if self.registry.governance().verbose {
            tracing::info!(label = %self.registry.governance().label, "not resetting");
        }
        Ok(false)
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl fmt::Display for StateVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.registry.describe(self.registry.governance().verbose);
        fmt::Display::fmt(&report, f)
    }
}

fn log_rejections(outcome: &ApplyOutcome) {
    for name in outcome.rejected() {
        tracing::debug!(variable = %name, "initial update rejected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governance::NotifyMode;
    use statevar_core::{TypeSpec, TypeTag, ValidationError};

    struct Scripted(Vec<&'static str>);

    impl Confirm for Scripted {
        fn confirm(&mut self, _prompt: &str) -> Result<Value, StateVarError> {
            Ok(Value::from(self.0.remove(0)))
        }
    }

    fn radio() -> StateVariable {
        StateVariable::new(
            Request::new()
                .package("maximal")
                .param("label", "rx")
                .state(StateInput::inline([("frequency", 1420.0), ("bandwidth", 1.0)])),
        )
        .unwrap()
    }

    #[test]
    fn construction_under_maximal_declares_initial_state() {
        let sv = radio();
        assert_eq!(sv.get("frequency"), Some(&Value::Float(1420.0)));
        let g = sv.registry().governance();
        assert_eq!(g.package, "maximal");
        assert_eq!(g.notify_type, NotifyMode::Error);
        assert_eq!(g.label, "rx");
    }

    #[test]
    fn maximal_rejects_wrong_type() {
        let mut sv = radio();
        let err = sv.set("frequency", "abc").unwrap_err();
        assert!(matches!(
            err,
            StateVarError::Validation(ValidationError::WrongType { .. })
        ));
        assert_eq!(sv.get("frequency"), Some(&Value::Float(1420.0)));
    }

    #[test]
    fn init_override_admits_new_name_once() {
        let mut sv = radio();
        sv.state_with_override(
            Request::new().state(StateInput::inline([("gain", 3)])),
            Override::Init,
        )
        .unwrap();
        assert_eq!(sv.get("gain"), Some(&Value::Int(3)));
        assert_eq!(sv.registry().governance().package, "maximal");
        assert!(sv.set("offset", 1).is_err());
    }

    #[test]
    fn params_override_is_restored() {
        let mut sv = radio();
        let mut params = ParamMap::new();
        params.insert("notify_type".into(), Value::from("ignore"));
        params.insert("enforce_type".into(), Value::Bool(false));
        sv.state_with_override(
            Request::new().state(StateInput::inline([("bandwidth", "wide")])),
            Override::Params(params),
        )
        .unwrap();
        assert_eq!(sv.get("bandwidth"), Some(&Value::from("wide")));
        assert!(sv.registry().governance().enforce_type);
    }

    #[test]
    fn facade_names_are_protected() {
        let mut sv = StateVariable::new(Request::new().package("minimal")).unwrap();
        let err = sv.set("reset", 1).unwrap_err();
        assert!(matches!(err, StateVarError::ProtectedName(_)));
    }

    #[test]
    fn extra_protected_names() {
        let mut sv = StateVariable::with_protected(Request::new(), ["antenna"]).unwrap();
        assert!(matches!(
            sv.set("antenna", "dish"),
            Err(StateVarError::ProtectedName(_))
        ));
    }

    #[test]
    fn set_descriptor_uses_embedded_name() {
        let mut sv = StateVariable::new(Request::new()).unwrap();
        let patch = DescriptorPatch::value(7)
            .named("gain")
            .typed(TypeSpec::Tag(TypeTag::Int))
            .described("LNA gain");
        sv.set_descriptor(patch).unwrap();
        let d = sv.registry().descriptor("gain").unwrap();
        assert_eq!(d.description.as_deref(), Some("LNA gain"));
    }

    #[test]
    fn reset_declined_keeps_state() {
        let mut sv = radio();
        assert!(!sv.reset(Confirmation::Answer(Value::from("n"))).unwrap());
        assert!(sv.get("frequency").is_some());
    }

    #[test]
    fn reset_prompt_confirmed_clears_state() {
        let mut sv = radio();
        let mut script = Scripted(vec!["yes"]);
        assert!(sv.reset(Confirmation::Prompt(&mut script)).unwrap());
        assert!(sv.get("frequency").is_none());
        assert_eq!(sv.registry().governance().label, "rx");
    }

    #[test]
    fn reset_ambiguous_answer_fails() {
        let mut sv = radio();
        let err = sv.reset(Confirmation::Answer(Value::from("maybe"))).unwrap_err();
        assert!(matches!(err, StateVarError::AmbiguousBool(_)));
        assert!(sv.get("frequency").is_some());
    }

    #[test]
    fn display_lists_variables() {
        let sv = radio();
        let text = sv.to_string();
        assert!(text.contains("Internal state:"));
        assert!(text.contains("frequency"));
    }
}
