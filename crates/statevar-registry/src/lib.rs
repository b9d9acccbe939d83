//! # statevar-registry: Governed State Variables
//!
//! A [`Registry`] holds named state variables together with the governance
//! parameters that police updates to them. Parameters can be set one at a
//! time or in bulk through named [`PolicyPackage`]s; every variable update
//! passes a set gate and a type gate whose strictness the parameters
//! control.
//!
//! ## Quick Start
//!
//! ```
//! use statevar_registry::{Request, StateInput, StateVariable};
//!
//! let mut sv = StateVariable::new(
//!     Request::new()
//!         .package("maximal")
//!         .state(StateInput::inline([("frequency", 1420.0)])),
//! )
//! .unwrap();
//!
//! // Wrong type under `maximal` is a hard error; the old value stays.
//! assert!(sv.set("frequency", "abc").is_err());
//! assert!(sv.set("frequency", 1421.5).is_ok());
//! ```
//!
//! ## Modules
//!
//! - [`governance`]: the parameter schema and its coercion rules.
//! - [`package`]: built-in and user policy packages.
//! - [`descriptor`]: variable descriptors and the accepted state shapes.
//! - [`registry`]: the engine, including diff/restore and scoped overrides.
//! - [`outcome`]: per-update results and advisory notices.
//! - [`report`]: display snapshots.
//! - [`facade`]: the [`StateVariable`] wrapper and reset confirmation.

pub mod descriptor;
pub mod facade;
pub mod governance;
pub mod outcome;
pub mod package;
pub mod registry;
pub mod report;

pub use descriptor::{DescriptorPatch, StateInput, VariableDescriptor};
pub use facade::{Confirm, Confirmation, Override, StateVariable, StdinConfirm, FACADE_NAMES};
pub use governance::{
    Coercion, Governance, NotifyMode, ParamKey, ParamMap, ParamValue, USER_PACKAGE,
};
pub use outcome::{ApplyOutcome, Gate, Notice, NoticeKind, UpsertOutcome};
pub use package::{PackageRef, PackageTable, PolicyPackage, INIT_PACKAGE};
pub use registry::{OverrideGuard, ParamDiff, Registry, Request};
pub use report::{Report, ReportRow};

pub use statevar_core::{StateVarError, TypeSpec, TypeTag, ValidationError, Value};
