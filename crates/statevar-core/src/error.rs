//! # Error Types: Structured Error Hierarchy
//!
//! Defines the error types used throughout statevar. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Configuration errors are always fatal: malformed structured-data
//!   references, ambiguous boolean input, unknown type aliases, and
//!   attempts to shadow a protected name.
//! - Validation errors surface only when a notify mode is `error`. They
//!   carry the registry label, the variable name and, for type failures,
//!   the expected vs actual type.
//! - Advisory diagnostics are not errors at all; they travel as notices
//!   alongside successful results.

use thiserror::Error;

/// Top-level error type for statevar.
#[derive(Error, Debug)]
pub enum StateVarError {
    /// Generic configuration failure.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A string could not be interpreted as a boolean.
    #[error("ambiguous bool eval ({0})")]
    AmbiguousBool(String),

    /// A type alias outside the fixed alias table.
    #[error("unrecognized type tag {0:?}")]
    UnknownTypeTag(String),

    /// A new variable would shadow a protected facade name.
    #[error("{0} is a protected name and cannot be declared as a state variable")]
    ProtectedName(String),

    /// A structured-data reference carried too many key segments.
    #[error("too many levels ({segments}) in reference {reference:?}")]
    Format {
        /// The offending reference string.
        reference: String,
        /// Number of colon-separated segments found.
        segments: usize,
    },

    /// A nested key was absent from a loaded document.
    #[error("key {key:?} not found while resolving {reference:?}")]
    MissingKey {
        /// The reference being resolved.
        reference: String,
        /// The key that was not found.
        key: String,
    },

    /// A file could not be read or parsed.
    #[error("load error for '{path}': {reason}")]
    Load {
        /// Path of the file that failed to load.
        path: String,
        /// Reason the file could not be loaded.
        reason: String,
    },

    /// A variable update failed a gate whose notify mode is `error`.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StateVarError {
    /// Whether this error belongs to the configuration family.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::AmbiguousBool(_)
                | Self::UnknownTypeTag(_)
                | Self::ProtectedName(_)
                | Self::Format { .. }
                | Self::MissingKey { .. }
                | Self::Load { .. }
                | Self::Io(_)
        )
    }
}

/// A variable update that failed a validation gate under `error` mode.
///
/// `enforced` records whether the matching enforce flag was on, i.e.
/// whether the update would also have been rejected in `alert` mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The name is not a defined state variable.
    #[error("[{label}] {name} is not a defined state variable")]
    NotDefined {
        /// Label of the registry that raised.
        label: String,
        /// Variable name.
        name: String,
        /// Whether `enforce_set` was on.
        enforced: bool,
    },

    /// The value does not match the expected type.
    #[error("[{label}] {name}: value of type {actual} does not match expected type {expected}")]
    WrongType {
        /// Label of the registry that raised.
        label: String,
        /// Variable name.
        name: String,
        /// Expected type alias.
        expected: String,
        /// Runtime type alias of the offending value.
        actual: String,
        /// Whether `enforce_type` was on.
        enforced: bool,
    },
}

impl ValidationError {
    /// The variable the failure concerns.
    pub fn name(&self) -> &str {
        match self {
            Self::NotDefined { name, .. } | Self::WrongType { name, .. } => name,
        }
    }
}
