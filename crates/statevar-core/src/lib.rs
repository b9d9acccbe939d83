//! # statevar-core: Foundational Types for statevar
//!
//! This crate is the leaf of the statevar workspace. It defines the value
//! model and the coercion rules that the registry and the interval
//! tracker build on. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Closed value model.** [`Value`] enumerates every runtime kind a
//!    state variable can hold, so "the runtime type of a value" is a total
//!    function ([`Value::type_tag`]).
//!
//! 2. **Type aliases resolve through one table.** [`TypeSpec`] parses the
//!    fixed alias set (`float`, `int`, ..., `auto`, `none`) and rejects
//!    everything else instead of defaulting to `str`.
//!
//! 3. **Loud boolean coercion.** [`canonical_bool`] fails on ambiguous
//!    strings rather than guessing.
//!
//! 4. **One loader for JSON and YAML.** [`loader`] reads both formats into
//!    the same [`Value`] tree and resolves `path[:key[:subkey]]` references.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `statevar-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod coerce;
pub mod error;
pub mod loader;
pub mod types;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use coerce::{bool_from_str, canonical_bool};
pub use error::{StateVarError, ValidationError};
pub use loader::{
    is_structured_path, load_document, load_reference, mapping_from_input, parse_reference,
    LoaderInput, StructuredRef,
};
pub use types::{canonical_type, TypeSpec, TypeTag};
pub use value::Value;
