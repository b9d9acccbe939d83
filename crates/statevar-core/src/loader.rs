//! # Structured-Input Loader
//!
//! Normalizes loose input into a name → value mapping. Input is either
//! already a mapping, a list of records keyed by a designated field, or a
//! reference string of the form
//!
//! ```text
//! <filepath>[:<key>[:<subkey>]]
//! ```
//!
//! where `filepath` ends in `.json`, `.yaml` or `.yml`. The file is parsed
//! according to its extension and the optional keys select a nested
//! mapping. YAML documents are normalized through JSON so both formats
//! produce identical [`Value`] trees.
//!
//! Files are read in one blocking call; no handle outlives the read.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value as JsonValue;

use crate::error::StateVarError;
use crate::value::Value;

/// Maximum number of colon-separated key segments after the path.
pub const MAX_REFERENCE_KEYS: usize = 2;

/// File extensions recognized as structured data.
pub const STRUCTURED_EXTENSIONS: &[&str] = &[".json", ".yaml", ".yml"];

/// A parsed `path[:key[:subkey]]` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredRef {
    /// File path.
    pub path: String,
    /// Nested keys to descend through after parsing, outermost first.
    pub keys: Vec<String>,
}

/// Loose input accepted by [`mapping_from_input`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoaderInput {
    /// Nothing; normalizes to an empty mapping.
    None,
    /// An inline mapping, returned as-is.
    Mapping(BTreeMap<String, Value>),
    /// A list of record mappings, indexed by the designated key field.
    Records(Vec<Value>),
    /// A `path[:key[:subkey]]` reference.
    Reference(String),
}

/// Whether `s` names a file with a structured-data extension.
pub fn is_structured_path(s: &str) -> bool {
    let path = s.split(':').next().unwrap_or(s).to_lowercase();
    STRUCTURED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Split a reference into its path and nested keys.
///
/// # Errors
///
/// Returns [`StateVarError::Format`] when more than
/// [`MAX_REFERENCE_KEYS`] key segments follow the path.
pub fn parse_reference(reference: &str) -> Result<StructuredRef, StateVarError> {
    let mut segments = reference.split(':');
    let path = segments.next().unwrap_or_default().to_string();
    let keys: Vec<String> = segments.map(str::to_string).collect();
    if keys.len() > MAX_REFERENCE_KEYS {
        return Err(StateVarError::Format {
            reference: reference.to_string(),
            segments: keys.len() + 1,
        });
    }
    Ok(StructuredRef { path, keys })
}

/// Load and parse a JSON or YAML file, choosing the format by extension.
pub fn load_document(path: &Path) -> Result<Value, StateVarError> {
    let load_err = |reason: String| StateVarError::Load {
        path: path.display().to_string(),
        reason,
    };

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let content = std::fs::read_to_string(path)
        .map_err(|e| load_err(format!("cannot read file: {e}")))?;

    let json_value = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str::<JsonValue>(&content)
            .map_err(|e| load_err(format!("invalid YAML: {e}")))?,
        "json" => serde_json::from_str(&content)
            .map_err(|e| load_err(format!("invalid JSON: {e}")))?,
        other => return Err(load_err(format!("unsupported extension {other:?}"))),
    };

    tracing::debug!(path = %path.display(), "loaded structured document");
    Ok(Value::from(json_value))
}

/// Load the document a reference points at and descend through its keys.
///
/// # Errors
///
/// - [`StateVarError::Format`] for too many key segments.
/// - [`StateVarError::Load`] if the file cannot be read or parsed.
/// - [`StateVarError::MissingKey`] if a key is absent or the value being
///   descended into is not a mapping.
pub fn load_reference(reference: &str) -> Result<Value, StateVarError> {
    let parsed = parse_reference(reference)?;
    let mut current = load_document(Path::new(&parsed.path))?;
    for key in &parsed.keys {
        current = match current {
            Value::Dict(mut map) => map.remove(key),
            _ => None,
        }
        .ok_or_else(|| StateVarError::MissingKey {
            reference: reference.to_string(),
            key: key.clone(),
        })?;
    }
    Ok(current)
}

/// Normalize loose input into a name → value mapping.
///
/// Records (from [`LoaderInput::Records`] or a loaded list) are indexed by
/// the string found under `list_key`.
pub fn mapping_from_input(
    input: LoaderInput,
    list_key: &str,
) -> Result<BTreeMap<String, Value>, StateVarError> {
    match input {
        LoaderInput::None => Ok(BTreeMap::new()),
        LoaderInput::Mapping(map) => Ok(map),
        LoaderInput::Records(records) => index_records(records, list_key),
        LoaderInput::Reference(reference) => match load_reference(&reference)? {
            Value::None => Ok(BTreeMap::new()),
            Value::Dict(map) => Ok(map),
            Value::List(records) => index_records(records, list_key),
            other => Err(StateVarError::Configuration(format!(
                "{reference} resolved to a {} rather than a mapping",
                other.type_tag().map_or("None", |t| t.as_str())
            ))),
        },
    }
}

fn index_records(
    records: Vec<Value>,
    list_key: &str,
) -> Result<BTreeMap<String, Value>, StateVarError> {
    let mut out = BTreeMap::new();
    for record in records {
        let name = record
            .as_dict()
            .and_then(|m| m.get(list_key))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StateVarError::MissingKey {
                reference: record.to_string(),
                key: list_key.to_string(),
            })?;
        out.insert(name, record);
    }
    Ok(out)
}
