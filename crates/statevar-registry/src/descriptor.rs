//! # Variable Descriptors
//!
//! A [`VariableDescriptor`] is one declared state variable: name, value,
//! resolved type and description. Updates arrive as [`DescriptorPatch`]es
//! that carry only the fields being changed.
//!
//! Callers hand state to the registry in one of several shapes, modeled
//! by [`StateInput`]. Each variant has its own normalizer; all of them
//! converge on a name → patch map.
//!
//! ## File format
//!
//! Descriptor fields use the `state_*` names on disk:
//!
//! ```yaml
//! frequency:
//!   state_value: 1420.0
//!   state_type: float
//!   state_description: Frequency in MHz
//! bandwidth: 1.0
//! ```

use std::collections::BTreeMap;

use serde::Serialize;
use statevar_core::{
    mapping_from_input, LoaderInput, StateVarError, TypeSpec, TypeTag, Value,
};

/// Field carrying the variable name in records and single descriptors.
pub const NAME_FIELD: &str = "state_name";
const VALUE_FIELD: &str = "state_value";
const TYPE_FIELD: &str = "state_type";
const DESCRIPTION_FIELD: &str = "state_description";

// ─── Descriptor ──────────────────────────────────────────────────────

/// A stored state variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDescriptor {
    /// Unique name within the registry.
    #[serde(rename = "state_name")]
    pub name: String,
    /// Current value.
    #[serde(rename = "state_value")]
    pub value: Value,
    /// Resolved type; `None` means untyped.
    #[serde(rename = "state_type")]
    pub type_tag: Option<TypeTag>,
    /// Optional description.
    #[serde(rename = "state_description")]
    pub description: Option<String>,
}

impl VariableDescriptor {
    /// The default descriptor a brand-new name starts from.
    pub fn blank(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Value::None,
            type_tag: None,
            description: None,
        }
    }

    /// Mapping form using the `state_*` field names.
    pub fn to_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert(NAME_FIELD.to_string(), Value::Str(self.name.clone()));
        map.insert(VALUE_FIELD.to_string(), self.value.clone());
        map.insert(
            TYPE_FIELD.to_string(),
            self.type_tag.map_or(Value::None, |t| Value::from(t.as_str())),
        );
        map.insert(
            DESCRIPTION_FIELD.to_string(),
            Value::from(self.description.clone()),
        );
        Value::Dict(map)
    }
}

// ─── Patch ───────────────────────────────────────────────────────────

/// A partial update to one descriptor. Absent fields are retained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorPatch {
    /// Name, when the patch travels on its own (single form or list form).
    pub name: Option<String>,
    /// New value.
    pub value: Option<Value>,
    /// New type declaration.
    pub type_spec: Option<TypeSpec>,
    /// New description.
    pub description: Option<String>,
}

impl DescriptorPatch {
    /// A patch that only sets a value.
    pub fn value(value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Set the name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the type declaration.
    pub fn typed(mut self, spec: TypeSpec) -> Self {
        self.type_spec = Some(spec);
        self
    }

    /// Set the description.
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether a mapping looks like a descriptor (carries any `state_*` field).
    pub fn is_descriptor_map(map: &BTreeMap<String, Value>) -> bool {
        [NAME_FIELD, VALUE_FIELD, TYPE_FIELD, DESCRIPTION_FIELD]
            .iter()
            .any(|f| map.contains_key(*f))
    }

    /// Parse a descriptor mapping. Unknown fields are ignored.
    ///
    /// # Errors
    ///
    /// - [`StateVarError::UnknownTypeTag`] for an unrecognized `state_type`.
    /// - [`StateVarError::Configuration`] for a non-string name, type or
    ///   description.
    pub fn from_map(map: &BTreeMap<String, Value>) -> Result<Self, StateVarError> {
        let text = |field: &str| -> Result<Option<String>, StateVarError> {
            match map.get(field) {
                None | Some(Value::None) => Ok(None),
                Some(Value::Str(s)) => Ok(Some(s.clone())),
                Some(other) => Err(StateVarError::Configuration(format!(
                    "{field} must be a string, got {other}"
                ))),
            }
        };
        let type_spec = match map.get(TYPE_FIELD) {
            None => None,
            Some(Value::None) => Some(TypeSpec::Untyped),
            Some(Value::Str(s)) => Some(s.parse()?),
            Some(other) => return Err(StateVarError::UnknownTypeTag(other.to_string())),
        };
        Ok(Self {
            name: text(NAME_FIELD)?,
            value: map.get(VALUE_FIELD).cloned(),
            type_spec,
            description: text(DESCRIPTION_FIELD)?,
        })
    }
}

impl TryFrom<&Value> for DescriptorPatch {
    type Error = StateVarError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Dict(map) => Self::from_map(map),
            other => Err(StateVarError::Configuration(format!(
                "descriptor must be a mapping, got {other}"
            ))),
        }
    }
}

// ─── State Input ─────────────────────────────────────────────────────

/// The shapes in which state can be supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum StateInput {
    /// Bare name → value pairs.
    Inline(BTreeMap<String, Value>),
    /// Name → partial descriptor.
    Partial(BTreeMap<String, DescriptorPatch>),
    /// One descriptor carrying its own name.
    Single(DescriptorPatch),
    /// Descriptors carrying their own names.
    List(Vec<DescriptorPatch>),
    /// A `path[:key[:subkey]]` reference to a JSON/YAML document.
    File(String),
}

impl StateInput {
    /// Inline form from any iterator of pairs.
    pub fn inline<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Inline(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Normalize to name → patch.
    pub fn normalize(self) -> Result<BTreeMap<String, DescriptorPatch>, StateVarError> {
        match self {
            Self::Inline(map) => Ok(map
                .into_iter()
                .map(|(k, v)| (k, DescriptorPatch::value(v)))
                .collect()),
            Self::Partial(map) => Ok(map),
            Self::Single(patch) => normalize_list(vec![patch]),
            Self::List(patches) => normalize_list(patches),
            Self::File(reference) => {
                let loaded =
                    mapping_from_input(LoaderInput::Reference(reference), NAME_FIELD)?;
                classify_mapping(loaded)?.normalize()
            }
        }
    }
}

impl TryFrom<Value> for StateInput {
    type Error = StateVarError;

    /// Classify loose state input: a string is a file reference, a list is
    /// a descriptor list, a mapping is a single descriptor, partial
    /// descriptors, or inline values, and `None` is an empty inline map.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::None => Ok(Self::Inline(BTreeMap::new())),
            Value::Str(reference) => Ok(Self::File(reference)),
            Value::List(items) => items
                .iter()
                .map(DescriptorPatch::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            Value::Dict(map) => classify_mapping(map),
            other => Err(StateVarError::Configuration(format!(
                "cannot interpret {other} as state input"
            ))),
        }
    }
}

fn normalize_list(
    patches: Vec<DescriptorPatch>,
) -> Result<BTreeMap<String, DescriptorPatch>, StateVarError> {
    let mut out = BTreeMap::new();
    for patch in patches {
        let name = patch.name.clone().ok_or_else(|| {
            StateVarError::Configuration(format!("descriptor without {NAME_FIELD}"))
        })?;
        out.insert(name, patch);
    }
    Ok(out)
}

fn classify_mapping(map: BTreeMap<String, Value>) -> Result<StateInput, StateVarError> {
    if map.contains_key(NAME_FIELD) {
        return DescriptorPatch::from_map(&map).map(StateInput::Single);
    }
    let mut out = BTreeMap::new();
    for (name, entry) in map {
        let patch = match &entry {
            Value::Dict(inner) if DescriptorPatch::is_descriptor_map(inner) => {
                DescriptorPatch::from_map(inner)?
            }
            _ => DescriptorPatch::value(entry),
        };
        out.insert(name, patch);
    }
    Ok(StateInput::Partial(out))
}
