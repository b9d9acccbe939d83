//! # Apply Outcomes and Notices
//!
//! Advisory diagnostics are returned to the caller as [`Notice`]s in
//! addition to being logged through `tracing`. They describe what the
//! registry did; they are not a programmatic contract and their wording
//! may change.

use std::fmt;

use serde::Serialize;

/// Which validation gate a notice or rejection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    /// New-name gate (`enforce_set` / `notify_set`).
    Set,
    /// Runtime-type gate (`enforce_type` / `notify_type`).
    Type,
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Set => "set",
            Self::Type => "type",
        })
    }
}

/// Kind of advisory notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// A gate tripped in `alert` mode.
    Alert(Gate),
    /// A governance input was rejected or substituted.
    Parameter,
    /// Verbose-only bookkeeping.
    Info,
}

/// One advisory diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Label of the registry that emitted it.
    pub label: String,
    /// Notice kind.
    pub kind: NoticeKind,
    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ALERT:MSV[{}]: {}", self.label, self.message)
    }
}

/// What happened to one variable update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// The descriptor was stored.
    Stored {
        /// Variable name.
        name: String,
        /// Whether the name was new.
        created: bool,
    },
    /// The update was dropped by an enforcing gate.
    Rejected {
        /// Variable name.
        name: String,
        /// The gate that rejected it.
        gate: Gate,
    },
}

impl UpsertOutcome {
    /// Variable name.
    pub fn name(&self) -> &str {
        match self {
            Self::Stored { name, .. } | Self::Rejected { name, .. } => name,
        }
    }

    /// Whether the update was stored.
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored { .. })
    }
}

/// Aggregate result of one `apply` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    /// Whether any governance parameter changed value.
    pub governance_changed: bool,
    /// Per-variable results, in processing order.
    pub variables: Vec<UpsertOutcome>,
    /// Advisory notices, in emission order.
    pub notices: Vec<Notice>,
}

impl ApplyOutcome {
    /// Names of variables that were rejected.
    pub fn rejected(&self) -> impl Iterator<Item = &str> {
        self.variables
            .iter()
            .filter(|o| !o.is_stored())
            .map(UpsertOutcome::name)
    }

    /// Notices of a given kind.
    pub fn notices_of(&self, kind: NoticeKind) -> impl Iterator<Item = &Notice> {
        self.notices.iter().filter(move |n| n.kind == kind)
    }
}
