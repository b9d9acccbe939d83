//! # Registry Report
//!
//! Structured, side-effect-free snapshot of a registry for display.
//! Long cells are elided in the middle as `head....tail`.

use std::fmt;

use serde::Serialize;

/// Default maximum cell width before elision.
pub const DEFAULT_MAX_ENTRY_LEN: usize = 50;

const HEADERS: [&str; 4] = ["Name", "Value", "Type", "Description"];

/// One variable row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    /// Variable name.
    pub name: String,
    /// Rendered value.
    pub value: String,
    /// Type alias, or `None`.
    pub type_name: String,
    /// Description, or `None`.
    pub description: String,
}

impl ReportRow {
    fn cells(&self) -> [&str; 4] {
        [&self.name, &self.value, &self.type_name, &self.description]
    }
}

/// Snapshot of a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Governance parameters as `(name, rendered value)`, when requested.
    pub governance: Option<Vec<(String, String)>>,
    /// One row per variable, in name order.
    pub variables: Vec<ReportRow>,
}

/// Elide `s` to at most `max_len` characters by keeping both ends.
///
/// Each kept end is `max_len / 2 - 2` characters long, joined by `....`.
/// Widths too narrow to keep anything on either side plainly truncate.
pub fn elide(s: &str, max_len: usize) -> String {
    let len = s.chars().count();
    if len <= max_len {
        return s.to_string();
    }
    let keep = (max_len / 2).saturating_sub(2);
    if keep == 0 {
        return s.chars().take(max_len).collect();
    }
    let head: String = s.chars().take(keep).collect();
    let tail: String = s.chars().skip(len - keep).collect();
    format!("{head}....{tail}")
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(governance) = &self.governance {
            writeln!(f, "Internal state:")?;
            for (k, v) in governance {
                writeln!(f, "\t{k:12}   {v}")?;
            }
        }
        writeln!(f, "State variables:")?;

        let mut widths = HEADERS.map(str::len);
        for row in &self.variables {
            for (w, cell) in widths.iter_mut().zip(row.cells()) {
                *w = (*w).max(cell.chars().count());
            }
        }
        let line = |f: &mut fmt::Formatter<'_>, cells: [&str; 4]| {
            writeln!(
                f,
                "{:w0$} | {:w1$} | {:w2$} | {:w3$}",
                cells[0],
                cells[1],
                cells[2],
                cells[3],
                w0 = widths[0],
                w1 = widths[1],
                w2 = widths[2],
                w3 = widths[3]
            )
        };
        let spacer = widths.map(|w| "-".repeat(w)).join("-+-");

        writeln!(f)?;
        line(f, HEADERS)?;
        writeln!(f, "{spacer}")?;
        for row in &self.variables {
            line(f, row.cells())?;
        }
        writeln!(f, "{spacer}")
    }
}
