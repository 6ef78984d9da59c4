#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{collections::HashMap, fmt, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::error::GradeError;

/// Symbolic partial-credit tags attached by the graders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeductionCode {
    /// Right rows, wrong row order.
    OrderBy,
    /// Right values, wrong column order.
    ColumnOrder,
    /// A computed column was not given an alias.
    RenameValue,
    /// The submission selects more or fewer columns than the solution.
    WrongNumColumns,
}

impl DeductionCode {
    /// Every code, in a stable order.
    pub const ALL: [DeductionCode; 4] = [
        DeductionCode::OrderBy,
        DeductionCode::ColumnOrder,
        DeductionCode::RenameValue,
        DeductionCode::WrongNumColumns,
    ];
}

impl fmt::Display for DeductionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeductionCode::OrderBy => "ORDER_BY",
            DeductionCode::ColumnOrder => "COLUMN_ORDER",
            DeductionCode::RenameValue => "RENAME_VALUE",
            DeductionCode::WrongNumColumns => "WRONG_NUM_COLUMNS",
        };
        write!(f, "{name}")
    }
}

/// Points and explanation for one code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deduction {
    /// Points taken off.
    pub points:      f64,
    /// Explanation shown to the student.
    pub description: String,
}

impl Deduction {
    /// Creates a deduction.
    pub fn new(points: f64, description: impl Into<String>) -> Self {
        Self {
            points,
            description: description.into(),
        }
    }
}

/// Maps deduction codes to their point values.
///
/// Lookups of codes that are missing from the table fail instead of falling
/// back to a default, so a misconfigured table is caught on first use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionTable {
    /// The entries.
    entries: HashMap<DeductionCode, Deduction>,
}

impl Default for DeductionTable {
    fn default() -> Self {
        Self::from_entries([
            (
                DeductionCode::OrderBy,
                Deduction::new(1.0, "Results are not in the required order (missing ORDER BY?)"),
            ),
            (
                DeductionCode::ColumnOrder,
                Deduction::new(1.0, "Columns are not in the required order"),
            ),
            (
                DeductionCode::RenameValue,
                Deduction::new(1.0, "Computed values should be renamed with AS"),
            ),
            (
                DeductionCode::WrongNumColumns,
                Deduction::new(0.0, "Selected the wrong number of columns"),
            ),
        ])
    }
}

impl DeductionTable {
    /// An empty table.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Builds a table from `(code, deduction)` pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = (DeductionCode, Deduction)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Replaces or adds one entry.
    pub fn set(&mut self, code: DeductionCode, deduction: Deduction) {
        self.entries.insert(code, deduction);
    }

    /// Looks up a code.
    pub fn resolve(&self, code: DeductionCode) -> Result<&Deduction, GradeError> {
        self.entries
            .get(&code)
            .ok_or(GradeError::UnknownDeduction(code))
    }

    /// Reads overrides from a JSON object keyed by code name and applies them
    /// on top of the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read deduction table {}", path.display()))?;
        let overrides: HashMap<DeductionCode, Deduction> = serde_json::from_str(&text)
            .with_context(|| format!("Could not parse deduction table {}", path.display()))?;

        let mut table = Self::default();
        for (code, deduction) in overrides {
            table.set(code, deduction);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_code() {
        let table = DeductionTable::default();
        for code in DeductionCode::ALL {
            assert!(table.resolve(code).is_ok(), "missing {code}");
        }
        assert_eq!(
            table
                .resolve(DeductionCode::WrongNumColumns)
                .map(|d| d.points)
                .ok(),
            Some(0.0)
        );
    }

    #[test]
    fn missing_code_is_an_error() {
        let table = DeductionTable::empty();
        assert!(matches!(
            table.resolve(DeductionCode::OrderBy),
            Err(GradeError::UnknownDeduction(DeductionCode::OrderBy))
        ));
    }

    #[test]
    fn codes_serialize_in_screaming_case() {
        let json = serde_json::to_string(&DeductionCode::ColumnOrder).expect("serialize");
        assert_eq!(json, "\"COLUMN_ORDER\"");
    }
}
