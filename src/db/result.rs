#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tabled::{builder::Builder, settings::Style};

use crate::types::{Row, Value};

/// An immutable snapshot of one executed query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Rows in the order the database returned them.
    rows:    Vec<Row>,
    /// Column names in select-list order.
    columns: Vec<String>,
    /// The result rendered as a text table.
    output:  String,
}

impl QueryResult {
    /// Builds a result and renders its text form.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let output = render(&columns, &rows);
        Self {
            rows,
            columns,
            output,
        }
    }

    /// Returns the rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the rendered text table.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the query returned no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the first column of the first row, if any.
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }

    /// Returns the rows of `self` that are not in `other`, counting
    /// duplicates (multiset difference). Columns are taken from `self`.
    pub fn subtract(&self, other: &QueryResult) -> QueryResult {
        QueryResult::new(self.columns.clone(), multiset_difference(&self.rows, &other.rows))
    }

    /// Text form of the rows, or an empty string when there are none.
    pub fn output_if_any(&self) -> String {
        if self.rows.is_empty() {
            String::new()
        } else {
            self.output.clone()
        }
    }
}

/// Renders rows as an ASCII table with a header line.
fn render(columns: &[String], rows: &[Row]) -> String {
    if columns.is_empty() {
        return String::new();
    }

    let mut builder = Builder::default();
    builder.push_record(columns.iter().cloned());
    for row in rows {
        builder.push_record(row.iter().map(ToString::to_string));
    }

    let mut table = builder.build();
    table.with(Style::ascii());
    table.to_string()
}

/// Sorts rows lexicographically.
pub fn sorted_rows(rows: &[Row]) -> Vec<Row> {
    let mut rows = rows.to_vec();
    rows.sort();
    rows
}

/// Sorts the values inside each row, keeping the row order.
pub fn sorted_within_rows(rows: &[Row]) -> Vec<Row> {
    rows.iter()
        .map(|row| {
            let mut row = row.clone();
            row.sort();
            row
        })
        .collect()
}

/// Returns true if the two row sequences contain the same rows with the same
/// multiplicities, ignoring order.
pub fn multiset_eq(a: &[Row], b: &[Row]) -> bool {
    a.len() == b.len() && sorted_rows(a) == sorted_rows(b)
}

/// Rows of `a` not matched by a row of `b`, one-for-one.
pub fn multiset_difference(a: &[Row], b: &[Row]) -> Vec<Row> {
    let a = sorted_rows(a);
    let b = sorted_rows(b);
    let mut out = Vec::new();
    let mut j = 0;

    for row in a {
        while j < b.len() && b[j] < row {
            j += 1;
        }
        if j < b.len() && b[j].cmp(&row) == Ordering::Equal {
            j += 1;
        } else {
            out.push(row);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[i64]) -> Row {
        values.iter().map(|v| Value::Integer(*v)).collect()
    }

    #[test]
    fn difference_respects_multiplicity() {
        let a = vec![row(&[1]), row(&[1]), row(&[2]), row(&[3])];
        let b = vec![row(&[1]), row(&[3])];
        assert_eq!(multiset_difference(&a, &b), vec![row(&[1]), row(&[2])]);
    }

    #[test]
    fn multiset_eq_ignores_order_but_not_counts() {
        assert!(multiset_eq(&[row(&[2]), row(&[1])], &[row(&[1]), row(&[2])]));
        assert!(!multiset_eq(&[row(&[1]), row(&[1])], &[row(&[1]), row(&[2])]));
    }

    #[test]
    fn empty_subtraction_renders_nothing() {
        let before = QueryResult::new(vec!["id".into()], vec![row(&[1])]);
        let after = before.clone();
        assert_eq!(after.subtract(&before).output_if_any(), "");
        assert!(before.output().contains("id"));
    }
}
