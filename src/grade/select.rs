#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use super::{deductions::DeductionCode, error::GradeError, results::TestOutcome};
use crate::{
    db::{
        QueryExecutor,
        result::{sorted_rows, sorted_within_rows},
    },
    response::Response,
    spec::SelectTest,
    sql::{self, StatementKind},
    types::Row,
};

/// Grades a SELECT by comparing its result set against the solution's.
///
/// Row order and column order are ignored unless the test asks for them.
/// When the test asks for an order and the submission gets only the order
/// wrong, the full deduction is swapped for the matching partial-credit code.
pub fn grade(
    test: &SelectTest,
    points: f64,
    response: &Response,
    db: &mut dyn QueryExecutor,
) -> Result<TestOutcome, GradeError> {
    if !sql::check_valid_query(&response.sql, StatementKind::Select) {
        return Ok(TestOutcome::fail(points)
            .with_error("Submission is not a single SELECT statement; it was not run"));
    }

    let setup = test.setup.as_deref();
    let teardown = test.teardown.as_deref();
    let expected = db.execute(&test.query, setup, teardown)?;
    let actual = db.execute(&response.sql, setup, teardown)?;

    if expected.len() != actual.len() {
        return Ok(TestOutcome::fail(points).with_output(expected.output(), actual.output()));
    }

    let mut outcome = TestOutcome::pass();
    let expected_rows = canonicalize(expected.rows(), test.ordered, test.column_order);
    let actual_rows = canonicalize(actual.rows(), test.ordered, test.column_order);

    if expected_rows != actual_rows {
        outcome.lost = points;
        outcome.success = false;
        outcome.expected = Some(expected.output().to_string());
        outcome.actual = Some(actual.output().to_string());

        if test.ordered && sorted_rows(&expected_rows) == sorted_rows(&actual_rows) {
            outcome.lost = 0.0;
            outcome.deductions.push(DeductionCode::OrderBy);
        }

        if test.column_order
            && canonicalize(expected.rows(), test.ordered, false)
                == canonicalize(actual.rows(), test.ordered, false)
        {
            outcome.lost = 0.0;
            outcome.deductions.push(DeductionCode::ColumnOrder);
        }
    } else if !test.column_order
        && canonicalize(expected.rows(), test.ordered, true)
            != canonicalize(actual.rows(), test.ordered, true)
    {
        // values matched only after sorting within rows
        outcome.tolerated.push(DeductionCode::ColumnOrder);
    }

    if test.rename && actual.columns().iter().any(|c| is_unnamed_expression(c)) {
        outcome.deductions.push(DeductionCode::RenameValue);
        outcome.success = false;
    }

    if expected.columns().len() != actual.columns().len() {
        outcome.deductions.push(DeductionCode::WrongNumColumns);
    }

    Ok(outcome)
}

/// Applies the order-insensitive normalizations requested by the flags:
/// rows are sorted unless `ordered`, values inside each row are sorted unless
/// `column_order`.
fn canonicalize(rows: &[Row], ordered: bool, column_order: bool) -> Vec<Row> {
    let rows = if column_order {
        rows.to_vec()
    } else {
        sorted_within_rows(rows)
    };

    if ordered { rows } else { sorted_rows(&rows) }
}

/// A column name that still contains parentheses was taken verbatim from an
/// expression such as `COUNT(*)`.
fn is_unnamed_expression(column: &str) -> bool {
    column.contains('(') || column.contains(')')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    fn rows(data: &[&[i64]]) -> Vec<Row> {
        data.iter()
            .map(|r| r.iter().map(|v| Value::Integer(*v)).collect())
            .collect()
    }

    #[test]
    fn canonicalize_sorts_values_before_rows() {
        let input = rows(&[&[3, 1], &[2, 0]]);
        assert_eq!(canonicalize(&input, false, false), rows(&[&[0, 2], &[1, 3]]));
        assert_eq!(canonicalize(&input, true, false), rows(&[&[1, 3], &[0, 2]]));
        assert_eq!(canonicalize(&input, false, true), rows(&[&[2, 0], &[3, 1]]));
        assert_eq!(canonicalize(&input, true, true), input);
    }

    #[test]
    fn aggregate_names_are_detected() {
        assert!(is_unnamed_expression("COUNT(*)"));
        assert!(is_unnamed_expression("avg(grade"));
        assert!(!is_unnamed_expression("num_students"));
    }
}
