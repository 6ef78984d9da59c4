#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use super::{error::GradeError, results::TestOutcome};
use crate::{
    db::{DbError, QueryExecutor, QueryResult, Savepoint, Transaction, result::multiset_eq},
    response::Response,
    spec::InsertTest,
    sql,
};

/// Savepoint wrapped around each statement under test.
const SAVEPOINT: &str = "spt_insert";

/// Grades an INSERT by comparing the rows it adds against the rows the
/// solution adds.
///
/// Both statements run under a savepoint that is rolled back afterwards, so
/// the table is left exactly as it was found whatever the outcome. With
/// `rollback` set the whole test, setup included, also runs inside one
/// transaction that is rolled back at the end.
pub fn grade(
    test: &InsertTest,
    points: f64,
    response: &Response,
    db: &mut dyn QueryExecutor,
) -> Result<TestOutcome, GradeError> {
    if !response.sql.to_lowercase().contains("insert") || !sql::is_single_statement(&response.sql)
    {
        return Ok(TestOutcome::fail(points)
            .with_error("Submission is not a single INSERT statement; it was not run"));
    }

    let before = db.snapshot(&test.table)?;

    let (actual, expected) = if test.rollback {
        let mut txn = Transaction::begin(&mut *db)?;
        let runs = run_both(test, response, &mut *txn, &before);
        txn.rollback()?;
        check_restored(db, &test.table, &before)?;
        runs?
    } else {
        run_both(test, response, db, &before)?
    };

    // Errors from the submission surface only after the table is restored.
    let actual = actual?;
    let expected = expected?;

    if !multiset_eq(expected.rows(), actual.rows()) {
        return Ok(TestOutcome::fail(points).with_output(
            expected.subtract(&before).output(),
            actual.subtract(&before).output(),
        ));
    }

    Ok(TestOutcome::pass())
}

/// Runs the submission and then the solution, each under its own savepoint,
/// and returns the table contents each produced.
///
/// The outer `Result` carries cleanup failures and broken invariants; the
/// inner ones carry the errors raised by each statement.
#[allow(clippy::type_complexity)]
fn run_both(
    test: &InsertTest,
    response: &Response,
    db: &mut dyn QueryExecutor,
    before: &QueryResult,
) -> Result<(Result<QueryResult, DbError>, Result<QueryResult, DbError>), GradeError> {
    let actual = run_isolated(test, &response.sql, db, before)?;
    let expected = run_isolated(test, &test.query, db, before)?;
    Ok((actual, expected))
}

/// Runs `statement` under a savepoint, snapshots the table, then discards
/// the changes and checks that the table is back to `before`.
fn run_isolated(
    test: &InsertTest,
    statement: &str,
    db: &mut dyn QueryExecutor,
    before: &QueryResult,
) -> Result<Result<QueryResult, DbError>, GradeError> {
    let mut savepoint = Savepoint::open(&mut *db, SAVEPOINT)?;
    let result = savepoint
        .execute(statement, test.setup.as_deref(), test.teardown.as_deref())
        .and_then(|_| savepoint.snapshot(&test.table));
    savepoint.discard()?;

    check_restored(db, &test.table, before)?;
    Ok(result)
}

/// Fails loudly if `table` no longer has as many rows as `before`.
fn check_restored(
    db: &mut dyn QueryExecutor,
    table: &str,
    before: &QueryResult,
) -> Result<(), GradeError> {
    let now = db.snapshot(table)?;
    if now.len() != before.len() {
        return Err(GradeError::Inconsistent(format!(
            "rollback left `{table}` with {} rows, expected {}",
            now.len(),
            before.len()
        )));
    }
    Ok(())
}
