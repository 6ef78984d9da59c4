#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use super::{error::GradeError, results::TestOutcome};
use crate::{
    db::QueryExecutor,
    response::Response,
    spec::{ProcedurePolicy, ProcedureTest},
};

/// Grades a stored procedure by diffing a table around a call to it.
///
/// The submitted SQL (normally the `CREATE PROCEDURE`) is run first when
/// `run_query` is set; the solution's invocation always runs, even if the
/// submission failed, so the teardown is never skipped. The rows removed and
/// added by the call are reported as `expected` and `actual` respectively.
pub fn grade(
    test: &ProcedureTest,
    points: f64,
    response: &Response,
    db: &mut dyn QueryExecutor,
) -> Result<TestOutcome, GradeError> {
    let before = db.snapshot(&test.table)?;

    let submitted = if test.run_query {
        db.execute(&response.sql, None, None).map(|_| ())
    } else {
        Ok(())
    };

    let after = db
        .execute(&test.query, test.setup.as_deref(), test.teardown.as_deref())
        .and_then(|_| db.snapshot(&test.table));

    submitted?;
    let after = after?;

    let removed = before.subtract(&after);
    let added = after.subtract(&before);

    let mut outcome =
        TestOutcome::pass().with_output(removed.output_if_any(), added.output_if_any());

    if test.policy == ProcedurePolicy::RequireChange && removed.is_empty() && added.is_empty() {
        outcome.lost = points;
        outcome.success = false;
        outcome
            .errors
            .push(format!("Calling the procedure did not change `{}`", test.table));
    }

    Ok(outcome)
}
