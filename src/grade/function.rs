#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use super::{error::GradeError, results::TestOutcome};
use crate::{db::QueryExecutor, response::Response, spec::FunctionTest};

/// Grades a stored function by evaluating the solution query and comparing
/// its first value, as text, against the expected scalar.
pub fn grade(
    test: &FunctionTest,
    points: f64,
    response: &Response,
    db: &mut dyn QueryExecutor,
) -> Result<TestOutcome, GradeError> {
    if test.run_query {
        db.execute(&response.sql, None, None)?;
    }

    let result = db.execute(&test.query, test.setup.as_deref(), test.teardown.as_deref())?;
    let actual = result.scalar().map(ToString::to_string);

    match actual {
        Some(value) if value == test.expected => Ok(TestOutcome::pass()),
        Some(value) => Ok(TestOutcome::fail(points).with_output(test.expected.clone(), value)),
        None => Ok(TestOutcome::fail(points)
            .with_output(test.expected.clone(), String::new())
            .with_error("The function query returned no rows")),
    }
}
