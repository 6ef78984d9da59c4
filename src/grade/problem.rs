#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::collections::BTreeSet;

use super::{
    create,
    deductions::DeductionTable,
    error::GradeError,
    function, insert, procedure,
    results::{GradedProblem, GradedTest, TestOutcome},
    select,
};
use crate::{
    db::{DbError, QueryExecutor},
    response::{Response, Submission},
    spec::{ProblemSpec, TestKind, TestSpec},
    sql,
};

/// A student's answers that later problems build on, and which of them have
/// already been run on the current connection.
///
/// An answer is replayed at most once per connection, so two problems that
/// build on the same earlier answer do not create its objects twice.
#[derive(Debug, Clone)]
pub struct Dependencies<'s> {
    /// Every answer in the submission.
    submission: &'s Submission,
    /// Problems whose answers have been run since the last reconnect.
    applied:    BTreeSet<String>,
}

impl<'s> Dependencies<'s> {
    /// Starts with nothing applied.
    pub fn new(submission: &'s Submission) -> Self {
        Self {
            submission,
            applied: BTreeSet::new(),
        }
    }

    /// Returns true if the answer to `number` has been run on the current
    /// connection.
    pub fn is_applied(&self, number: &str) -> bool {
        self.applied.contains(number)
    }

    /// Reconnects `db` and forgets every applied answer, since a fresh
    /// connection starts from the initial schema.
    fn reconnect(&mut self, db: &mut dyn QueryExecutor) -> Result<(), DbError> {
        self.applied.clear();
        db.reconnect()
    }
}

/// Runs every test of a problem against one student's response.
///
/// Database errors raised by a test are charged to that test only: the test
/// loses all of its points and grading moves on to the next one, reconnecting
/// first if the connection was lost. Broken invariants and unknown deduction
/// codes abort grading instead.
#[derive(Debug, Clone, Copy)]
pub struct ProblemGrader<'a> {
    /// Table used to resolve deduction codes.
    deductions: &'a DeductionTable,
}

impl<'a> ProblemGrader<'a> {
    /// Creates a grader that resolves codes against `deductions`.
    pub fn new(deductions: &'a DeductionTable) -> Self {
        Self { deductions }
    }

    /// Grades `response` to `problem`.
    ///
    /// `deps` holds the student's other answers, used when the problem builds
    /// on earlier ones, and tracks which of them `db` has already seen.
    pub fn grade(
        &self,
        problem: &ProblemSpec,
        response: &Response,
        db: &mut dyn QueryExecutor,
        deps: &mut Dependencies<'_>,
    ) -> Result<GradedProblem, GradeError> {
        let mut graded = GradedProblem::new(problem, response);
        pretest(problem, response, &mut graded);

        if let Some(numbers) = &problem.setup_queries
            && let Err(e) = run_dependencies(problem, numbers, deps, db, &mut graded)
        {
            if e.needs_reconnect() {
                deps.reconnect(db)?;
            }
            tracing::warn!("Problem {}: dependency setup failed: {}", problem.number, e);
            graded.errors.push(format!(
                "Could not set up problem {} from your answers to problems {}: {}",
                problem.number,
                numbers.join(", "),
                e
            ));
            graded.got_points = 0.0;
            return Ok(graded);
        }

        let mut total = 0.0;
        for test in &problem.tests {
            let graded_test = self.grade_test(test, response, db, deps, &mut graded.errors)?;
            total += graded_test.got_points();
            graded.tests.push(graded_test);
        }

        graded.got_points = clamp_points(total, problem.points);
        tracing::info!(
            "Problem {}: {:.2}/{:.2}",
            problem.number,
            graded.got_points,
            problem.points
        );
        Ok(graded)
    }

    /// Runs one test, contains its database errors, and resolves its
    /// deduction codes. Descriptions of resolved codes and database errors
    /// are appended to `problem_errors`.
    fn grade_test(
        &self,
        test: &TestSpec,
        response: &Response,
        db: &mut dyn QueryExecutor,
        deps: &mut Dependencies<'_>,
        problem_errors: &mut Vec<String>,
    ) -> Result<GradedTest, GradeError> {
        let outcome = match dispatch(test, response, db) {
            Ok(outcome) => outcome,
            Err(GradeError::Db(e)) => {
                tracing::warn!("{} test failed with a database error: {}", test.kind.name(), e);
                let message = match &e {
                    DbError::Connection(_) => {
                        deps.reconnect(db)?;
                        format!("DATABASE CONNECTION ERROR {e}")
                    }
                    DbError::Query(_) | DbError::Timeout(_) => format!("MYSQL ERROR {e}"),
                };
                problem_errors.push(message);
                TestOutcome::fail(test.points)
            }
            Err(e) => return Err(e),
        };

        let mut lost = outcome.lost;
        for code in &outcome.deductions {
            let deduction = self.deductions.resolve(*code)?;
            problem_errors.push(deduction.description.clone());
            lost += deduction.points;
        }

        Ok(GradedTest::builder()
            .kind(test.kind.name())
            .errors(outcome.errors)
            .deductions(outcome.deductions)
            .tolerated(outcome.tolerated)
            .success(outcome.success)
            .got_points(clamp_points(test.points - lost, test.points))
            .out_of(test.points)
            .maybe_expected(outcome.expected)
            .maybe_actual(outcome.actual)
            .build())
    }
}

/// Sends a test to the grader for its kind.
fn dispatch(
    test: &TestSpec,
    response: &Response,
    db: &mut dyn QueryExecutor,
) -> Result<TestOutcome, GradeError> {
    match &test.kind {
        TestKind::Select(t) => select::grade(t, test.points, response, db),
        TestKind::Insert(t) => insert::grade(t, test.points, response, db),
        TestKind::Create(t) => create::grade(t, response),
        TestKind::StoredProcedure(t) => procedure::grade(t, test.points, response, db),
        TestKind::Function(t) => function::grade(t, test.points, response, db),
    }
}

/// Records checks that do not cost points: required keywords that are
/// missing from the submitted SQL.
fn pretest(problem: &ProblemSpec, response: &Response, graded: &mut GradedProblem) {
    let Some(keywords) = &problem.keywords else {
        return;
    };

    let missing: Vec<&str> = keywords
        .iter()
        .filter(|k| !response.sql.contains(k.as_str()))
        .map(String::as_str)
        .collect();

    if !missing.is_empty() {
        graded
            .errors
            .push(format!("MISSING KEYWORDS {}", missing.join(", ")));
    }
}

/// Runs the student's own answers to the problems `problem` builds on,
/// skipping those already run on this connection.
fn run_dependencies(
    problem: &ProblemSpec,
    numbers: &[String],
    deps: &mut Dependencies<'_>,
    db: &mut dyn QueryExecutor,
    graded: &mut GradedProblem,
) -> Result<(), DbError> {
    let submission = deps.submission;
    for number in numbers {
        if deps.is_applied(number) {
            continue;
        }
        match submission.get(number) {
            Some(dep) => {
                db.execute_batch(&format!("{};", sql::strip_terminator(&dep.sql)))?;
                deps.applied.insert(number.clone());
            }
            None => graded.errors.push(format!(
                "No answer to problem {number} was found; problem {} builds on it",
                problem.number
            )),
        }
    }
    Ok(())
}

/// Clamps a score into `[0, out_of]`.
fn clamp_points(points: f64, out_of: f64) -> f64 {
    points.max(0.0).min(out_of)
}
