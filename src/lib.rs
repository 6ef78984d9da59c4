//! # sqlgrader
//!
//! An autograder for SQL assignments. Student answers are parsed out of a
//! single annotated `.sql` file, run against a database next to the
//! instructor's solution queries, and scored problem by problem.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Runtime configuration read from the environment
pub mod config;
/// Database access: executors, query results, savepoints
pub mod db;
/// For all things related to grading
pub mod grade;
/// Parsing student submission files
pub mod response;
/// Assignment and test definitions
pub mod spec;
/// Lexical helpers for SQL text
pub mod sql;
/// Style checks on submission text
pub mod style;
/// Shared value types
pub mod types;

use db::QueryExecutor;
use grade::{DeductionTable, GradeError, GradedSubmission, SubmissionGrader};
use spec::Assignment;
use style::StyleDeductions;

/// Parses `text` as a submission and grades it against `assignment`.
///
/// Style is checked only when `style` is given.
pub fn grade_text(
    assignment: &Assignment,
    deductions: &DeductionTable,
    style: Option<&StyleDeductions>,
    student: &str,
    text: &str,
    db: &mut dyn QueryExecutor,
) -> Result<GradedSubmission, GradeError> {
    let submission = response::parse_submission(text);
    tracing::debug!("{}: found answers to {} problems", student, submission.len());

    SubmissionGrader::builder()
        .assignment(assignment)
        .deductions(deductions)
        .maybe_style(style)
        .build()
        .grade(student, &submission, Some(text), db)
}
