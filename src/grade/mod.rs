#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// CREATE test grader.
pub mod create;
/// Deduction codes and the table that prices them.
pub mod deductions;
/// Errors that stop grading.
pub mod error;
/// Stored function test grader.
pub mod function;
/// Gradescope report format.
pub mod gradescope;
/// INSERT test grader.
pub mod insert;
/// Per-problem grading.
pub mod problem;
/// Stored procedure test grader.
pub mod procedure;
/// Shared grade result types.
pub mod results;
/// SELECT test grader.
pub mod select;
/// Whole-submission grading.
pub mod submission;

pub use deductions::{Deduction, DeductionCode, DeductionTable};
pub use error::GradeError;
pub use gradescope::{
    GradescopeOutputFormat, GradescopeStatus, GradescopeSubmission, GradescopeTestCase,
    GradescopeVisibility,
};
pub use problem::{Dependencies, ProblemGrader};
pub use results::{GradedProblem, GradedSubmission, GradedTest, TestOutcome};
pub use submission::SubmissionGrader;
