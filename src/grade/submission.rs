#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use bon::Builder;

use super::{
    deductions::DeductionTable,
    error::GradeError,
    problem::{Dependencies, ProblemGrader},
    results::{GradedProblem, GradedSubmission},
};
use crate::{
    db::QueryExecutor,
    response::{Response, Submission},
    spec::Assignment,
    style::{StyleChecker, StyleDeductions},
};

/// Grades a whole submission, problem by problem, in assignment order.
#[derive(Clone, Builder)]
pub struct SubmissionGrader<'a> {
    /// The assignment being graded.
    assignment: &'a Assignment,
    /// Table used to resolve deduction codes.
    deductions: &'a DeductionTable,
    /// Style deductions; style is not checked when absent.
    style:      Option<&'a StyleDeductions>,
}

impl SubmissionGrader<'_> {
    /// Grades the responses in `submission` for `student`.
    ///
    /// `source` is the raw submission text, used only for style checking.
    pub fn grade(
        &self,
        student: impl Into<String>,
        submission: &Submission,
        source: Option<&str>,
        db: &mut dyn QueryExecutor,
    ) -> Result<GradedSubmission, GradeError> {
        let student = student.into();
        let grader = ProblemGrader::new(self.deductions);
        let mut deps = Dependencies::new(submission);
        let mut problems = Vec::with_capacity(self.assignment.problems.len());

        for problem in &self.assignment.problems {
            let graded = match submission.get(&problem.number) {
                Some(response) => grader.grade(problem, response, db, &mut deps)?,
                None => {
                    tracing::warn!("{}: no answer to problem {}", student, problem.number);
                    let mut graded = GradedProblem::new(problem, &Response::default());
                    graded
                        .errors
                        .push(format!("No answer to problem {} was submitted", problem.number));
                    graded
                }
            };
            problems.push(graded);
        }

        let (style, style_deduction) = match (self.style, source) {
            (Some(table), Some(text)) => {
                let violations = StyleChecker::new().check(text);
                let points = table.total(&violations);
                (violations.iter().map(ToString::to_string).collect(), points)
            }
            _ => (Vec::new(), 0.0),
        };

        Ok(GradedSubmission {
            student,
            problems,
            style,
            style_deduction,
        })
    }
}
