#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::results::{GradedProblem, GradedSubmission};

/// Represents output format settings for Gradescope submissions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GradescopeOutputFormat {
    /// Plain text format.
    Text,
    /// HTML format.
    Html,
    /// Like `html`, but also converts newlines into line and page breaks.
    SimpleFormat,
    /// Markdown format.
    Md,
    /// ANSI escape codes, for terminal output.
    Ansi,
}

/// Represents visibility settings for Gradescope submissions and test cases.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GradescopeVisibility {
    /// Hidden from students.
    Hidden,
    /// Visible after the due date of the assignment.
    AfterDueDate,
    /// Visible after the grades are published.
    AfterPublished,
    /// Always visible to students.
    Visible,
}

/// Represents the status of a test case in Gradescope submissions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GradescopeStatus {
    /// Indicates the test case passed successfully.
    Passed,
    /// Indicates the test case failed.
    Failed,
}

/// Represents the overall submission data.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TypedBuilder)]
#[builder(field_defaults(default, setter(into)))]
pub struct GradescopeSubmission {
    /// Optional overall score. Overrides total of test cases if specified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Optional text relevant to the entire submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Optional default output format for test case outputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_output_format: Option<GradescopeOutputFormat>,

    /// Optional default output format for test case names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_name_format: Option<GradescopeOutputFormat>,

    /// Optional visibility setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<GradescopeVisibility>,

    /// Optional stdout visibility setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout_visibility: Option<GradescopeVisibility>,

    /// Optional test cases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests: Option<Vec<GradescopeTestCase>>,
}

/// Represents an individual test case.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TypedBuilder)]
#[builder(field_defaults(default, setter(into)))]
pub struct GradescopeTestCase {
    /// Optional score for the test case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Optional maximum score for the test case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,

    /// Optional status of the test case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<GradescopeStatus>,

    /// Optional name of the test case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Optional number for the test case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,

    /// Optional detailed output for the test case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Optional visibility setting for the test case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<GradescopeVisibility>,
}

impl GradescopeSubmission {
    /// Builds a Gradescope report with one test case per problem, plus one
    /// for style when style was checked.
    ///
    /// A problem counts as passed when its score exceeds `pass_threshold`
    /// times its points.
    pub fn from_graded(graded: &GradedSubmission, pass_threshold: f64) -> Self {
        let mut tests: Vec<GradescopeTestCase> = graded
            .problems
            .iter()
            .map(|p| problem_case(p, pass_threshold))
            .collect();

        if !graded.style.is_empty() {
            tests.push(
                GradescopeTestCase::builder()
                    .name("Style".to_string())
                    .score(-graded.style_deduction)
                    .max_score(0f64)
                    .output(
                        graded
                            .style
                            .iter()
                            .map(|s| format!("- {s}"))
                            .collect::<Vec<_>>()
                            .join("\n"),
                    )
                    .build(),
            );
        }

        GradescopeSubmission::builder()
            .score(graded.got_points())
            .tests(Some(tests))
            .test_output_format(GradescopeOutputFormat::Md)
            .test_name_format(GradescopeOutputFormat::Text)
            .stdout_visibility(GradescopeVisibility::Visible)
            .visibility(GradescopeVisibility::Visible)
            .build()
    }

    /// Writes the report as pretty JSON to `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Builds the test case for one graded problem.
fn problem_case(problem: &GradedProblem, pass_threshold: f64) -> GradescopeTestCase {
    let mut output = problem
        .errors
        .iter()
        .map(|e| format!("- {e}"))
        .collect::<Vec<_>>()
        .join("\n");

    for diff in problem.tests.iter().filter_map(|t| t.diff()) {
        if !output.is_empty() {
            output.push_str("\n\n");
        }
        output.push_str("```diff\n");
        output.push_str(&diff);
        output.push_str("```");
    }

    GradescopeTestCase::builder()
        .name(format!("Problem {}", problem.number))
        .number(problem.number.clone())
        .max_score(problem.out_of)
        .score(problem.got_points)
        .status(if problem.got_points >= pass_threshold * problem.out_of {
            GradescopeStatus::Passed
        } else {
            GradescopeStatus::Failed
        })
        .output(output)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{response::Response, spec::ProblemSpec};

    fn graded(points: &[(f64, f64)]) -> GradedSubmission {
        let problems = points
            .iter()
            .enumerate()
            .map(|(i, (got, out_of))| {
                let spec = ProblemSpec::new((i + 1).to_string(), *out_of);
                let mut problem = GradedProblem::new(&spec, &Response::default());
                problem.got_points = *got;
                problem
            })
            .collect();

        GradedSubmission {
            student: "alice.sql".to_string(),
            problems,
            style: Vec::new(),
            style_deduction: 0.0,
        }
    }

    #[test]
    fn one_case_per_problem_with_status() {
        let report = GradescopeSubmission::from_graded(&graded(&[(5.0, 5.0), (2.0, 5.0)]), 0.999);
        let tests = report.tests.expect("tests");
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].status, Some(GradescopeStatus::Passed));
        assert_eq!(tests[1].status, Some(GradescopeStatus::Failed));
        assert_eq!(report.score, Some(7.0));
    }

    #[test]
    fn problems_worth_nothing_pass() {
        let report = GradescopeSubmission::from_graded(&graded(&[(0.0, 0.0), (1.0, 1.0)]), 1.0);
        let tests = report.tests.expect("tests");
        assert_eq!(tests[0].status, Some(GradescopeStatus::Passed));
        assert_eq!(tests[1].status, Some(GradescopeStatus::Passed));
    }

    #[test]
    fn serializes_in_gradescope_shape() {
        let report = GradescopeSubmission::from_graded(&graded(&[(1.0, 1.0)]), 0.5);
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["tests"][0]["status"], "passed");
        assert_eq!(json["visibility"], "visible");
        assert!(json.get("output").is_none());
    }
}
