#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Display;

use bon::Builder;
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Panel, Style, Width, object::Rows},
};

use super::deductions::DeductionCode;
use crate::{response::Response, spec::ProblemSpec};

/// What a single test grader decided, before deduction codes are resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestOutcome {
    /// Points the grader itself took off.
    pub lost:       f64,
    /// Whether the submission passed the test.
    pub success:    bool,
    /// Codes whose table value is taken off on top of `lost`.
    pub deductions: Vec<DeductionCode>,
    /// Codes recorded for information only; they cost nothing.
    pub tolerated:  Vec<DeductionCode>,
    /// Rendered solution output.
    pub expected:   Option<String>,
    /// Rendered submission output.
    pub actual:     Option<String>,
    /// Messages for the student.
    pub errors:     Vec<String>,
}

impl TestOutcome {
    /// A passing outcome with nothing taken off.
    pub fn pass() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// A failing outcome that loses `lost` points.
    pub fn fail(lost: f64) -> Self {
        Self {
            lost,
            success: false,
            ..Self::default()
        }
    }

    /// Attaches rendered expected and actual output.
    pub fn with_output(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }

    /// Attaches a message for the student.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }
}

/// The graded result of one test.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(on(String, into))]
pub struct GradedTest {
    /// Kind of test, e.g. `select`.
    kind:       String,
    /// Messages for the student.
    #[builder(default)]
    errors:     Vec<String>,
    /// Codes that cost points.
    #[builder(default)]
    deductions: Vec<DeductionCode>,
    /// Codes recorded without cost.
    #[builder(default)]
    tolerated:  Vec<DeductionCode>,
    /// Whether the submission passed.
    success:    bool,
    /// Points received, in `[0, out_of]`.
    got_points: f64,
    /// Points available.
    out_of:     f64,
    /// Rendered solution output.
    expected:   Option<String>,
    /// Rendered submission output.
    actual:     Option<String>,
}

impl GradedTest {
    /// Kind of test.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Messages for the student.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Codes that cost points.
    pub fn deductions(&self) -> &[DeductionCode] {
        &self.deductions
    }

    /// Codes recorded without cost.
    pub fn tolerated(&self) -> &[DeductionCode] {
        &self.tolerated
    }

    /// Whether the submission passed.
    pub fn success(&self) -> bool {
        self.success
    }

    /// Points received.
    pub fn got_points(&self) -> f64 {
        self.got_points
    }

    /// Points available.
    pub fn out_of(&self) -> f64 {
        self.out_of
    }

    /// Rendered solution output.
    pub fn expected(&self) -> Option<&str> {
        self.expected.as_deref()
    }

    /// Rendered submission output.
    pub fn actual(&self) -> Option<&str> {
        self.actual.as_deref()
    }

    /// Line diff from expected to actual output, if both were captured and
    /// they differ.
    pub fn diff(&self) -> Option<String> {
        let (expected, actual) = (self.expected.as_deref()?, self.actual.as_deref()?);
        if expected == actual {
            return None;
        }

        let diff = TextDiff::from_lines(expected, actual);
        let mut output = String::new();
        for change in diff.iter_all_changes() {
            let prefix = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            output.push_str(&format!("{prefix} {change}"));
            if change.missing_newline() {
                output.push('\n');
            }
        }
        Some(output)
    }
}

/// The graded result of one problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedProblem {
    /// Problem number.
    pub number:            String,
    /// Comments the student wrote.
    pub comments:          String,
    /// The submitted SQL.
    pub sql:               String,
    /// Results the student pasted in.
    pub submitted_results: Option<String>,
    /// Problem-level messages, including resolved deduction descriptions.
    pub errors:            Vec<String>,
    /// Per-test results, in problem order.
    pub tests:             Vec<GradedTest>,
    /// Points received, in `[0, out_of]`.
    pub got_points:        f64,
    /// Points available.
    pub out_of:            f64,
}

impl GradedProblem {
    /// Starts a graded problem for `response`, with no points yet.
    pub fn new(problem: &ProblemSpec, response: &Response) -> Self {
        Self {
            number:            problem.number.clone(),
            comments:          response.comments.clone(),
            sql:               response.sql.clone(),
            submitted_results: response.results.clone(),
            errors:            Vec::new(),
            tests:             Vec::new(),
            got_points:        0.0,
            out_of:            problem.points,
        }
    }
}

/// Every graded problem of one student's submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedSubmission {
    /// Who or what was graded, usually the submission file name.
    pub student:         String,
    /// Graded problems, in assignment order.
    pub problems:        Vec<GradedProblem>,
    /// Style violations found in the submission text.
    #[serde(default)]
    pub style:           Vec<String>,
    /// Points taken off for style.
    #[serde(default)]
    pub style_deduction: f64,
}

/// Row of the grading overview table.
#[derive(Tabled)]
struct OverviewRow {
    /// Problem number.
    #[tabled(rename = "Problem")]
    problem: String,
    /// Score as `got/out_of`.
    #[tabled(rename = "Grade")]
    grade:   String,
    /// Joined messages.
    #[tabled(rename = "Reason")]
    reason:  String,
}

impl GradedSubmission {
    /// Points received, after style deductions, never below zero.
    pub fn got_points(&self) -> f64 {
        let total: f64 = self.problems.iter().map(|p| p.got_points).sum();
        (total - self.style_deduction).max(0.0)
    }

    /// Points available.
    pub fn out_of(&self) -> f64 {
        self.problems.iter().map(|p| p.out_of).sum()
    }

    /// Renders an overview table of every problem.
    pub fn summary_table(&self) -> String {
        let mut rows: Vec<OverviewRow> = self
            .problems
            .iter()
            .map(|p| OverviewRow {
                problem: p.number.clone(),
                grade:   format!("{:.2}/{:.2}", p.got_points, p.out_of),
                reason:  p.errors.join("\n"),
            })
            .collect();

        if !self.style.is_empty() {
            rows.push(OverviewRow {
                problem: "Style".to_string(),
                grade:   format!("-{:.2}", self.style_deduction),
                reason:  self.style.join("\n"),
            });
        }

        Table::new(&rows)
            .with(Panel::header(format!("Grading Overview: {}", self.student)))
            .with(Panel::footer(format!(
                "Total: {:.2}/{:.2}",
                self.got_points(),
                self.out_of()
            )))
            .with(Modify::new(Rows::new(1..)).with(Width::wrap(48).keep_words(true)))
            .with(
                Modify::new(Rows::first())
                    .with(Alignment::center())
                    .with(Alignment::center_vertical()),
            )
            .with(
                Modify::new(Rows::last())
                    .with(Alignment::center())
                    .with(Alignment::center_vertical()),
            )
            .with(Style::modern())
            .to_string()
    }
}

impl Display for GradedSubmission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:.2}/{:.2}", self.student, self.got_points(), self.out_of())
    }
}
