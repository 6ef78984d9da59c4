#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Instructor-authored assignment definitions.
//!
//! Assignments are read from JSON. Each test carries a `type` tag that picks
//! the grader and the fields that grader understands:
//!
//! ```json
//! {
//!   "name": "hw3",
//!   "problems": [{
//!     "number": "1",
//!     "points": 4,
//!     "keywords": ["GROUP BY"],
//!     "tests": [{ "type": "select", "points": 4, "query": "SELECT ...", "rename": true }]
//!   }]
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

/// A whole assignment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Assignment {
    /// Assignment name, used in reports.
    #[serde(default)]
    pub name:     String,
    /// Problems in grading order.
    pub problems: Vec<ProblemSpec>,
}

impl Assignment {
    /// Parses an assignment from JSON text and validates it.
    pub fn from_json(text: &str) -> Result<Self> {
        let assignment: Assignment =
            serde_json::from_str(text).context("Could not parse assignment definition")?;
        assignment.validate()?;
        Ok(assignment)
    }

    /// Reads an assignment definition from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid assignment in {}", path.display()))
    }

    /// Checks the invariants the graders rely on.
    pub fn validate(&self) -> Result<()> {
        for problem in &self.problems {
            problem.validate()?;
            for dep in problem.setup_queries.iter().flatten() {
                ensure!(
                    self.problems.iter().any(|p| &p.number == dep),
                    "Problem {} depends on unknown problem {}",
                    problem.number,
                    dep
                );
            }
        }
        Ok(())
    }

    /// Total points available.
    pub fn points(&self) -> f64 {
        self.problems.iter().map(|p| p.points).sum()
    }
}

/// One problem of an assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProblemSpec {
    /// Problem number as it appears in the submission header, e.g. `2a`.
    pub number:        String,
    /// Points available for the problem.
    pub points:        f64,
    /// Tests run against the response, in order.
    #[serde(default)]
    pub tests:         Vec<TestSpec>,
    /// Substrings the submitted SQL is expected to contain.
    #[serde(default)]
    pub keywords:      Option<Vec<String>>,
    /// Problems whose submitted SQL must be run first.
    #[serde(default)]
    pub setup_queries: Option<Vec<String>>,
}

impl ProblemSpec {
    /// Creates a problem with no tests.
    pub fn new(number: impl Into<String>, points: f64) -> Self {
        Self {
            number: number.into(),
            points,
            tests: Vec::new(),
            keywords: None,
            setup_queries: None,
        }
    }

    /// Adds a test.
    pub fn with_test(mut self, test: TestSpec) -> Self {
        self.tests.push(test);
        self
    }

    /// Sets the required keywords.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the prerequisite problems.
    pub fn with_setup_queries<I, S>(mut self, numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.setup_queries = Some(numbers.into_iter().map(Into::into).collect());
        self
    }

    /// Checks that points are sane and tests fit in the problem's budget.
    fn validate(&self) -> Result<()> {
        ensure!(self.points >= 0.0, "Problem {} has negative points", self.number);
        for test in &self.tests {
            ensure!(test.points >= 0.0, "Problem {} has a test with negative points", self.number);
        }
        let total: f64 = self.tests.iter().map(|t| t.points).sum();
        ensure!(
            total <= self.points + f64::EPSILON,
            "Problem {} tests are worth {} points but the problem is worth {}",
            self.number,
            total,
            self.points
        );
        Ok(())
    }
}

/// One test of a problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    /// Points at stake.
    pub points: f64,
    /// What kind of test this is, with its parameters.
    #[serde(flatten)]
    pub kind:   TestKind,
}

impl TestSpec {
    /// Creates a test.
    pub fn new(points: f64, kind: impl Into<TestKind>) -> Self {
        Self {
            points,
            kind: kind.into(),
        }
    }
}

/// The closed set of test kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TestKind {
    /// Compare a SELECT against the solution's result set.
    Select(SelectTest),
    /// Compare the rows an INSERT adds against the solution's.
    Insert(InsertTest),
    /// Only surface the submitted DDL.
    Create(CreateTest),
    /// Diff a table before and after calling a stored procedure.
    StoredProcedure(ProcedureTest),
    /// Compare a scalar produced by a stored function.
    Function(FunctionTest),
}

impl TestKind {
    /// Name of the kind as written in assignment files.
    pub fn name(&self) -> &'static str {
        match self {
            TestKind::Select(_) => "select",
            TestKind::Insert(_) => "insert",
            TestKind::Create(_) => "create",
            TestKind::StoredProcedure(_) => "stored-procedure",
            TestKind::Function(_) => "function",
        }
    }
}

/// Parameters of a SELECT test.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SelectTest {
    /// Solution query.
    pub query:        String,
    /// SQL run before each query.
    #[serde(default)]
    pub setup:        Option<String>,
    /// SQL run after each query.
    #[serde(default)]
    pub teardown:     Option<String>,
    /// Row order matters.
    #[serde(default)]
    pub ordered:      bool,
    /// Column order matters.
    #[serde(default)]
    pub column_order: bool,
    /// Computed columns must be aliased.
    #[serde(default)]
    pub rename:       bool,
}

/// Parameters of an INSERT test.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InsertTest {
    /// Solution statement.
    pub query:    String,
    /// Table whose contents are compared.
    pub table:    String,
    /// SQL run before each statement.
    #[serde(default)]
    pub setup:    Option<String>,
    /// SQL run after each statement.
    #[serde(default)]
    pub teardown: Option<String>,
    /// Run the whole test in one transaction that is rolled back at the end.
    #[serde(default)]
    pub rollback: bool,
}

/// Parameters of a CREATE test.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTest {}

/// How a stored-procedure test turns a table diff into points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcedurePolicy {
    /// Never deduct; the diff is surfaced for manual review.
    #[default]
    Lenient,
    /// Deduct the test's points when the call changed nothing.
    RequireChange,
}

/// Parameters of a stored-procedure test.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProcedureTest {
    /// Statement that invokes the procedure.
    pub query:     String,
    /// Table diffed around the call.
    pub table:     String,
    /// SQL run before the call.
    #[serde(default)]
    pub setup:     Option<String>,
    /// SQL run after the call.
    #[serde(default)]
    pub teardown:  Option<String>,
    /// Run the submitted SQL (usually the procedure definition) first.
    #[serde(default)]
    pub run_query: bool,
    /// Scoring policy.
    #[serde(default)]
    pub policy:    ProcedurePolicy,
}

/// Parameters of a function test.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FunctionTest {
    /// Query whose first column of the first row is compared.
    pub query:     String,
    /// Expected scalar, compared as text.
    pub expected:  String,
    /// SQL run before the query.
    #[serde(default)]
    pub setup:     Option<String>,
    /// SQL run after the query.
    #[serde(default)]
    pub teardown:  Option<String>,
    /// Run the submitted SQL (usually the function definition) first.
    #[serde(default)]
    pub run_query: bool,
}

impl From<SelectTest> for TestKind {
    fn from(value: SelectTest) -> Self {
        TestKind::Select(value)
    }
}

impl From<InsertTest> for TestKind {
    fn from(value: InsertTest) -> Self {
        TestKind::Insert(value)
    }
}

impl From<CreateTest> for TestKind {
    fn from(value: CreateTest) -> Self {
        TestKind::Create(value)
    }
}

impl From<ProcedureTest> for TestKind {
    fn from(value: ProcedureTest) -> Self {
        TestKind::StoredProcedure(value)
    }
}

impl From<FunctionTest> for TestKind {
    fn from(value: FunctionTest) -> Self {
        TestKind::Function(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_tests_with_kebab_case_flags() {
        let assignment = Assignment::from_json(
            r#"{
                "name": "hw",
                "problems": [
                    {"number": "1", "points": 3, "keywords": ["JOIN"], "tests": [
                        {"type": "select", "points": 2, "query": "SELECT 1", "column-order": true},
                        {"type": "function", "points": 1, "query": "SELECT f()", "expected": "42", "run-query": true}
                    ]},
                    {"number": "2", "points": 1, "setup-queries": ["1"], "tests": [
                        {"type": "stored-procedure", "points": 1, "query": "CALL p()", "table": "t", "policy": "require-change"}
                    ]}
                ]
            }"#,
        )
        .expect("parse assignment");

        let first = &assignment.problems[0];
        match &first.tests[0].kind {
            TestKind::Select(t) => assert!(t.column_order && !t.ordered),
            other => panic!("unexpected kind {}", other.name()),
        }
        match &first.tests[1].kind {
            TestKind::Function(t) => assert!(t.run_query && t.expected == "42"),
            other => panic!("unexpected kind {}", other.name()),
        }
        match &assignment.problems[1].tests[0].kind {
            TestKind::StoredProcedure(t) => assert_eq!(t.policy, ProcedurePolicy::RequireChange),
            other => panic!("unexpected kind {}", other.name()),
        }
        assert_eq!(assignment.points(), 4.0);
    }

    #[test]
    fn rejects_unknown_dependencies_and_overfull_problems() {
        let unknown = r#"{"problems": [{"number": "1", "points": 1, "setup-queries": ["9"]}]}"#;
        assert!(Assignment::from_json(unknown).is_err());

        let overfull = r#"{"problems": [{"number": "1", "points": 1, "tests": [
            {"type": "create", "points": 2}
        ]}]}"#;
        assert!(Assignment::from_json(overfull).is_err());
    }
}
