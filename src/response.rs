#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Student responses and the submission file parser.
//!
//! A submission is a single SQL file split into sections by problem headers:
//!
//! ```sql
//! -- [Problem 1a]
//! -- Find every student.
//! SELECT * FROM student;
//!
//! -- [Results]
//! -- +----+------+
//! -- | id | name |
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Matches a well-formed problem header and captures the problem number.
static PROBLEM_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*--\s*\[Problem\s+([0-9]+[a-zA-Z]*)\]").expect("valid problem header regex")
});

/// Matches the header that starts a pasted results block.
static RESULTS_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*--\s*\[Results\]").expect("valid results header regex"));

/// A student's answer to one problem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// The submitted SQL, trimmed.
    pub sql:      String,
    /// Comments written alongside the SQL.
    pub comments: String,
    /// Results the student pasted in, if any.
    pub results:  Option<String>,
}

impl Response {
    /// Creates a response holding only SQL.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into().trim().to_string(),
            ..Self::default()
        }
    }

    /// Attaches comments.
    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    /// Attaches previously captured results.
    pub fn with_results(mut self, results: impl Into<String>) -> Self {
        self.results = Some(results.into());
        self
    }
}

/// Every response in one submission, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// `(problem number, response)` pairs.
    responses: Vec<(String, Response)>,
}

impl Submission {
    /// Builds a submission from `(number, response)` pairs.
    pub fn from_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = (S, Response)>,
        S: Into<String>,
    {
        Self {
            responses: responses
                .into_iter()
                .map(|(n, r)| (n.into(), r))
                .collect(),
        }
    }

    /// Looks up the response to `number`.
    pub fn get(&self, number: &str) -> Option<&Response> {
        self.responses
            .iter()
            .find(|(n, _)| n == number)
            .map(|(_, r)| r)
    }

    /// Iterates over responses in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Response)> {
        self.responses.iter().map(|(n, r)| (n.as_str(), r))
    }

    /// Number of answered problems.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Returns true if no problem headers were found.
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

/// Which part of a problem section the scanner is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    /// SQL and comments.
    Body,
    /// Inside a `/* ... */` block comment.
    BlockComment,
    /// After `-- [Results]`.
    Results,
}

/// Accumulates one problem section.
#[derive(Default)]
struct Draft {
    /// SQL lines.
    sql:      Vec<String>,
    /// Comment lines.
    comments: Vec<String>,
    /// Results lines, if a results header was seen.
    results:  Option<Vec<String>>,
}

impl Draft {
    /// Records the comment text before the `*/` at `end` and keeps any SQL
    /// that follows it on the same line.
    fn close_block_comment(&mut self, line: &str, end: usize) {
        self.comments
            .push(line[..end].trim_start_matches('*').trim().to_string());
        let after = line[end + 2..].trim();
        if !after.is_empty() {
            self.sql.push(after.to_string());
        }
    }

    /// Finishes the section into a response.
    fn finish(self) -> Response {
        Response {
            sql:      self.sql.join("\n").trim().to_string(),
            comments: self.comments.join("\n").trim().to_string(),
            results:  self
                .results
                .map(|lines| lines.join("\n").trim_end().to_string()),
        }
    }
}

/// Strips a leading `--` (and one following space) from a comment line.
fn comment_text(line: &str) -> &str {
    let line = line.trim_start();
    let line = line.strip_prefix("--").unwrap_or(line);
    line.strip_prefix(' ').unwrap_or(line)
}

/// Moves a finished section into `responses`, replacing an earlier answer
/// to the same problem.
fn flush(current: Option<(String, Draft)>, responses: &mut Vec<(String, Response)>) {
    if let Some((number, draft)) = current {
        let response = draft.finish();
        responses.retain(|(n, _)| n != &number);
        responses.push((number, response));
    }
}

/// Splits a submission file into per-problem responses.
///
/// Text before the first problem header is ignored. A problem that appears
/// twice keeps its last answer.
pub fn parse_submission(text: &str) -> Submission {
    let mut responses: Vec<(String, Response)> = Vec::new();
    let mut current: Option<(String, Draft)> = None;
    let mut section = Section::Body;

    for line in text.lines() {
        if let Some(caps) = PROBLEM_HEADER.captures(line) {
            flush(current.take(), &mut responses);
            current = Some((caps[1].to_string(), Draft::default()));
            section = Section::Body;
            continue;
        }

        let Some((_, draft)) = current.as_mut() else {
            continue;
        };

        match section {
            Section::Results => {
                if let Some(results) = draft.results.as_mut() {
                    results.push(comment_text(line).to_string());
                }
            }
            Section::BlockComment => {
                let trimmed = line.trim();
                if let Some(idx) = trimmed.find("*/") {
                    draft.close_block_comment(trimmed, idx);
                    section = Section::Body;
                } else {
                    draft
                        .comments
                        .push(trimmed.trim_start_matches('*').trim().to_string());
                }
            }
            Section::Body => {
                let trimmed = line.trim_start();
                if RESULTS_HEADER.is_match(line) {
                    draft.results = Some(Vec::new());
                    section = Section::Results;
                } else if trimmed.starts_with("--") {
                    draft.comments.push(comment_text(trimmed).to_string());
                } else if let Some(rest) = trimmed.strip_prefix("/*") {
                    match rest.find("*/") {
                        Some(idx) => draft.close_block_comment(rest, idx),
                        None => {
                            draft.comments.push(rest.trim().to_string());
                            section = Section::BlockComment;
                        }
                    }
                } else {
                    draft.sql.push(line.to_string());
                }
            }
        }
    }
    flush(current.take(), &mut responses);

    Submission { responses }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
-- Name: Ada
-- [Problem 1]
-- Every student.
SELECT *
FROM student;

-- [Results]
-- +----+
-- | id |
-- [Problem 2a]
/* Adds a course
   to the catalog */
INSERT INTO course VALUES (1, 'DB');
";

    #[test]
    fn splits_problems_and_sections() {
        let submission = parse_submission(SAMPLE);
        assert_eq!(submission.len(), 2);

        let first = submission.get("1").expect("problem 1");
        assert_eq!(first.sql, "SELECT *\nFROM student;");
        assert_eq!(first.comments, "Every student.");
        assert_eq!(first.results.as_deref(), Some("+----+\n| id |"));

        let second = submission.get("2a").expect("problem 2a");
        assert!(second.sql.starts_with("INSERT INTO course"));
        assert!(second.comments.contains("to the catalog"));
        assert!(second.results.is_none());
    }

    #[test]
    fn sql_after_a_closed_block_comment_is_kept() {
        let submission = parse_submission(
            "-- [Problem 1]\n/* note */ SELECT 1;\n-- [Problem 2]\n/* long\n   note */ SELECT 2;\n",
        );

        let first = submission.get("1").expect("problem 1");
        assert_eq!(first.sql, "SELECT 1;");
        assert_eq!(first.comments, "note");

        let second = submission.get("2").expect("problem 2");
        assert_eq!(second.sql, "SELECT 2;");
        assert_eq!(second.comments, "long\nnote");
    }

    #[test]
    fn text_before_first_header_is_ignored() {
        let submission = parse_submission("SELECT 1;\n-- [Problem 3]\nSELECT 3;");
        assert_eq!(submission.len(), 1);
        assert_eq!(submission.get("3").map(|r| r.sql.as_str()), Some("SELECT 3;"));
    }
}
