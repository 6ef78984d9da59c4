#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Style checking for submission files.
//!
//! The checker scans a submission line by line. The little state it needs
//! (whether a header has been seen, whether it is inside a block comment or a
//! pasted results block) lives in [`StyleChecker`] itself.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    path::Path,
    sync::LazyLock,
};

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lines longer than this are flagged, except inside results blocks.
pub const MAX_LINE_LENGTH: usize = 80;

/// A character that is not whitespace, a parenthesis or an operator.
const S: &str = r"[^() \t\n\r\f\v<>=+*-]";

/// Compiles a pattern that is known to be valid.
fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid style regex")
}

/// Well-formed problem header.
static HEADER: LazyLock<Regex> = LazyLock::new(|| re(r"-- \[Problem ([0-9])+([a-zA-Z])*\]"));
/// Results block header.
static RESULT_HEADER: LazyLock<Regex> = LazyLock::new(|| re(r"-- \[Results\]"));
/// Anything that looks like a problem header.
static BAD_HEADER: LazyLock<Regex> = LazyLock::new(|| re(r"-- \[Problem([^\]])*\]"));
/// A comment line.
static COMMENT: LazyLock<Regex> = LazyLock::new(|| re(r"^--.|^/\*.|^\*/."));
/// Tab characters.
static TABS: LazyLock<Regex> = LazyLock::new(|| re(r"\t+"));
/// A comma not followed by a space.
static COMMA_SPACE: LazyLock<Regex> = LazyLock::new(|| re(r",[^ ][^\n]"));
/// An operator missing a space on one side.
static OPERATOR_SPACE: LazyLock<Regex> = LazyLock::new(|| {
    re(&format!(
        r"(.[-+*<>=]{S})|(.(==|<=|>=|<>){S})|({S}[-+*<>=].)|({S}(==|<=|>=|<>).)"
    ))
});
/// `COUNT(*)`-style stars, which are not multiplication.
static COUNT_STAR: LazyLock<Regex> = LazyLock::new(|| re(r"\(\*\)|\(DISTINCT \*\)"));
/// A double-quoted string.
static DOUBLE_QUOTE: LazyLock<Regex> = LazyLock::new(|| re(r#""([^"])*""#));
/// A single-quoted string literal.
static SINGLE_QUOTED: LazyLock<Regex> = LazyLock::new(|| re(r"'([^']|'')*'"));

/// A kind of style problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleViolation {
    /// A problem header that does not follow `-- [Problem N]`.
    BadHeader,
    /// Tabs used for indentation.
    UsedTabs,
    /// A line longer than [`MAX_LINE_LENGTH`].
    LineTooLong,
    /// Missing space after a comma or around an operator.
    Spacing,
    /// A string in double quotes.
    DoubleQuote,
    /// Code before the first problem header.
    CodeBeforeHeader,
}

impl fmt::Display for StyleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StyleViolation::BadHeader => "Problem headers must look like `-- [Problem N]`",
            StyleViolation::UsedTabs => "Use spaces instead of tabs",
            StyleViolation::LineTooLong => "Lines should be at most 80 characters long",
            StyleViolation::Spacing => "Put spaces after commas and around operators",
            StyleViolation::DoubleQuote => "Use single quotes for strings",
            StyleViolation::CodeBeforeHeader => "Code appears before the first problem header",
        };
        write!(f, "{text}")
    }
}

/// Line scanner that collects style violations.
#[derive(Debug, Clone, Default)]
pub struct StyleChecker {
    /// A problem header has been seen.
    has_header:           bool,
    /// Inside a block comment that started before the first header.
    in_multiline_comment: bool,
    /// Inside a pasted results block.
    in_results:           bool,
}

impl StyleChecker {
    /// Creates a checker positioned at the start of a file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks a whole submission.
    pub fn check(mut self, text: &str) -> BTreeSet<StyleViolation> {
        let mut violations = BTreeSet::new();
        for line in text.lines() {
            self.check_line(line, &mut violations);
        }
        violations
    }

    /// Checks one line, updating the scanner state.
    pub fn check_line(&mut self, line: &str, violations: &mut BTreeSet<StyleViolation>) {
        let stripped = line.trim();
        if stripped.is_empty() {
            return;
        }

        if !self.has_header && HEADER.is_match(line) {
            self.has_header = true;
        }
        if !self.has_header && stripped.starts_with("/*") {
            self.in_multiline_comment = true;
        }

        if RESULT_HEADER.is_match(line) {
            self.in_results = true;
        }
        if self.in_results && HEADER.is_match(line) {
            self.in_results = false;
        }

        let is_bad_header = BAD_HEADER.is_match(line) && !HEADER.is_match(line);
        if is_bad_header {
            violations.insert(StyleViolation::BadHeader);
        }
        if TABS.is_match(line) {
            violations.insert(StyleViolation::UsedTabs);
        }
        if !self.in_results && line.chars().count() > MAX_LINE_LENGTH {
            violations.insert(StyleViolation::LineTooLong);
        }

        if !self.in_multiline_comment && !COMMENT.is_match(line) {
            let code = SINGLE_QUOTED.replace_all(line, "''");
            let bad_operator = OPERATOR_SPACE
                .find_iter(&code)
                .any(|m| !COUNT_STAR.is_match(m.as_str()));
            if COMMA_SPACE.is_match(&code) || bad_operator {
                violations.insert(StyleViolation::Spacing);
            }
            if DOUBLE_QUOTE.is_match(line) {
                violations.insert(StyleViolation::DoubleQuote);
            }
        }

        if !(self.has_header
            || self.in_multiline_comment
            || is_bad_header
            || COMMENT.is_match(stripped))
        {
            violations.insert(StyleViolation::CodeBeforeHeader);
        }

        if stripped.starts_with("*/") || stripped.ends_with("*/") {
            self.in_multiline_comment = false;
        }
    }
}

/// Points taken off per distinct style violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDeductions {
    /// Points per violation kind; kinds not listed cost nothing.
    points: HashMap<StyleViolation, f64>,
}

impl Default for StyleDeductions {
    fn default() -> Self {
        Self {
            points: HashMap::from([
                (StyleViolation::BadHeader, 0.5),
                (StyleViolation::UsedTabs, 0.5),
                (StyleViolation::LineTooLong, 0.5),
                (StyleViolation::Spacing, 0.5),
                (StyleViolation::DoubleQuote, 0.5),
                (StyleViolation::CodeBeforeHeader, 0.5),
            ]),
        }
    }
}

impl StyleDeductions {
    /// Reads a JSON object mapping violation kinds to points. Kinds missing
    /// from the file keep their default points.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read style deductions {}", path.display()))?;
        let overrides: HashMap<StyleViolation, f64> = serde_json::from_str(&text)
            .with_context(|| format!("Could not parse style deductions {}", path.display()))?;

        let mut deductions = Self::default();
        deductions.points.extend(overrides);
        Ok(deductions)
    }

    /// Points for one violation kind.
    pub fn points(&self, violation: StyleViolation) -> f64 {
        self.points.get(&violation).copied().unwrap_or(0.0)
    }

    /// Total points for a set of violations; each kind counts once.
    pub fn total(&self, violations: &BTreeSet<StyleViolation>) -> f64 {
        violations.iter().map(|v| self.points(*v)).sum()
    }
}
