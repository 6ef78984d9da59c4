#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Lightweight lexical helpers for submitted SQL.
//!
//! Nothing here parses SQL properly. The scanner only understands quotes and
//! comments well enough to find statement boundaries and the leading keyword.

/// Statement kinds a grader may require a submission to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// `SELECT ...` or `WITH ... SELECT ...`.
    Select,
}

impl StatementKind {
    /// Leading keywords accepted for this kind.
    fn keywords(self) -> &'static [&'static str] {
        match self {
            StatementKind::Select => &["SELECT", "WITH"],
        }
    }
}

/// Removes surrounding whitespace and any trailing semicolons.
pub fn strip_terminator(sql: &str) -> &str {
    let mut s = sql.trim();
    while let Some(rest) = s.strip_suffix(';') {
        s = rest.trim_end();
    }
    s
}

/// Splits a script into statements on semicolons that are outside quotes and
/// comments. Empty statements are dropped; comments are kept in place.
pub fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = script.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                current.push(c);
                while let Some(next) = chars.next() {
                    current.push(next);
                    if next == c {
                        // doubled quote is an escaped quote
                        if chars.peek() == Some(&c) {
                            if let Some(escaped) = chars.next() {
                                current.push(escaped);
                            }
                            continue;
                        }
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                current.push(c);
                for next in chars.by_ref() {
                    current.push(next);
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                current.push(c);
                let mut prev = '\0';
                for next in chars.by_ref() {
                    current.push(next);
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            ';' => {
                push_statement(&mut statements, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    push_statement(&mut statements, &current);

    statements
}

/// Pushes `statement` unless it is blank or only comments.
fn push_statement(statements: &mut Vec<String>, statement: &str) {
    if !strip_comments(statement).trim().is_empty() {
        statements.push(statement.trim().to_string());
    }
}

/// Removes `--` and `/* */` comments outside quotes.
pub fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                out.push(c);
                for next in chars.by_ref() {
                    out.push(next);
                    if next == c {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}

/// Returns true if `sql` holds exactly one statement.
pub fn is_single_statement(sql: &str) -> bool {
    split_statements(sql).len() == 1
}

/// Returns the first keyword of the statement, upper-cased.
pub fn leading_keyword(sql: &str) -> Option<String> {
    let stripped = strip_comments(sql);
    let trimmed = stripped.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
    let word: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();

    if word.is_empty() {
        None
    } else {
        Some(word.to_ascii_uppercase())
    }
}

/// Returns true if `sql` is a single statement that starts with one of the
/// keywords allowed for `kind`.
pub fn check_valid_query(sql: &str, kind: StatementKind) -> bool {
    if !is_single_statement(sql) {
        return false;
    }

    leading_keyword(sql).is_some_and(|word| kind.keywords().contains(&word.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_semicolons_are_not_extra_statements() {
        assert!(is_single_statement("SELECT 1;  \n"));
        assert!(is_single_statement("SELECT 1;;"));
        assert!(!is_single_statement("SELECT 1; DROP TABLE t;"));
    }

    #[test]
    fn semicolons_in_literals_and_comments_do_not_split() {
        let script = "SELECT 'a;b' -- trailing; comment\n FROM t; /* x; y */ SELECT 2";
        let statements = split_statements(script);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("'a;b'"));
    }

    #[test]
    fn select_whitelist_accepts_cte_and_rejects_dml() {
        assert!(check_valid_query("  with x as (select 1) select * from x;", StatementKind::Select));
        assert!(check_valid_query("-- note\nSELECT a FROM t", StatementKind::Select));
        assert!(!check_valid_query("DELETE FROM t", StatementKind::Select));
        assert!(!check_valid_query("SELECT 1; DELETE FROM t", StatementKind::Select));
    }

    #[test]
    fn strip_terminator_trims_every_semicolon() {
        assert_eq!(strip_terminator(" SELECT 1 ; ; \n"), "SELECT 1");
    }
}
