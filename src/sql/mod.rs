//! Surface-syntax SQL classification.
//!
//! Everything in this module works on statement *text* only. Splitting is a
//! plain `;` split and read-only detection is a `select` prefix check; string
//! literals, comments, and procedure bodies are not understood. The gateway
//! relies on this as a bounded first line of defense, never as a full parser.

/// Splits a SQL script into trimmed, non-empty statements on `;`.
///
/// A semicolon inside a quoted string will incorrectly split the statement.
#[must_use]
pub fn split_statements(script: &str) -> Vec<String> {
    script
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Returns true if the trimmed statement starts with `select`, case-insensitive.
#[must_use]
pub fn is_select(statement: &str) -> bool {
    let trimmed = statement.trim_start();
    let Some(head) = trimmed.get(..6) else {
        return false;
    };
    if !head.eq_ignore_ascii_case("select") {
        return false;
    }
    // "selection" is not a select statement; require a boundary after the keyword.
    trimmed
        .as_bytes()
        .get(6)
        .is_none_or(|b| !b.is_ascii_alphanumeric() && *b != b'_')
}

/// Returns true only if the script splits into at least one statement and
/// every statement passes [`is_select`]. An empty script is not read-only.
///
/// This is a prefix check, not semantic analysis: `select ... into outfile`
/// passes, a select hidden behind a leading comment fails.
#[must_use]
pub fn is_read_only(script: &str) -> bool {
    let statements = split_statements(script);
    if statements.is_empty() {
        return false;
    }
    statements.iter().all(|s| is_select(s))
}

/// Appends ` LIMIT <cap>` unless the statement already contains the token
/// `limit` anywhere, case-insensitive.
///
/// The containment check is textual: a `limit` inside a subquery or even a
/// column name suppresses the append.
#[must_use]
pub fn ensure_row_limit(statement: &str, cap: u32) -> String {
    if statement.to_ascii_lowercase().contains("limit") {
        return statement.to_string();
    }
    format!("{statement} LIMIT {cap}")
}
