//! Pattern-based validation of raw SQL text.
//!
//! This is the second layer of the gate. The parser-based check in
//! [`super::parser`] sees structure; this one sees text, which is where
//! smuggling tricks live: file I/O clauses, timing amplifiers and comment
//! markers that a permissive parser might drop on the floor.
//!
//! Anchored patterns (statement keywords) are matched against the original
//! text. Unanchored ones run on a copy with every literal blanked out by
//! [`strip_literals`], so `WHERE note = 'x; --y'` does not trip them.

use crate::error::{DbError, DbResult};
use crate::validation::literal::strip_literals;
use regex::Regex;
use std::sync::LazyLock;

/// Statement prefixes the lexical layer accepts.
pub const READ_ONLY_PREFIXES: [&str; 5] = ["SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN"];

mod reasons {
    pub const FILE_IO: &str = "file access is not allowed";
    pub const DDL: &str = "schema modification is not allowed";
    pub const DML: &str = "data modification is not allowed";
    pub const ADMIN: &str = "administrative statements are not allowed";
    pub const LOCKING: &str = "table locking is not allowed";
    pub const TRANSACTION: &str = "transaction control is not allowed";
    pub const PREPARED: &str = "prepared statements are not allowed";
    pub const PROCEDURE: &str = "stored procedure calls are not allowed";
    pub const DANGEROUS_FUNCTION: &str = "dangerous function call is not allowed";
    pub const COMMENT: &str = "SQL comments are not allowed";
    pub const NOT_READ_ONLY: &str =
        "statement must begin with SELECT, SHOW, DESCRIBE, DESC or EXPLAIN";
}

/// One entry of the blocked-pattern table.
struct LexicalPattern {
    regex: Regex,
    /// Anchored patterns run on the original text, the rest on the stripped copy.
    anchored: bool,
    reason: &'static str,
    label: &'static str,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid lexical pattern {pattern:?}: {e}"))
}

fn anchored(keyword: &str, reason: &'static str, label: &'static str) -> LexicalPattern {
    LexicalPattern {
        regex: compile(&format!(r"(?i)^\s*{keyword}\b")),
        anchored: true,
        reason,
        label,
    }
}

fn anywhere(pattern: &str, reason: &'static str, label: &'static str) -> LexicalPattern {
    LexicalPattern {
        regex: compile(&format!("(?i){pattern}")),
        anchored: false,
        reason,
        label,
    }
}

/// Ordered table of blocked patterns. The first match decides the reason.
static PATTERNS: LazyLock<Vec<LexicalPattern>> = LazyLock::new(|| {
    use reasons::*;
    vec![
        anywhere(r"\bLOAD_FILE\s*\(", FILE_IO, "LOAD_FILE("),
        anywhere(r"\bINTO\s+OUTFILE\b", FILE_IO, "INTO OUTFILE"),
        anywhere(r"\bINTO\s+DUMPFILE\b", FILE_IO, "INTO DUMPFILE"),
        anywhere(r"\bLOAD\s+DATA\b", FILE_IO, "LOAD DATA"),
        anchored("CREATE", DDL, "CREATE"),
        anchored("ALTER", DDL, "ALTER"),
        anchored("DROP", DDL, "DROP"),
        anchored("TRUNCATE", DDL, "TRUNCATE"),
        anchored("RENAME", DDL, "RENAME"),
        anchored("INSERT", DML, "INSERT"),
        anchored("UPDATE", DML, "UPDATE"),
        anchored("DELETE", DML, "DELETE"),
        anchored("REPLACE", DML, "REPLACE"),
        anchored("GRANT", ADMIN, "GRANT"),
        anchored("REVOKE", ADMIN, "REVOKE"),
        LexicalPattern {
            regex: compile(r"(?i)^\s*SET\s+(?:GLOBAL\b|SESSION\b|@@)"),
            anchored: true,
            reason: ADMIN,
            label: "SET GLOBAL|SESSION|@@",
        },
        anchored("FLUSH", ADMIN, "FLUSH"),
        anchored("RESET", ADMIN, "RESET"),
        anchored("KILL", ADMIN, "KILL"),
        anchored("SHUTDOWN", ADMIN, "SHUTDOWN"),
        anchored(r"LOCK\s+TABLES?", LOCKING, "LOCK TABLES"),
        anchored(r"UNLOCK\s+TABLES?", LOCKING, "UNLOCK TABLES"),
        anchored(r"START\s+TRANSACTION", TRANSACTION, "START TRANSACTION"),
        anchored("BEGIN", TRANSACTION, "BEGIN"),
        anchored("COMMIT", TRANSACTION, "COMMIT"),
        anchored("ROLLBACK", TRANSACTION, "ROLLBACK"),
        anchored("SAVEPOINT", TRANSACTION, "SAVEPOINT"),
        anchored("PREPARE", PREPARED, "PREPARE"),
        anchored("EXECUTE", PREPARED, "EXECUTE"),
        anchored("DEALLOCATE", PREPARED, "DEALLOCATE"),
        anchored("CALL", PROCEDURE, "CALL"),
        anywhere(r"\bSLEEP\s*\(", DANGEROUS_FUNCTION, "SLEEP("),
        anywhere(r"\bBENCHMARK\s*\(", DANGEROUS_FUNCTION, "BENCHMARK("),
        anywhere(r"\bGET_LOCK\s*\(", DANGEROUS_FUNCTION, "GET_LOCK("),
        anywhere(r"\bRELEASE_LOCK\s*\(", DANGEROUS_FUNCTION, "RELEASE_LOCK("),
        anywhere(r"\bIS_FREE_LOCK\s*\(", DANGEROUS_FUNCTION, "IS_FREE_LOCK("),
        anywhere(r"\bIS_USED_LOCK\s*\(", DANGEROUS_FUNCTION, "IS_USED_LOCK("),
        anywhere("--", COMMENT, "--"),
        anywhere(r"/\*", COMMENT, "/*"),
        // MySQL also treats `#` as a line comment.
        anywhere("#", COMMENT, "#"),
    ]
});

/// Reject SQL text that contains more than one statement once literals are
/// blanked. A single trailing semicolon is allowed.
fn check_single_statement(stripped: &str) -> DbResult<()> {
    let body = stripped.trim_end();
    let body = body.strip_suffix(';').unwrap_or(body);
    if body.contains(';') {
        return Err(DbError::MultiStatement);
    }
    Ok(())
}

/// Validate raw SQL text against the blocked-pattern table.
///
/// Returns `Ok(())` only for a single statement that matches none of the
/// blocked patterns and begins with one of [`READ_ONLY_PREFIXES`].
///
/// # Examples
///
/// ```
/// use mysql_mcp_server::validation::validate_sql;
///
/// assert!(validate_sql("SELECT name FROM users WHERE note = 'a -- b'").is_ok());
/// assert!(validate_sql("SELECT * FROM users INTO OUTFILE '/tmp/x'").is_err());
/// ```
pub fn validate_sql(sql: &str) -> DbResult<()> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(DbError::EmptyInput);
    }

    let stripped = strip_literals(sql);
    check_single_statement(&stripped)?;

    for pattern in PATTERNS.iter() {
        let haystack = if pattern.anchored { sql } else { stripped.as_str() };
        if pattern.regex.is_match(haystack) {
            return Err(DbError::blocked_pattern(pattern.reason, pattern.label));
        }
    }

    let upper = sql.to_uppercase();
    if !READ_ONLY_PREFIXES.iter().any(|p| upper.starts_with(p)) {
        let first_word = sql.split_whitespace().next().unwrap_or_default();
        return Err(DbError::blocked_pattern(reasons::NOT_READ_ONLY, first_word));
    }

    Ok(())
}
