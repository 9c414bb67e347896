//! Validators for caller text spliced into a fixed query template.
//!
//! `vector_search` lets the caller choose a projection and a `WHERE` body.
//! Neither is parsed. The projection is rebuilt from quoted identifiers, and
//! the `WHERE` body is screened for a fixed list of tokens. The surrounding
//! query shape is fixed, and the principal is read-only anyway.

use crate::error::{DbError, DbResult};
use crate::validation::identifier::quote;
use crate::validation::literal::strip_literals;
use regex::Regex;
use std::sync::LazyLock;

/// Maximum length of a `WHERE` fragment, in characters.
pub const MAX_WHERE_LENGTH: usize = 1000;

/// Substrings that may not appear anywhere in a select list (checked upper-cased).
const FORBIDDEN_COLUMN_TOKENS: [&str; 15] = [
    "(",
    ")",
    ";",
    "--",
    "/*",
    "*/",
    "@@",
    "SLEEP",
    "BENCHMARK",
    "LOAD_FILE",
    "INTO",
    "OUTFILE",
    "DUMPFILE",
    "UNION",
    "INFORMATION_SCHEMA",
];

static ALIAS_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\s+AS\s+"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid fragment pattern {pattern:?}: {e}"))
}

/// Tokens rejected in a `WHERE` fragment once its literals are blanked.
static WHERE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r";", ";"),
        (r"--", "--"),
        (r"/\*", "/*"),
        (r"\bUNION\b", "UNION"),
        (r"\bINTO\b", "INTO"),
        (r"\bLOAD_FILE\s*\(", "LOAD_FILE("),
        (r"\bSLEEP\s*\(", "SLEEP("),
        (r"\bBENCHMARK\s*\(", "BENCHMARK("),
        (r"\bGET_LOCK\s*\(", "GET_LOCK("),
        (r"\bRELEASE_LOCK\s*\(", "RELEASE_LOCK("),
        (r"@@", "@@"),
        (r"\bINFORMATION_SCHEMA\b", "INFORMATION_SCHEMA"),
        (r"\bPERFORMANCE_SCHEMA\b", "PERFORMANCE_SCHEMA"),
        (r"\bMYSQL\s*\.", "MYSQL."),
        (r"\bSYS\s*\.", "SYS."),
        (r"\bEXEC\s*\(", "EXEC("),
        (r"\bSHUTDOWN\b", "SHUTDOWN"),
        (r"\b0x[0-9a-f]{10,}", "hex literal"),
    ]
    .into_iter()
    .map(|(pattern, token)| (compile(&format!("(?i){pattern}")), token))
    .collect()
});

/// Quote one `name` or `table.column` reference.
fn quote_column_ref(reference: &str) -> DbResult<String> {
    if reference.matches('.').count() > 1 {
        return Err(DbError::invalid_identifier(
            reference,
            "a column reference is `column` or `table.column`",
        ));
    }
    match reference.split_once('.') {
        Some((table, "*")) => Ok(format!("{}.*", quote(table.trim())?)),
        Some((table, column)) => Ok(format!("{}.{}", quote(table.trim())?, quote(column.trim())?)),
        None => quote(reference),
    }
}

/// Validate a caller-supplied projection and return it fully quoted.
///
/// An empty list means `*`.
///
/// # Examples
///
/// ```
/// use mysql_mcp_server::validation::validate_select_columns;
///
/// assert_eq!(validate_select_columns("").unwrap(), "*");
/// assert_eq!(validate_select_columns("a.b AS c").unwrap(), "`a`.`b` AS `c`");
/// ```
pub fn validate_select_columns(columns: &str) -> DbResult<String> {
    let columns = columns.trim();
    if columns.is_empty() {
        return Ok("*".to_string());
    }

    let upper = columns.to_uppercase();
    if let Some(token) = FORBIDDEN_COLUMN_TOKENS.iter().find(|t| upper.contains(*t)) {
        return Err(DbError::forbidden_token(*token));
    }

    let mut quoted = Vec::new();
    for piece in columns.split(',') {
        let piece = piece.trim();
        if piece == "*" {
            quoted.push("*".to_string());
            continue;
        }

        let mut halves = ALIAS_SEPARATOR.splitn(piece, 2);
        let name = halves.next().unwrap_or_default().trim();
        match halves.next() {
            Some(alias) => quoted.push(format!(
                "{} AS {}",
                quote_column_ref(name)?,
                quote(alias.trim())?
            )),
            None => quoted.push(quote_column_ref(name)?),
        }
    }

    Ok(quoted.join(", "))
}

/// Validate a caller-supplied `WHERE` body. Empty input is accepted.
pub fn validate_where(where_clause: &str) -> DbResult<()> {
    let len = where_clause.chars().count();
    if len > MAX_WHERE_LENGTH {
        return Err(DbError::FragmentTooLong {
            len,
            max: MAX_WHERE_LENGTH,
        });
    }

    if where_clause.trim().is_empty() {
        return Ok(());
    }

    let stripped = strip_literals(where_clause);
    for (regex, token) in WHERE_PATTERNS.iter() {
        if regex.is_match(&stripped) {
            return Err(DbError::forbidden_token(*token));
        }
    }

    let mut depth: i64 = 0;
    for c in stripped.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(DbError::UnbalancedParens);
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(DbError::UnbalancedParens);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Select list
    // =========================================================================

    #[test]
    fn test_columns_star() {
        assert_eq!(validate_select_columns("").unwrap(), "*");
        assert_eq!(validate_select_columns("   ").unwrap(), "*");
        assert_eq!(validate_select_columns("*").unwrap(), "*");
    }

    #[test]
    fn test_columns_quoted() {
        assert_eq!(
            validate_select_columns("id, name").unwrap(),
            "`id`, `name`"
        );
        assert_eq!(
            validate_select_columns("a.b AS c").unwrap(),
            "`a`.`b` AS `c`"
        );
        assert_eq!(
            validate_select_columns("title as t, docs.*").unwrap(),
            "`title` AS `t`, `docs`.*"
        );
    }

    #[test]
    fn test_columns_forbidden_tokens() {
        for input in [
            "count(*)",
            "id; DROP",
            "id -- x",
            "@@version",
            "sleep",
            "id INTO x",
            "information_schema.tables.table_name",
            "a UNION b",
        ] {
            assert!(
                matches!(
                    validate_select_columns(input),
                    Err(DbError::ForbiddenFragmentToken { .. })
                ),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_columns_bad_identifiers() {
        assert!(matches!(
            validate_select_columns("first name"),
            Err(DbError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            validate_select_columns("id,,name"),
            Err(DbError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            validate_select_columns("`id`"),
            Err(DbError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_columns_reject_three_part_names() {
        for input in ["a.b.c", "shop.orders.id AS i", "id, a.b.*"] {
            assert!(
                matches!(
                    validate_select_columns(input),
                    Err(DbError::InvalidIdentifier { .. })
                ),
                "{input:?}"
            );
        }
        assert_eq!(validate_select_columns("o.*").unwrap(), "`o`.*");
    }

    // =========================================================================
    // WHERE fragment
    // =========================================================================

    #[test]
    fn test_where_accepts_plain_conditions() {
        assert!(validate_where("").is_ok());
        assert!(validate_where("category = 'books' AND price < 20").is_ok());
        assert!(validate_where("(a = 1 OR b = 2) AND c IN (1, 2, 3)").is_ok());
        assert!(validate_where("note = 'x; union -- /* y'").is_ok());
        assert!(validate_where("id = 0x1234").is_ok());
    }

    #[test]
    fn test_where_forbidden_tokens() {
        let cases = [
            ("1 = 1; DROP TABLE t", ";"),
            ("1 = 1 -- x", "--"),
            ("id IN (SELECT id FROM t UNION SELECT 1)", "UNION"),
            ("sleep(5) = 0", "SLEEP("),
            ("@@version > 0", "@@"),
            ("id IN (SELECT id FROM mysql.user)", "MYSQL."),
            ("x = 0x41424344454647", "hex literal"),
            ("EXEC (x)", "EXEC("),
        ];
        for (input, token) in cases {
            assert_eq!(
                validate_where(input),
                Err(DbError::forbidden_token(token)),
                "{input:?}"
            );
        }
    }

    #[test]
    fn test_where_unbalanced_parens() {
        assert_eq!(validate_where("(a = 1"), Err(DbError::UnbalancedParens));
        assert_eq!(validate_where("a = 1)"), Err(DbError::UnbalancedParens));
        assert_eq!(validate_where(") a = 1 ("), Err(DbError::UnbalancedParens));
        assert!(validate_where("name = '('").is_ok());
    }

    #[test]
    fn test_where_length_boundary() {
        let ok = format!("a = {}", "1".repeat(MAX_WHERE_LENGTH - 4));
        assert_eq!(ok.chars().count(), MAX_WHERE_LENGTH);
        assert!(validate_where(&ok).is_ok());

        let too_long = format!("{}1", ok);
        assert_eq!(
            validate_where(&too_long),
            Err(DbError::FragmentTooLong {
                len: MAX_WHERE_LENGTH + 1,
                max: MAX_WHERE_LENGTH
            })
        );
    }
}
