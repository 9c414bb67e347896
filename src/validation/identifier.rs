//! Identifier quoting.
//!
//! Introspection statements such as `SHOW FULL COLUMNS FROM db.table` cannot
//! take bound parameters in the object-name positions, so caller-supplied names
//! have to be spliced into the SQL text. [`quote`] is the only path by which
//! that happens anywhere in the crate.

use crate::error::{DbError, DbResult};

/// MySQL's limit on identifier length.
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Characters that may never appear in a caller-supplied identifier.
const FORBIDDEN_CHARS: [(char, &str); 7] = [
    (' ', "space"),
    ('\t', "tab"),
    ('\n', "line feed"),
    ('\r', "carriage return"),
    (';', "semicolon"),
    ('`', "backtick"),
    ('\\', "backslash"),
];

/// Check that `name` is an acceptable identifier without quoting it.
pub fn validate_identifier(name: &str) -> DbResult<()> {
    if name.is_empty() {
        return Err(DbError::invalid_identifier(name, "identifier cannot be empty"));
    }

    let len = name.chars().count();
    if len > MAX_IDENTIFIER_LENGTH {
        return Err(DbError::invalid_identifier(
            name,
            format!(
                "identifier exceeds maximum length of {} characters (got {})",
                MAX_IDENTIFIER_LENGTH, len
            ),
        ));
    }

    if let Some((_, label)) = FORBIDDEN_CHARS.iter().find(|(c, _)| name.contains(*c)) {
        return Err(DbError::invalid_identifier(
            name,
            format!("identifier contains a forbidden character ({})", label),
        ));
    }

    Ok(())
}

/// Quote an identifier for interpolation into MySQL SQL text.
///
/// # Examples
///
/// ```
/// use mysql_mcp_server::validation::quote;
///
/// assert_eq!(quote("users").unwrap(), "`users`");
/// assert!(quote("user table").is_err());
/// ```
pub fn quote(name: &str) -> DbResult<String> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name))
}

/// Quote a `database.table` pair, each side independently.
pub fn quote_qualified(database: &str, table: &str) -> DbResult<String> {
    Ok(format!("{}.{}", quote(database)?, quote(table)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_simple() {
        assert_eq!(quote("users").unwrap(), "`users`");
        assert_eq!(quote("order_items_2024").unwrap(), "`order_items_2024`");
        assert_eq!(quote("Ünïcödé").unwrap(), "`Ünïcödé`");
    }

    #[test]
    fn test_quote_rejects_empty() {
        assert!(matches!(
            quote(""),
            Err(DbError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_quote_length_boundary() {
        let ok = "a".repeat(MAX_IDENTIFIER_LENGTH);
        assert_eq!(quote(&ok).unwrap(), format!("`{}`", ok));

        let too_long = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        assert!(matches!(
            quote(&too_long),
            Err(DbError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_quote_length_counts_characters() {
        // 64 two-byte characters is still 64 characters.
        let name = "é".repeat(MAX_IDENTIFIER_LENGTH);
        assert!(quote(&name).is_ok());
    }

    #[test]
    fn test_quote_rejects_each_forbidden_char() {
        for c in [' ', '\t', '\n', '\r', ';', '`', '\\'] {
            let name = format!("a{}b", c);
            assert!(
                matches!(quote(&name), Err(DbError::InvalidIdentifier { .. })),
                "{:?} should be rejected",
                c
            );
        }
    }

    #[test]
    fn test_quote_allows_dots_and_dashes() {
        // The quoter does not split; callers quote each part separately.
        assert_eq!(quote("my-db").unwrap(), "`my-db`");
    }

    #[test]
    fn test_quote_qualified() {
        assert_eq!(quote_qualified("shop", "orders").unwrap(), "`shop`.`orders`");
        assert!(quote_qualified("shop", "bad;name").is_err());
        assert!(quote_qualified("", "orders").is_err());
    }
}
