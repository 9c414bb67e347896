//! Error types for the MySQL MCP Server.
//!
//! Every failure the server can report is a variant of [`DbError`]. Validator
//! verdicts are ordinary variants too, so a rejected statement travels through
//! the same `?` chain as a dropped connection and reaches the caller with the
//! reason (and, where there is one, the offending token) intact.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbError {
    // ------------------------------------------------------------------
    // SQL gate rejections
    // ------------------------------------------------------------------
    #[error("Rejected: empty input")]
    EmptyInput,

    #[error("Rejected: invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    #[error("Rejected: multiple statements are not allowed")]
    MultiStatement,

    #[error("Rejected: failed to parse: {detail}")]
    ParseFailure { detail: String },

    #[error("Rejected: {kind} statements are not allowed (read-only)")]
    DisallowedStatementKind { kind: String },

    #[error("Rejected: dangerous function: {function}")]
    DangerousFunction { function: String },

    #[error("Rejected: forbidden schema: {schema}")]
    ForbiddenSchema { schema: String },

    #[error("Rejected: {reason} ({pattern})")]
    BlockedPattern { reason: String, pattern: String },

    #[error("Rejected: unbalanced parentheses")]
    UnbalancedParens,

    #[error("Rejected: fragment too long ({len} > {max} characters)")]
    FragmentTooLong { len: usize, max: usize },

    #[error("Rejected: forbidden token in fragment: {token}")]
    ForbiddenFragmentToken { token: String },

    // ------------------------------------------------------------------
    // Registry and driver failures
    // ------------------------------------------------------------------
    #[error("Unknown connection: {name}")]
    UnknownConnection { name: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u32,
    },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42S02" for unknown table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create an invalid identifier error.
    pub fn invalid_identifier(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse failure error.
    pub fn parse_failure(detail: impl Into<String>) -> Self {
        Self::ParseFailure {
            detail: detail.into(),
        }
    }

    /// Create a disallowed statement kind error.
    pub fn disallowed_kind(kind: impl Into<String>) -> Self {
        Self::DisallowedStatementKind { kind: kind.into() }
    }

    /// Create a dangerous function error.
    pub fn dangerous_function(function: impl Into<String>) -> Self {
        Self::DangerousFunction {
            function: function.into(),
        }
    }

    /// Create a forbidden schema error.
    pub fn forbidden_schema(schema: impl Into<String>) -> Self {
        Self::ForbiddenSchema {
            schema: schema.into(),
        }
    }

    /// Create a blocked pattern error.
    pub fn blocked_pattern(reason: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::BlockedPattern {
            reason: reason.into(),
            pattern: pattern.into(),
        }
    }

    /// Create a forbidden fragment token error.
    pub fn forbidden_token(token: impl Into<String>) -> Self {
        Self::ForbiddenFragmentToken {
            token: token.into(),
        }
    }

    /// Create an unknown connection error.
    pub fn unknown_connection(name: impl Into<String>) -> Self {
        Self::UnknownConnection { name: name.into() }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u32) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for verdicts of the SQL gate (as opposed to runtime failures).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput
                | Self::InvalidIdentifier { .. }
                | Self::MultiStatement
                | Self::ParseFailure { .. }
                | Self::DisallowedStatementKind { .. }
                | Self::DangerousFunction { .. }
                | Self::ForbiddenSchema { .. }
                | Self::BlockedPattern { .. }
                | Self::UnbalancedParens
                | Self::FragmentTooLong { .. }
                | Self::ForbiddenFragmentToken { .. }
        )
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::UnknownConnection { .. } => {
                Some("Call list_connections to see the configured connection names")
            }
            Self::Timeout { .. } => {
                Some("Consider increasing the timeout or narrowing the query")
            }
            _ if self.is_rejection() => Some(
                "Only single read-only statements (SELECT, SHOW, DESCRIBE, EXPLAIN) are accepted",
            ),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the DSN format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => DbError::timeout("connection pool acquire", 30),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and MySQL server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify the --ssl mode and the server certificate",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check MySQL server compatibility",
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
/// Includes the suggestion field in the `data` object when available.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        let data = suggestion_data(err.suggestion());
        match &err {
            // Gate rejections and malformed arguments -> invalid_params
            _ if err.is_rejection() => rmcp::ErrorData::invalid_params(err.to_string(), data),
            DbError::InvalidInput { .. } => rmcp::ErrorData::invalid_params(err.to_string(), data),

            DbError::UnknownConnection { .. } => {
                rmcp::ErrorData::resource_not_found(err.to_string(), data)
            }

            // Database errors -> invalid_params with sql_state in message
            DbError::Database {
                message, sql_state, ..
            } => {
                let msg = match sql_state {
                    Some(code) => format!("{} (SQLSTATE: {})", message, code),
                    None => message.clone(),
                };
                rmcp::ErrorData::invalid_params(msg, data)
            }

            // Connection, Timeout, Internal -> internal_error
            _ => rmcp::ErrorData::internal_error(err.to_string(), data),
        }
    }
}
