//! Query execution tools.
//!
//! This module implements the `run_query` and `explain_query` MCP tools. Both
//! pass the caller's SQL through the combined validator before anything is
//! sent to MySQL; a rejection is logged and returned without touching the
//! connection.

use crate::db::{ConnectionRegistry, QueryExecutor};
use crate::error::{DbError, DbResult};
use crate::models::{MAX_ROW_LIMIT, QueryResult};
use crate::tools::format::{OutputFormat, format_as_markdown, format_as_table};
use crate::tools::{non_blank, truncate_for_log};
use crate::validation::{StatementKind, validate_combined};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{info, warn};

/// Maximum characters of rejected SQL echoed into the log.
const LOG_SQL_MAX_CHARS: usize = 200;

/// Input for the run_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RunQueryInput {
    /// A single read-only statement: SELECT, SHOW, DESCRIBE or EXPLAIN.
    pub sql: String,
    /// Default database for this statement only (runs `USE` first on the same connection).
    #[serde(default)]
    pub database: Option<String>,
    /// Maximum rows to return. Default: 1000, max: 10000
    #[serde(default)]
    pub max_rows: Option<u32>,
    /// Output format: "json" returns structured rows, "table" an ASCII table, "markdown" a markdown table
    #[serde(default)]
    pub format: OutputFormat,
}

/// Input for the explain_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExplainQueryInput {
    /// The SELECT statement to explain (without the EXPLAIN keyword).
    pub sql: String,
    /// Default database for the statement.
    #[serde(default)]
    pub database: Option<String>,
    /// Output format: "json", "table" or "markdown"
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output from run_query and explain_query.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct QueryOutput {
    /// Connection the statement ran on
    pub connection: String,
    /// Column names in order. Empty if format is table/markdown.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    /// One array of values per row, in column order. Empty if format is table/markdown.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Vec<JsonValue>>,
    /// Pre-formatted output when format is table or markdown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    /// True if more rows were available than max_rows allowed
    pub truncated: bool,
    /// Number of rows returned
    pub row_count: usize,
    /// Query execution time in milliseconds
    pub execution_time_ms: u64,
    /// Warning message if any issues occurred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl QueryOutput {
    /// Create output from a query result with the specified format.
    pub fn from_result(
        connection: String,
        result: QueryResult,
        format: OutputFormat,
        warning: Option<String>,
    ) -> Self {
        let row_count = result.row_count();
        let truncated = result.truncated;
        let execution_time_ms = result.execution_time_ms;

        let (columns, rows, formatted) = match format {
            OutputFormat::Json => (result.columns, result.rows, None),
            OutputFormat::Table => (
                Vec::new(),
                Vec::new(),
                Some(format_as_table(
                    &result.columns,
                    &result.rows,
                    truncated,
                    execution_time_ms,
                )),
            ),
            OutputFormat::Markdown => (
                Vec::new(),
                Vec::new(),
                Some(format_as_markdown(&result.columns, &result.rows, truncated)),
            ),
        };

        Self {
            connection,
            columns,
            rows,
            formatted,
            truncated,
            row_count,
            execution_time_ms,
            warning,
        }
    }
}

/// Run the combined validator, logging any rejection with a truncated SQL echo.
pub fn validate_logged(sql: &str) -> DbResult<StatementKind> {
    validate_combined(sql).inspect_err(|err| {
        warn!(
            reason = %err,
            sql = %truncate_for_log(sql, LOG_SQL_MAX_CHARS),
            "Rejected SQL"
        );
    })
}

/// Warning for a max_rows request above the cap.
fn limit_warning(requested: Option<u32>) -> Option<String> {
    requested.filter(|r| *r > MAX_ROW_LIMIT).map(|r| {
        format!(
            "Requested max_rows {} exceeds maximum allowed ({}). Results capped to {} rows.",
            r, MAX_ROW_LIMIT, MAX_ROW_LIMIT
        )
    })
}

/// Handler for query execution.
pub struct QueryToolHandler {
    registry: Arc<ConnectionRegistry>,
    executor: QueryExecutor,
}

impl QueryToolHandler {
    /// Create a new query tool handler.
    pub fn new(registry: Arc<ConnectionRegistry>, executor: QueryExecutor) -> Self {
        Self { registry, executor }
    }

    /// Handle the run_query tool call.
    pub async fn run_query(&self, input: RunQueryInput) -> DbResult<QueryOutput> {
        let kind = validate_logged(&input.sql)?;
        let database = non_blank(input.database);
        let (pool, connection) = self.registry.active().await?;

        let result = self
            .executor
            .run_query(&pool, &input.sql, database.as_deref(), input.max_rows)
            .await?;

        info!(
            connection = %connection,
            kind = %kind,
            row_count = result.row_count(),
            truncated = result.truncated,
            elapsed_ms = result.execution_time_ms,
            "Query executed"
        );

        Ok(QueryOutput::from_result(
            connection,
            result,
            input.format,
            limit_warning(input.max_rows),
        ))
    }

    /// Handle the explain_query tool call.
    ///
    /// Only query statements can be explained; `EXPLAIN ANALYZE` is never
    /// issued because it executes the statement.
    pub async fn explain_query(&self, input: ExplainQueryInput) -> DbResult<QueryOutput> {
        let kind = validate_logged(&input.sql)?;
        if !matches!(
            kind,
            StatementKind::Select | StatementKind::Union | StatementKind::ParenSelect
        ) {
            return Err(DbError::invalid_input(format!(
                "explain_query expects a SELECT statement, got {}",
                kind
            )));
        }

        let database = non_blank(input.database);
        let (pool, connection) = self.registry.active().await?;
        let sql = format!("EXPLAIN {}", input.sql.trim());

        let result = self
            .executor
            .run_query(&pool, &sql, database.as_deref(), None)
            .await?;

        info!(
            connection = %connection,
            row_count = result.row_count(),
            "Query explained"
        );

        Ok(QueryOutput::from_result(
            connection,
            result,
            input.format,
            None,
        ))
    }
}
