//! Vector similarity search.
//!
//! `vector_search` composes a nearest-neighbour query over a MySQL `VECTOR`
//! column. Every piece of caller text that ends up in the statement goes
//! through a validator first: identifiers through the quoter, the select list
//! and `WHERE` body through the fragment validators, and the query vector is
//! rendered from parsed numbers, never from caller text.

use crate::db::{ConnectionRegistry, QueryExecutor};
use crate::error::{DbError, DbResult};
use crate::tools::format::OutputFormat;
use crate::tools::query::{QueryOutput, validate_logged};
use crate::validation::{quote, quote_qualified, validate_select_columns, validate_where};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_VECTOR_LIMIT: u32 = 10;
pub const MAX_VECTOR_LIMIT: u32 = 1000;

/// Name of the synthetic distance column in the result.
pub const DISTANCE_COLUMN: &str = "_distance";

/// Distance metric passed to MySQL's `DISTANCE()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum DistanceFunction {
    #[default]
    #[serde(alias = "cosine")]
    Cosine,
    #[serde(alias = "euclidean")]
    Euclidean,
    #[serde(alias = "dot")]
    Dot,
}

impl fmt::Display for DistanceFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cosine => write!(f, "COSINE"),
            Self::Euclidean => write!(f, "EUCLIDEAN"),
            Self::Dot => write!(f, "DOT"),
        }
    }
}

/// Input for the vector_search tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct VectorSearchInput {
    /// Database containing the table
    pub database: String,
    /// Table to search
    pub table: String,
    /// VECTOR column to compare against
    pub column: String,
    /// Query embedding; must match the column's dimension
    pub query_vector: Vec<f32>,
    /// Number of nearest rows to return. Default: 10, max: 1000
    #[serde(default)]
    pub limit: Option<u32>,
    /// Comma separated columns to return, optionally `col AS alias`. Default: *
    #[serde(default)]
    pub select: Option<String>,
    /// Optional filter, the body of a WHERE clause without the keyword
    #[serde(default, rename = "where")]
    pub where_clause: Option<String>,
    /// COSINE (default), EUCLIDEAN or DOT
    #[serde(default)]
    pub distance_func: DistanceFunction,
    /// Output format: "json", "table" or "markdown"
    #[serde(default)]
    pub format: OutputFormat,
}

/// Clamp a requested result size to `1..=MAX_VECTOR_LIMIT`; absent or zero means the default.
pub fn vector_limit(requested: Option<u32>) -> u32 {
    match requested {
        None | Some(0) => DEFAULT_VECTOR_LIMIT,
        Some(n) => n.min(MAX_VECTOR_LIMIT),
    }
}

/// Render a query vector as the `[a,b,...]` text accepted by `STRING_TO_VECTOR`.
///
/// # Examples
///
/// ```
/// use mysql_mcp_server::tools::vector::vector_literal;
///
/// assert_eq!(vector_literal(&[0.5, -1.0, 2.25]).unwrap(), "[0.5,-1,2.25]");
/// assert!(vector_literal(&[]).is_err());
/// ```
pub fn vector_literal(components: &[f32]) -> DbResult<String> {
    if components.is_empty() {
        return Err(DbError::invalid_input("query_vector must not be empty"));
    }
    if let Some(pos) = components.iter().position(|c| !c.is_finite()) {
        return Err(DbError::invalid_input(format!(
            "query_vector component {} is not a finite number",
            pos
        )));
    }

    let body: Vec<String> = components.iter().map(|c| c.to_string()).collect();
    Ok(format!("[{}]", body.join(",")))
}

/// Compose the nearest-neighbour statement for `input`.
pub fn build_vector_sql(input: &VectorSearchInput) -> DbResult<String> {
    let target = quote_qualified(&input.database, &input.table)?;
    let column = quote(&input.column)?;
    let select = validate_select_columns(input.select.as_deref().unwrap_or_default())?;
    let vector = vector_literal(&input.query_vector)?;
    let limit = vector_limit(input.limit);

    let mut sql = format!(
        "SELECT {}, DISTANCE({}, STRING_TO_VECTOR('{}'), '{}') AS {} FROM {}",
        select, column, vector, input.distance_func, DISTANCE_COLUMN, target
    );

    if let Some(filter) = input.where_clause.as_deref().map(str::trim) {
        validate_where(filter)?;
        if !filter.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
        }
    }

    sql.push_str(&format!(
        " ORDER BY {} ASC LIMIT {}",
        DISTANCE_COLUMN, limit
    ));
    Ok(sql)
}

/// Handler for vector search.
pub struct VectorToolHandler {
    registry: Arc<ConnectionRegistry>,
    executor: QueryExecutor,
}

impl VectorToolHandler {
    pub fn new(registry: Arc<ConnectionRegistry>, executor: QueryExecutor) -> Self {
        Self { registry, executor }
    }

    /// Handle the vector_search tool call.
    pub async fn vector_search(&self, input: VectorSearchInput) -> DbResult<QueryOutput> {
        let sql = build_vector_sql(&input)?;
        // The composed statement passes the same gate as caller SQL.
        validate_logged(&sql)?;

        let (pool, connection) = self.registry.active().await?;
        let limit = vector_limit(input.limit);
        let result = self
            .executor
            .run_query(&pool, &sql, None, Some(limit))
            .await?;

        info!(
            connection = %connection,
            table = %input.table,
            distance = %input.distance_func,
            row_count = result.row_count(),
            elapsed_ms = result.execution_time_ms,
            "Vector search executed"
        );

        Ok(QueryOutput::from_result(
            connection,
            result,
            input.format,
            None,
        ))
    }
}
