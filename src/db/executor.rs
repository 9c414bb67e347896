//! Query execution engine.
//!
//! This module runs already-validated SQL against a pool with:
//! - Row limits (enforced via streaming - only fetches needed rows)
//! - Query timeouts covering the connection lease as well as the fetch
//! - `USE` affinity: a per-call default database is applied on one leased
//!   connection, which is then discarded instead of returned to the pool
//!
//! SQL is sent over the text protocol, which accepts every statement the
//! gate lets through (prepared statements reject some `SHOW` forms and `USE`).

use crate::db::types::{column_names, row_values};
use crate::error::{DbError, DbResult};
use crate::models::{QueryResult, effective_row_limit};
use crate::validation::quote;
use futures_util::{StreamExt, TryStreamExt};
use sqlx::mysql::MySqlRow;
use sqlx::{Executor, MySqlPool};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

/// Query executor that handles database query execution.
#[derive(Debug, Clone, Copy)]
pub struct QueryExecutor {
    query_timeout: Duration,
    default_max_rows: u32,
}

impl QueryExecutor {
    /// Create a new query executor. A zero `default_max_rows` means the crate default.
    pub fn new(query_timeout: Duration, default_max_rows: u32) -> Self {
        Self {
            query_timeout,
            default_max_rows,
        }
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Effective row limit for a request.
    pub fn row_limit(&self, requested: Option<u32>) -> u32 {
        effective_row_limit(requested, self.default_max_rows)
    }

    /// Run one statement and return at most the effective row limit.
    ///
    /// With `database`, the statement runs after `USE <database>` on the same
    /// leased connection.
    pub async fn run_query(
        &self,
        pool: &MySqlPool,
        sql: &str,
        database: Option<&str>,
        max_rows: Option<u32>,
    ) -> DbResult<QueryResult> {
        let start = Instant::now();
        let row_limit = self.row_limit(max_rows);
        let use_stmt = use_statement(database)?;
        let fetch_limit = row_limit as usize + 1;

        debug!(
            limit = row_limit,
            database = ?database,
            timeout_secs = self.query_timeout.as_secs(),
            "Executing query"
        );

        let work = async {
            let mut conn = pool.acquire().await?;
            if let Some(use_stmt) = &use_stmt {
                // The changed default schema must not leak back into the pool
                conn.close_on_drop();
                (&mut *conn).execute(use_stmt.as_str()).await?;
            }
            let rows: Vec<MySqlRow> = (&mut *conn)
                .fetch(sql)
                .take(fetch_limit)
                .try_collect()
                .await?;
            Ok::<_, sqlx::Error>(rows)
        };

        let rows = match timeout(self.query_timeout, work).await {
            Ok(result) => result?,
            Err(_) => return Err(timeout_error("query execution", self.query_timeout)),
        };

        Ok(process_rows(rows, row_limit, start))
    }

    /// Fetch every row of a fixed introspection statement, bounded by the query timeout.
    pub async fn fetch_all(&self, pool: &MySqlPool, sql: &str) -> DbResult<Vec<MySqlRow>> {
        debug!(sql = %sql, "Executing introspection query");
        match timeout(self.query_timeout, pool.fetch_all(sql)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(timeout_error("introspection query", self.query_timeout)),
        }
    }
}

/// `USE` statement for an optional database, quoted.
fn use_statement(database: Option<&str>) -> DbResult<Option<String>> {
    database
        .map(|db| quote(db).map(|quoted| format!("USE {}", quoted)))
        .transpose()
}

/// Turn fetched rows into a QueryResult. `rows` may hold one row past the limit.
fn process_rows(rows: Vec<MySqlRow>, row_limit: u32, start: Instant) -> QueryResult {
    let execution_time_ms = start.elapsed().as_millis() as u64;
    let truncated = rows.len() > row_limit as usize;

    let columns = rows.first().map(column_names).unwrap_or_default();
    let rows = rows
        .iter()
        .take(row_limit as usize)
        .map(row_values)
        .collect();

    if truncated {
        debug!(limit = row_limit, "Query result truncated");
    }

    QueryResult {
        columns,
        rows,
        truncated,
        execution_time_ms,
    }
}

fn timeout_error(operation: &str, timeout: Duration) -> DbError {
    DbError::timeout(operation, timeout.as_secs() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::registry::build_pool;
    use crate::models::{ConnectionConfig, DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT};

    #[test]
    fn test_use_statement() {
        assert_eq!(use_statement(None).unwrap(), None);
        assert_eq!(
            use_statement(Some("shop")).unwrap().as_deref(),
            Some("USE `shop`")
        );
        assert!(matches!(
            use_statement(Some("shop; DROP")),
            Err(DbError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_row_limit() {
        let executor = QueryExecutor::new(Duration::from_secs(30), 0);
        assert_eq!(executor.row_limit(None), DEFAULT_ROW_LIMIT);
        assert_eq!(executor.row_limit(Some(5)), 5);
        assert_eq!(executor.row_limit(Some(0)), 1);
        assert_eq!(executor.row_limit(Some(50_000)), MAX_ROW_LIMIT);

        let executor = QueryExecutor::new(Duration::from_secs(30), 25);
        assert_eq!(executor.row_limit(None), 25);
    }

    #[test]
    fn test_process_rows_empty() {
        let result = process_rows(Vec::new(), 10, Instant::now());
        assert!(result.columns.is_empty());
        assert!(result.rows.is_empty());
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_bad_database_name_rejected_before_io() {
        let config = ConnectionConfig::new("t", "u:p@tcp(127.0.0.1:1)/db");
        let pool = build_pool(&config).unwrap();
        let executor = QueryExecutor::new(Duration::from_secs(1), 0);

        let err = executor
            .run_query(&pool, "SELECT 1", Some("a b"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidIdentifier { .. }));
        pool.close().await;
    }

    #[tokio::test]
    async fn test_unreachable_server_is_bounded() {
        let mut config = ConnectionConfig::new("t", "u:p@tcp(127.0.0.1:1)/db");
        config.pool.ping_timeout_secs = 1;
        let pool = build_pool(&config).unwrap();
        let executor = QueryExecutor::new(Duration::from_secs(1), 0);

        let err = executor
            .run_query(&pool, "SELECT 1", None, None)
            .await
            .unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err:?}");
        pool.close().await;
    }
}
