//! Schema introspection.
//!
//! Every statement here is a fixed `SHOW` template whose only variable parts
//! are identifiers produced by [`quote`]/[`quote_qualified`]. Caller text is
//! never interpolated anywhere else.

use crate::db::executor::QueryExecutor;
use crate::error::{DbError, DbResult};
use crate::models::{
    ColumnDefinition, IndexColumnRow, IndexInfo, TableInfo, TableType, group_index_rows,
};
use crate::validation::{quote, quote_qualified};
use sqlx::mysql::MySqlRow;
use sqlx::{ColumnIndex, MySqlPool, Row};
use tracing::debug;

// =============================================================================
// SQL Query Templates
// =============================================================================

pub mod queries {
    use super::*;

    pub const LIST_DATABASES: &str = "SHOW DATABASES";

    pub fn table_status(database: &str) -> DbResult<String> {
        Ok(format!("SHOW TABLE STATUS FROM {}", quote(database)?))
    }

    pub fn full_columns(database: &str, table: &str) -> DbResult<String> {
        Ok(format!(
            "SHOW FULL COLUMNS FROM {}",
            quote_qualified(database, table)?
        ))
    }

    pub fn indexes(database: &str, table: &str) -> DbResult<String> {
        Ok(format!("SHOW INDEX FROM {}", quote_qualified(database, table)?))
    }

    pub fn create_table(database: &str, table: &str) -> DbResult<String> {
        Ok(format!(
            "SHOW CREATE TABLE {}",
            quote_qualified(database, table)?
        ))
    }
}

// =============================================================================
// Row Helpers
// =============================================================================

/// Safely get an optional string from a MySQL row.
/// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
fn get_optional_string<I>(row: &MySqlRow, column: I) -> Option<String>
where
    I: ColumnIndex<MySqlRow> + Copy,
{
    row.try_get::<Option<String>, _>(column)
        .ok()
        .flatten()
        .or_else(|| {
            row.try_get::<Option<Vec<u8>>, _>(column)
                .ok()
                .flatten()
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        })
}

fn get_string<I: ColumnIndex<MySqlRow> + Copy>(row: &MySqlRow, column: I) -> String {
    get_optional_string(row, column).unwrap_or_default()
}

/// Non-empty string or `None`.
fn get_non_empty<I: ColumnIndex<MySqlRow> + Copy>(row: &MySqlRow, column: I) -> Option<String> {
    get_optional_string(row, column).filter(|s| !s.is_empty())
}

/// Try to get a u64 value from a row, handling MySQL version differences.
/// MySQL 5.x may return BIGINT (i64), MySQL 8.x returns BIGINT UNSIGNED (u64).
fn get_u64(row: &MySqlRow, column: &str) -> Option<u64> {
    if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(column) {
        return Some(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(column) {
        return u64::try_from(v).ok();
    }
    get_optional_string(row, column).and_then(|s| s.trim().parse().ok())
}

// =============================================================================
// Inspector
// =============================================================================

/// Schema inspector for MySQL introspection.
#[derive(Debug, Clone, Copy)]
pub struct SchemaInspector {
    executor: QueryExecutor,
}

impl SchemaInspector {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// Names of all databases visible to the principal.
    pub async fn list_databases(&self, pool: &MySqlPool) -> DbResult<Vec<String>> {
        let rows = self
            .executor
            .fetch_all(pool, queries::LIST_DATABASES)
            .await?;

        // SHOW DATABASES returns a single column "Database"
        let databases: Vec<String> = rows.iter().filter_map(|row| get_non_empty(row, 0)).collect();

        debug!(count = databases.len(), "Listed databases");
        Ok(databases)
    }

    /// Tables and views of `database`, from `SHOW TABLE STATUS`.
    pub async fn list_tables(&self, pool: &MySqlPool, database: &str) -> DbResult<Vec<TableInfo>> {
        let sql = queries::table_status(database)?;
        let rows = self.executor.fetch_all(pool, &sql).await?;

        let tables: Vec<TableInfo> = rows.iter().filter_map(table_from_status_row).collect();

        debug!(database = %database, count = tables.len(), "Listed tables");
        Ok(tables)
    }

    /// Column definitions of `database.table`, from `SHOW FULL COLUMNS`.
    pub async fn describe_table(
        &self,
        pool: &MySqlPool,
        database: &str,
        table: &str,
    ) -> DbResult<Vec<ColumnDefinition>> {
        let sql = queries::full_columns(database, table)?;
        let rows = self.executor.fetch_all(pool, &sql).await?;

        let columns: Vec<ColumnDefinition> = rows.iter().map(column_from_row).collect();
        if columns.is_empty() {
            return Err(DbError::database(
                format!("Table '{}.{}' not found", database, table),
                None,
                "Call list_tables to see the tables of the database",
            ));
        }

        Ok(columns)
    }

    /// Indexes of `database.table`, from `SHOW INDEX`.
    pub async fn list_indexes(
        &self,
        pool: &MySqlPool,
        database: &str,
        table: &str,
    ) -> DbResult<Vec<IndexInfo>> {
        let sql = queries::indexes(database, table)?;
        let rows = self.executor.fetch_all(pool, &sql).await?;

        let parts = rows
            .iter()
            .map(|row| IndexColumnRow {
                index_name: get_string(row, "Key_name"),
                seq_in_index: get_u64(row, "Seq_in_index")
                    .and_then(|v| u32::try_from(v).ok())
                    .unwrap_or(0),
                column_name: get_non_empty(row, "Column_name"),
                non_unique: get_u64(row, "Non_unique").unwrap_or(1) != 0,
                index_type: get_non_empty(row, "Index_type"),
            })
            .collect();

        Ok(group_index_rows(parts))
    }

    /// The `CREATE TABLE` (or `CREATE VIEW`) statement of `database.table`.
    pub async fn show_create_table(
        &self,
        pool: &MySqlPool,
        database: &str,
        table: &str,
    ) -> DbResult<String> {
        let sql = queries::create_table(database, table)?;
        let rows = self.executor.fetch_all(pool, &sql).await?;

        // Column 0 is the name; column 1 is "Create Table" or "Create View"
        rows.first()
            .and_then(|row| get_non_empty(row, 1))
            .ok_or_else(|| {
                DbError::database(
                    format!("No definition returned for '{}.{}'", database, table),
                    None,
                    "Check that the table exists and the principal may see it",
                )
            })
    }
}

fn table_from_status_row(row: &MySqlRow) -> Option<TableInfo> {
    let name = get_non_empty(row, "Name")?;
    let engine = get_non_empty(row, "Engine");
    let comment = get_non_empty(row, "Comment");
    let table_type = TableType::from_status(engine.as_deref(), comment.as_deref());

    let mut table = TableInfo::new(name, table_type);
    if table_type == TableType::View {
        return Some(table);
    }

    if let Some(engine) = engine {
        table = table.with_engine(engine);
    }
    if let Some(count) = get_u64(row, "Rows") {
        table = table.with_row_count(count);
    }
    table = table.with_sizes(get_u64(row, "Data_length"), get_u64(row, "Index_length"));
    if let Some(collation) = get_non_empty(row, "Collation") {
        table = table.with_collation(collation);
    }
    if let Some(comment) = comment {
        table = table.with_comment(comment);
    }
    Some(table)
}

fn column_from_row(row: &MySqlRow) -> ColumnDefinition {
    let mut column = ColumnDefinition::new(
        get_string(row, "Field"),
        get_string(row, "Type"),
        get_string(row, "Null").eq_ignore_ascii_case("YES"),
    );
    column.key = get_string(row, "Key");
    column.default_value = get_optional_string(row, "Default");
    column.extra = get_non_empty(row, "Extra");
    column.collation = get_non_empty(row, "Collation");
    column.comment = get_non_empty(row, "Comment");
    column
}
