//! Schema introspection tools.
//!
//! This module implements `list_databases`, `list_tables`, `describe_table`,
//! `list_indexes` and `show_create_table`. Database and table names reach SQL
//! only through the identifier quoter.

use crate::db::{ConnectionRegistry, SchemaInspector};
use crate::error::DbResult;
use crate::models::{ColumnDefinition, IndexInfo, TableInfo, TableType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Input for the list_tables tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListTablesInput {
    /// Database name (see list_databases)
    pub database: String,
    /// Include views in the result. Default: true
    #[serde(default = "default_true")]
    pub include_views: bool,
}

/// Input naming one table, shared by describe_table, list_indexes and show_create_table.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TableRefInput {
    /// Database name
    pub database: String,
    /// Table name (see list_tables)
    pub table: String,
}

/// Input for the describe_table tool.
pub type DescribeTableInput = TableRefInput;

fn default_true() -> bool {
    true
}

/// Output for the list_databases tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListDatabasesOutput {
    pub connection: String,
    pub databases: Vec<String>,
    pub count: usize,
}

/// Output from the list_tables tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListTablesOutput {
    pub connection: String,
    pub database: String,
    /// Tables and views with metadata from SHOW TABLE STATUS
    pub tables: Vec<TableInfo>,
    /// Total number of tables/views returned
    pub count: usize,
}

/// Output from the describe_table tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DescribeTableOutput {
    pub connection: String,
    pub database: String,
    pub table: String,
    pub columns: Vec<ColumnDefinition>,
    /// Primary key column names in table order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub primary_key: Vec<String>,
}

/// Output from the list_indexes tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListIndexesOutput {
    pub connection: String,
    pub database: String,
    pub table: String,
    pub indexes: Vec<IndexInfo>,
    pub count: usize,
}

/// Output from the show_create_table tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ShowCreateTableOutput {
    pub connection: String,
    pub database: String,
    pub table: String,
    /// The CREATE TABLE (or CREATE VIEW) statement
    pub create_statement: String,
}

/// Handler for schema tools.
pub struct SchemaToolHandler {
    registry: Arc<ConnectionRegistry>,
    inspector: SchemaInspector,
}

impl SchemaToolHandler {
    pub fn new(registry: Arc<ConnectionRegistry>, inspector: SchemaInspector) -> Self {
        Self {
            registry,
            inspector,
        }
    }

    /// Handle the list_databases tool call.
    pub async fn list_databases(&self) -> DbResult<ListDatabasesOutput> {
        let (pool, connection) = self.registry.active().await?;
        let databases = self.inspector.list_databases(&pool).await?;

        info!(connection = %connection, count = databases.len(), "Listed databases");

        Ok(ListDatabasesOutput {
            connection,
            count: databases.len(),
            databases,
        })
    }

    /// Handle the list_tables tool call.
    pub async fn list_tables(&self, input: ListTablesInput) -> DbResult<ListTablesOutput> {
        let (pool, connection) = self.registry.active().await?;
        let tables = self.inspector.list_tables(&pool, &input.database).await?;
        let tables = filter_views(tables, input.include_views);

        info!(
            connection = %connection,
            database = %input.database,
            count = tables.len(),
            "Listed tables"
        );

        Ok(ListTablesOutput {
            connection,
            database: input.database,
            count: tables.len(),
            tables,
        })
    }

    /// Handle the describe_table tool call.
    pub async fn describe_table(&self, input: DescribeTableInput) -> DbResult<DescribeTableOutput> {
        let (pool, connection) = self.registry.active().await?;
        let columns = self
            .inspector
            .describe_table(&pool, &input.database, &input.table)
            .await?;

        info!(
            connection = %connection,
            table = %input.table,
            columns = columns.len(),
            "Described table"
        );

        Ok(DescribeTableOutput {
            connection,
            primary_key: primary_key_columns(&columns),
            database: input.database,
            table: input.table,
            columns,
        })
    }

    /// Handle the list_indexes tool call.
    pub async fn list_indexes(&self, input: TableRefInput) -> DbResult<ListIndexesOutput> {
        let (pool, connection) = self.registry.active().await?;
        let indexes = self
            .inspector
            .list_indexes(&pool, &input.database, &input.table)
            .await?;

        Ok(ListIndexesOutput {
            connection,
            database: input.database,
            table: input.table,
            count: indexes.len(),
            indexes,
        })
    }

    /// Handle the show_create_table tool call.
    pub async fn show_create_table(&self, input: TableRefInput) -> DbResult<ShowCreateTableOutput> {
        let (pool, connection) = self.registry.active().await?;
        let create_statement = self
            .inspector
            .show_create_table(&pool, &input.database, &input.table)
            .await?;

        Ok(ShowCreateTableOutput {
            connection,
            database: input.database,
            table: input.table,
            create_statement,
        })
    }
}

fn filter_views(tables: Vec<TableInfo>, include_views: bool) -> Vec<TableInfo> {
    if include_views {
        return tables;
    }
    tables
        .into_iter()
        .filter(|t| t.table_type != TableType::View)
        .collect()
}

fn primary_key_columns(columns: &[ColumnDefinition]) -> Vec<String> {
    columns
        .iter()
        .filter(|c| c.is_primary_key())
        .map(|c| c.name.clone())
        .collect()
}
