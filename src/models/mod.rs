//! Data models for the MySQL MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{ConnectionConfig, ConnectionSummary};
pub use query::{DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, QueryResult, effective_row_limit};
pub use schema::{
    ColumnDefinition, IndexColumnRow, IndexInfo, TableInfo, TableType, format_size,
    group_index_rows,
};
