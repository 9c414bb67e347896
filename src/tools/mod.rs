//! MCP tool implementations.
//!
//! This module contains all database tool handlers:
//! - `query`: `run_query` and `explain_query`, behind the SQL gate
//! - `schema`: database, table, column and index introspection
//! - `vector`: `vector_search` over MySQL VECTOR columns
//! - `connection`: `list_connections` and `use_connection`
//! - `format`: table and markdown rendering of query results

pub mod connection;
pub mod format;
pub mod query;
pub mod schema;
pub mod vector;

pub use connection::{
    ConnectionToolHandler, ListConnectionsOutput, UseConnectionInput, UseConnectionOutput,
};
pub use format::OutputFormat;
pub use query::{ExplainQueryInput, QueryOutput, QueryToolHandler, RunQueryInput};
pub use schema::{
    DescribeTableInput, DescribeTableOutput, ListDatabasesOutput, ListIndexesOutput,
    ListTablesInput, ListTablesOutput, SchemaToolHandler, ShowCreateTableOutput, TableRefInput,
};
pub use vector::{DistanceFunction, VectorSearchInput, VectorToolHandler};

/// Treat a missing or whitespace-only optional argument as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `...`.
pub(crate) fn truncate_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(Some(" shop ".to_string())).as_deref(), Some("shop"));
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("SELECT 1", 200), "SELECT 1");
        assert_eq!(truncate_for_log("abcdef", 3), "abc...");
        // Multi-byte characters are never split.
        assert_eq!(truncate_for_log("ééééé", 2), "éé...");
        assert_eq!(truncate_for_log(&"x".repeat(200), 200), "x".repeat(200));
    }
}
