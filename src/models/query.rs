//! Query-related data models.
//!
//! This module defines row limits and the normalised result of a query.

use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Default row limit for query results.
pub const DEFAULT_ROW_LIMIT: u32 = 1000;

/// Maximum allowed row limit.
pub const MAX_ROW_LIMIT: u32 = 10000;

/// Resolve a requested row limit against a default, clamped to `[1, MAX_ROW_LIMIT]`.
pub fn effective_row_limit(requested: Option<u32>, default: u32) -> u32 {
    let default = if default == 0 { DEFAULT_ROW_LIMIT } else { default };
    requested.unwrap_or(default).clamp(1, MAX_ROW_LIMIT)
}

/// Normalised result of a query: ordered columns and ordered rows of scalars.
#[derive(Debug, Clone, Default, PartialEq, Serialize, JsonSchema)]
pub struct QueryResult {
    pub columns: Vec<String>,
    /// One array per row, values in column order.
    pub rows: Vec<Vec<JsonValue>>,
    /// True if more rows were available than the limit allowed.
    pub truncated: bool,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Value of `column` in row `row`, if both exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&JsonValue> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx)
    }

    /// String value of `column` in row `row`, treating NULL and missing as `None`.
    pub fn get_str(&self, row: usize, column: &str) -> Option<&str> {
        self.get(row, column).and_then(JsonValue::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_effective_row_limit() {
        assert_eq!(effective_row_limit(None, 0), DEFAULT_ROW_LIMIT);
        assert_eq!(effective_row_limit(None, 50), 50);
        assert_eq!(effective_row_limit(Some(0), 50), 1);
        assert_eq!(effective_row_limit(Some(20), 50), 20);
        assert_eq!(effective_row_limit(Some(u32::MAX), 50), MAX_ROW_LIMIT);
    }

    #[test]
    fn test_query_result_accessors() {
        let result = QueryResult {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: vec![vec![json!(1), json!("alice")], vec![json!(2), JsonValue::Null]],
            truncated: false,
            execution_time_ms: 3,
        };
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.get(0, "id"), Some(&json!(1)));
        assert_eq!(result.get_str(0, "name"), Some("alice"));
        assert_eq!(result.get_str(1, "name"), None);
        assert_eq!(result.get(5, "id"), None);
        assert_eq!(result.get(0, "missing"), None);
    }
}
