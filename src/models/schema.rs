//! Schema-related data models.
//!
//! This module defines the introspection results built from MySQL `SHOW`
//! statements.

use schemars::JsonSchema;
use serde::Serialize;

/// One row of `SHOW TABLE STATUS`.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct TableInfo {
    pub name: String,
    /// "table" or "view"
    #[serde(rename = "type")]
    pub table_type: TableType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    /// Estimated row count (exact for MyISAM, approximate for InnoDB)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    /// Bytes (excluding indexes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_size: Option<u64>,
    /// Bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_size: Option<u64>,
    /// Data plus indexes, human readable (e.g. "1.50 MB")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl TableInfo {
    /// Create a new table info.
    pub fn new(name: impl Into<String>, table_type: TableType) -> Self {
        Self {
            name: name.into(),
            table_type,
            engine: None,
            row_count: None,
            data_size: None,
            index_size: None,
            total_size: None,
            collation: None,
            comment: None,
        }
    }

    /// Set the storage engine.
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// Set the estimated row count.
    pub fn with_row_count(mut self, row_count: u64) -> Self {
        self.row_count = Some(row_count);
        self
    }

    /// Set data and index sizes; the human readable total is derived from both.
    pub fn with_sizes(mut self, data_size: Option<u64>, index_size: Option<u64>) -> Self {
        self.data_size = data_size;
        self.index_size = index_size;
        if data_size.is_some() || index_size.is_some() {
            let total = data_size.unwrap_or(0).saturating_add(index_size.unwrap_or(0));
            self.total_size = Some(format_size(total));
        }
        self
    }

    /// Set the collation rule.
    pub fn with_collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Set the table comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Type of table object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TableType {
    Table,
    View,
}

impl TableType {
    /// Classify a `SHOW TABLE STATUS` row: views have no engine and the comment `VIEW`.
    pub fn from_status(engine: Option<&str>, comment: Option<&str>) -> Self {
        match (engine, comment) {
            (None, Some(c)) if c.eq_ignore_ascii_case("view") => Self::View,
            _ => Self::Table,
        }
    }
}

impl std::fmt::Display for TableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::View => write!(f, "view"),
        }
    }
}

/// One row of `SHOW FULL COLUMNS`.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ColumnDefinition {
    pub name: String,
    /// Full type (e.g., `varchar(30)`, `bigint unsigned`)
    pub data_type: String,
    pub nullable: bool,
    /// PRI, UNI, MUL or empty
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// e.g. `auto_increment`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ColumnDefinition {
    /// Create a new column definition.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            key: String::new(),
            default_value: None,
            extra: None,
            collation: None,
            comment: None,
        }
    }

    pub fn is_primary_key(&self) -> bool {
        self.key == "PRI"
    }
}

/// An index, assembled from one `SHOW INDEX` row per column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct IndexInfo {
    pub name: String,
    /// Columns in index order (`Seq_in_index`)
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
    /// BTREE, HASH, FULLTEXT, SPATIAL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_type: Option<String>,
}

/// A single column entry of `SHOW INDEX`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumnRow {
    pub index_name: String,
    pub seq_in_index: u32,
    /// `None` for functional key parts.
    pub column_name: Option<String>,
    pub non_unique: bool,
    pub index_type: Option<String>,
}

/// Group `SHOW INDEX` rows by index name, keeping first-seen index order.
pub fn group_index_rows(rows: Vec<IndexColumnRow>) -> Vec<IndexInfo> {
    let mut indexes: Vec<(IndexInfo, Vec<(u32, String)>)> = Vec::new();

    for row in rows {
        let position = match indexes.iter().position(|(idx, _)| idx.name == row.index_name) {
            Some(position) => position,
            None => {
                let is_primary = row.index_name == "PRIMARY";
                indexes.push((
                    IndexInfo {
                        name: row.index_name.clone(),
                        columns: Vec::new(),
                        is_unique: !row.non_unique || is_primary,
                        is_primary,
                        index_type: row.index_type.clone(),
                    },
                    Vec::new(),
                ));
                indexes.len() - 1
            }
        };
        let column = row.column_name.unwrap_or_else(|| "(expression)".to_string());
        indexes[position].1.push((row.seq_in_index, column));
    }

    indexes
        .into_iter()
        .map(|(mut index, mut parts)| {
            parts.sort_by_key(|(seq, _)| *seq);
            index.columns = parts.into_iter().map(|(_, column)| column).collect();
            index
        })
        .collect()
}

/// Format bytes as human-readable size string.
///
/// Uses binary units (1 kB = 1024 bytes), the way MySQL reports table sizes.
///
/// # Examples
///
/// ```
/// use mysql_mcp_server::models::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(1024), "1 kB");
/// assert_eq!(format_size(1048576), "1 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::WINDOWS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_row(name: &str, seq: u32, column: &str, non_unique: bool) -> IndexColumnRow {
        IndexColumnRow {
            index_name: name.to_string(),
            seq_in_index: seq,
            column_name: Some(column.to_string()),
            non_unique,
            index_type: Some("BTREE".to_string()),
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(16384), "16 kB");
        assert_eq!(format_size(1024 * 1024 + 512 * 1024), "1.50 MB");
        assert_eq!(format_size(4 * 1024 * 1024 * 1024), "4 GB");
    }

    #[test]
    fn test_table_type_from_status() {
        assert_eq!(TableType::from_status(None, Some("VIEW")), TableType::View);
        assert_eq!(
            TableType::from_status(Some("InnoDB"), Some("VIEW")),
            TableType::Table
        );
        assert_eq!(TableType::from_status(Some("InnoDB"), None), TableType::Table);
        assert_eq!(TableType::View.to_string(), "view");
    }

    #[test]
    fn test_table_info_sizes() {
        let info = TableInfo::new("orders", TableType::Table).with_sizes(Some(1024), Some(1024));
        assert_eq!(info.total_size.as_deref(), Some("2 kB"));

        let info = TableInfo::new("v", TableType::View).with_sizes(None, None);
        assert_eq!(info.total_size, None);
    }

    #[test]
    fn test_group_index_rows() {
        let rows = vec![
            index_row("PRIMARY", 1, "id", false),
            index_row("idx_name", 2, "last", true),
            index_row("idx_name", 1, "first", true),
            index_row("uniq_email", 1, "email", false),
        ];
        let indexes = group_index_rows(rows);

        assert_eq!(indexes.len(), 3);
        assert_eq!(indexes[0].name, "PRIMARY");
        assert!(indexes[0].is_primary && indexes[0].is_unique);
        assert_eq!(indexes[1].columns, vec!["first", "last"]);
        assert!(!indexes[1].is_unique);
        assert!(indexes[2].is_unique && !indexes[2].is_primary);
    }

    #[test]
    fn test_group_index_rows_expression_part() {
        let mut row = index_row("idx_fn", 1, "", true);
        row.column_name = None;
        let indexes = group_index_rows(vec![row]);
        assert_eq!(indexes[0].columns, vec!["(expression)"]);
    }
}
