//! Output formatting utilities for MCP tools.
//!
//! This module provides the output format option and the text renderers
//! used by `run_query` and `explain_query` when the caller asks for a table.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use unicode_width::UnicodeWidthStr;

/// Output format for query/explain results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// ASCII table format (like MySQL CLI)
    Table,
    /// Markdown table format
    Markdown,
}

/// Format value for display in a table cell.
pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
    }
}

fn cell(row: &[JsonValue], idx: usize) -> &JsonValue {
    row.get(idx).unwrap_or(&JsonValue::Null)
}

/// Pad `text` to `width` display columns. `{:<width$}` counts chars, not
/// display width, so wide characters would break the borders.
fn pad(text: &str, width: usize, right_align: bool) -> String {
    let fill = " ".repeat(width.saturating_sub(text.width()));
    if right_align {
        format!("{}{}", fill, text)
    } else {
        format!("{}{}", text, fill)
    }
}

/// Format a result as an ASCII table (MySQL CLI style).
pub fn format_as_table(
    columns: &[String],
    rows: &[Vec<JsonValue>],
    truncated: bool,
    execution_time_ms: u64,
) -> String {
    if columns.is_empty() {
        return "Empty set".to_string();
    }

    let mut widths: Vec<usize> = columns.iter().map(|c| c.width()).collect();
    for row in rows {
        for (i, width) in widths.iter_mut().enumerate() {
            *width = (*width).max(format_value(cell(row, i)).width());
        }
    }

    let mut output = String::new();
    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    // Header
    output.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(name, w)| format!("| {} ", pad(name, *w, false)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for row in rows {
        let row_str: String = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let value = cell(row, i);
                // Right-align numbers, left-align others
                let right = matches!(value, JsonValue::Number(_));
                format!("| {} ", pad(&format_value(value), *w, right))
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&separator);

    let row_text = if rows.len() == 1 { "row" } else { "rows" };
    let truncated_text = if truncated { " (truncated)" } else { "" };
    output.push_str(&format!(
        "{} {} in set{} ({:.2} sec)\n",
        rows.len(),
        row_text,
        truncated_text,
        execution_time_ms as f64 / 1000.0
    ));

    output
}

/// Escape characters that would break a markdown table cell.
fn escape_markdown(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Format a result as a Markdown table.
pub fn format_as_markdown(columns: &[String], rows: &[Vec<JsonValue>], truncated: bool) -> String {
    if columns.is_empty() {
        return "*Empty set*".to_string();
    }

    let mut output = String::new();

    let header: String = columns
        .iter()
        .map(|c| format!("| {} ", escape_markdown(c)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);

    let sep: String = columns.iter().map(|_| "|---").collect::<String>() + "|\n";
    output.push_str(&sep);

    for row in rows {
        let row_str: String = (0..columns.len())
            .map(|i| format!("| {} ", escape_markdown(&format_value(cell(row, i)))))
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    let truncated_text = if truncated { " *(truncated)*" } else { "" };
    output.push_str(&format!("\n*{} rows*{}", rows.len(), truncated_text));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> (Vec<String>, Vec<Vec<JsonValue>>) {
        (
            vec!["id".to_string(), "name".to_string()],
            vec![
                vec![json!(1), json!("alice")],
                vec![json!(22), JsonValue::Null],
            ],
        )
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&JsonValue::Null), "NULL");
        assert_eq!(format_value(&json!(true)), "true");
        assert_eq!(format_value(&json!(1.5)), "1.5");
        assert_eq!(format_value(&json!("x")), "x");
        assert_eq!(format_value(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_format_as_table() {
        let (columns, rows) = sample();
        let table = format_as_table(&columns, &rows, false, 1500);
        let expected = "\
+----+-------+
| id | name  |
+----+-------+
|  1 | alice |
| 22 | NULL  |
+----+-------+
2 rows in set (1.50 sec)
";
        assert_eq!(table, expected);
    }

    #[test]
    fn test_format_as_table_wide_chars() {
        let columns = vec!["名前".to_string()];
        let rows = vec![vec![json!("ab")]];
        let table = format_as_table(&columns, &rows, true, 0);
        assert!(table.starts_with("+------+\n| 名前 |\n+------+\n| ab   |\n"));
        assert!(table.contains("1 row in set (truncated)"));
    }

    #[test]
    fn test_format_as_table_empty() {
        assert_eq!(format_as_table(&[], &[], false, 0), "Empty set");
    }

    #[test]
    fn test_format_as_markdown() {
        let (columns, rows) = sample();
        let md = format_as_markdown(&columns, &rows, true);
        assert_eq!(
            md,
            "| id | name |\n|---|---|\n| 1 | alice |\n| 22 | NULL |\n\n*2 rows* *(truncated)*"
        );
    }

    #[test]
    fn test_format_as_markdown_escapes_pipes() {
        let columns = vec!["a|b".to_string()];
        let rows = vec![vec![json!("x|y")]];
        let md = format_as_markdown(&columns, &rows, false);
        assert!(md.contains("| a\\|b |"));
        assert!(md.contains("| x\\|y |"));
    }

    #[test]
    fn test_output_format_deserialize() {
        let format: OutputFormat = serde_json::from_str("\"markdown\"").unwrap();
        assert_eq!(format, OutputFormat::Markdown);
        assert_eq!(OutputFormat::default(), OutputFormat::Json);
    }
}
