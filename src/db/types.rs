//! MySQL row normalisation.
//!
//! Type conversion uses a two-phase approach:
//! 1. [`categorize_type`] classifies a column type name into a [`TypeCategory`]
//! 2. A decoder per category reads the cell into a [`CellValue`]
//!
//! [`normalize_cell`] then turns a `CellValue` into JSON: NULL stays null,
//! raw bytes become their (lossy) UTF-8 text, every other scalar passes
//! through. Keeping that last step pure makes the rule testable without a
//! server.

use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};
use tracing::debug;

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for MySQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Unsigned,
    Float,
    Decimal,
    Boolean,
    Date,
    Time,
    DateTime,
    Json,
    Binary,
    Text,
}

/// Classify a MySQL type name (as reported by the driver) into a category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let upper = type_name.trim().to_ascii_uppercase();

    match upper.as_str() {
        "BOOLEAN" | "BOOL" => return TypeCategory::Boolean,
        "DECIMAL" | "NUMERIC" => return TypeCategory::Decimal,
        "FLOAT" | "DOUBLE" | "REAL" => return TypeCategory::Float,
        "DATE" => return TypeCategory::Date,
        "TIME" => return TypeCategory::Time,
        "DATETIME" | "TIMESTAMP" => return TypeCategory::DateTime,
        "JSON" => return TypeCategory::Json,
        "BIT" | "GEOMETRY" => return TypeCategory::Binary,
        _ => {}
    }

    if upper.contains("BLOB") || upper.contains("BINARY") {
        return TypeCategory::Binary;
    }
    if upper.ends_with("INT UNSIGNED") {
        return TypeCategory::Unsigned;
    }
    if upper.ends_with("INT") {
        return TypeCategory::Integer;
    }

    // CHAR, VARCHAR, TEXT, ENUM, SET, YEAR and anything unknown
    TypeCategory::Text
}

// =============================================================================
// Cell Normalisation
// =============================================================================

/// A decoded cell, before JSON normalisation.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Exact decimal text, kept as a string to avoid rounding.
    Decimal(String),
    Text(String),
    Bytes(Vec<u8>),
    Json(JsonValue),
}

/// Normalise one cell into a JSON scalar.
///
/// # Examples
///
/// ```
/// use mysql_mcp_server::db::types::{CellValue, normalize_cell};
/// use serde_json::json;
///
/// assert_eq!(normalize_cell(CellValue::Null), json!(null));
/// assert_eq!(normalize_cell(CellValue::Bytes(b"abc".to_vec())), json!("abc"));
/// assert_eq!(normalize_cell(CellValue::Int(-7)), json!(-7));
/// ```
pub fn normalize_cell(cell: CellValue) -> JsonValue {
    match cell {
        CellValue::Null => JsonValue::Null,
        CellValue::Bool(v) => JsonValue::Bool(v),
        CellValue::Int(v) => JsonValue::Number(v.into()),
        CellValue::UInt(v) => JsonValue::Number(v.into()),
        CellValue::Float(v) => serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(v.to_string())),
        CellValue::Decimal(v) | CellValue::Text(v) => JsonValue::String(v),
        CellValue::Bytes(v) => JsonValue::String(String::from_utf8_lossy(&v).into_owned()),
        CellValue::Json(v) => v,
    }
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Raw DECIMAL text. MySQL sends DECIMAL as a string in both protocols.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_ascii_uppercase();
        name.contains("DECIMAL") || name.contains("NUMERIC")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Row Decoding
// =============================================================================

/// Column names of a row, in order.
pub fn column_names(row: &MySqlRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// Decode and normalise every cell of a row, in column order.
pub fn row_values(row: &MySqlRow) -> Vec<JsonValue> {
    (0..row.columns().len())
        .map(|idx| normalize_cell(decode_cell(row, idx)))
        .collect()
}

/// Decode one cell according to its column's type category.
pub fn decode_cell(row: &MySqlRow, idx: usize) -> CellValue {
    let is_null = row.try_get_raw(idx).map(|v| v.is_null()).unwrap_or(true);
    if is_null {
        return CellValue::Null;
    }

    let type_name = row.columns()[idx].type_info().name();
    let decoded = match categorize_type(type_name) {
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Unsigned => decode_unsigned(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Decimal => row
            .try_get::<RawDecimal, _>(idx)
            .ok()
            .map(|v| CellValue::Decimal(v.0)),
        TypeCategory::Boolean => decode_boolean(row, idx),
        TypeCategory::Date => row
            .try_get::<chrono::NaiveDate, _>(idx)
            .ok()
            .map(|v| CellValue::Text(v.to_string())),
        TypeCategory::Time => row
            .try_get::<chrono::NaiveTime, _>(idx)
            .ok()
            .map(|v| CellValue::Text(v.to_string())),
        TypeCategory::DateTime => row
            .try_get::<chrono::NaiveDateTime, _>(idx)
            .ok()
            .map(|v| CellValue::Text(v.to_string())),
        TypeCategory::Json => row.try_get::<JsonValue, _>(idx).ok().map(CellValue::Json),
        TypeCategory::Binary => None,
        TypeCategory::Text => row.try_get::<String, _>(idx).ok().map(CellValue::Text),
    };

    // Zero dates, negative TIME values and unusual types fall back to the raw bytes
    decoded.unwrap_or_else(|| {
        match row.try_get_unchecked::<Vec<u8>, _>(idx) {
            Ok(bytes) => CellValue::Bytes(bytes),
            Err(e) => {
                debug!(column = idx, type_name = %type_name, error = %e, "Undecodable cell");
                CellValue::Null
            }
        }
    })
}

fn decode_integer(row: &MySqlRow, idx: usize) -> Option<CellValue> {
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return Some(CellValue::Int(v));
    }
    if let Ok(v) = row.try_get::<i32, _>(idx) {
        return Some(CellValue::Int(v.into()));
    }
    if let Ok(v) = row.try_get::<i16, _>(idx) {
        return Some(CellValue::Int(v.into()));
    }
    row.try_get::<i8, _>(idx).ok().map(|v| CellValue::Int(v.into()))
}

fn decode_unsigned(row: &MySqlRow, idx: usize) -> Option<CellValue> {
    if let Ok(v) = row.try_get::<u64, _>(idx) {
        return Some(CellValue::UInt(v));
    }
    if let Ok(v) = row.try_get::<u32, _>(idx) {
        return Some(CellValue::UInt(v.into()));
    }
    if let Ok(v) = row.try_get::<u16, _>(idx) {
        return Some(CellValue::UInt(v.into()));
    }
    row.try_get::<u8, _>(idx).ok().map(|v| CellValue::UInt(v.into()))
}

fn decode_float(row: &MySqlRow, idx: usize) -> Option<CellValue> {
    if let Ok(v) = row.try_get::<f64, _>(idx) {
        return Some(CellValue::Float(v));
    }
    row.try_get::<f32, _>(idx).ok().map(|v| CellValue::Float(v.into()))
}

fn decode_boolean(row: &MySqlRow, idx: usize) -> Option<CellValue> {
    if let Ok(v) = row.try_get::<bool, _>(idx) {
        return Some(CellValue::Bool(v));
    }
    decode_integer(row, idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_categorize_integers() {
        assert_eq!(categorize_type("TINYINT"), TypeCategory::Integer);
        assert_eq!(categorize_type("int"), TypeCategory::Integer);
        assert_eq!(categorize_type("BIGINT"), TypeCategory::Integer);
        assert_eq!(categorize_type("BIGINT UNSIGNED"), TypeCategory::Unsigned);
        assert_eq!(categorize_type("MEDIUMINT UNSIGNED"), TypeCategory::Unsigned);
        assert_eq!(categorize_type("BOOLEAN"), TypeCategory::Boolean);
    }

    #[test]
    fn test_categorize_other_types() {
        assert_eq!(categorize_type("DECIMAL"), TypeCategory::Decimal);
        assert_eq!(categorize_type("DOUBLE"), TypeCategory::Float);
        assert_eq!(categorize_type("DATE"), TypeCategory::Date);
        assert_eq!(categorize_type("TIME"), TypeCategory::Time);
        assert_eq!(categorize_type("TIMESTAMP"), TypeCategory::DateTime);
        assert_eq!(categorize_type("JSON"), TypeCategory::Json);
        assert_eq!(categorize_type("VARBINARY"), TypeCategory::Binary);
        assert_eq!(categorize_type("LONGBLOB"), TypeCategory::Binary);
        assert_eq!(categorize_type("BIT"), TypeCategory::Binary);
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
        assert_eq!(categorize_type("ENUM"), TypeCategory::Text);
        assert_eq!(categorize_type("YEAR"), TypeCategory::Text);
        assert_eq!(categorize_type("SOMETHING_NEW"), TypeCategory::Text);
    }

    #[test]
    fn test_normalize_null_and_bytes() {
        assert_eq!(normalize_cell(CellValue::Null), JsonValue::Null);
        assert_eq!(
            normalize_cell(CellValue::Bytes("héllo".as_bytes().to_vec())),
            json!("héllo")
        );
        assert_eq!(
            normalize_cell(CellValue::Bytes(vec![0x61, 0xff, 0x62])),
            json!("a\u{FFFD}b")
        );
    }

    #[test]
    fn test_normalize_scalars_pass_through() {
        assert_eq!(normalize_cell(CellValue::Bool(true)), json!(true));
        assert_eq!(normalize_cell(CellValue::Int(-42)), json!(-42));
        assert_eq!(normalize_cell(CellValue::UInt(u64::MAX)), json!(u64::MAX));
        assert_eq!(normalize_cell(CellValue::Float(1.5)), json!(1.5));
        assert_eq!(
            normalize_cell(CellValue::Decimal("12345.6789".to_string())),
            json!("12345.6789")
        );
        assert_eq!(normalize_cell(CellValue::Text("x".to_string())), json!("x"));
        assert_eq!(
            normalize_cell(CellValue::Json(json!({"a": [1, 2]}))),
            json!({"a": [1, 2]})
        );
    }

    #[test]
    fn test_normalize_non_finite_float() {
        assert_eq!(normalize_cell(CellValue::Float(f64::NAN)), json!("NaN"));
        assert_eq!(normalize_cell(CellValue::Float(f64::INFINITY)), json!("inf"));
    }
}
