//! Conversion of driver rows into `Value`s.
//!
//! Statements are sent unprepared, so MySQL and PostgreSQL return every
//! column in text format. Numeric and boolean columns are decoded into their
//! native types; everything else (decimals, dates, enums, JSON) keeps its
//! textual form.

use super::types::{Row, RowSet, Value, MAX_ROWS};
use sqlx::{Column, ColumnIndex, Decode, Row as SqlxRow, Type, TypeInfo, ValueRef};
use tracing::warn;

/// Coarse decoding strategy picked from a driver type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeClass {
    Integer,
    Float,
    Bool,
    Binary,
    Text,
}

fn classify_type(type_name: &str) -> TypeClass {
    let upper = type_name.to_uppercase();
    match upper.as_str() {
        "BOOL" | "BOOLEAN" => TypeClass::Bool,
        "FLOAT" | "FLOAT4" | "FLOAT8" | "REAL" | "DOUBLE" | "DOUBLE PRECISION" => TypeClass::Float,
        "BYTEA" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => {
            TypeClass::Binary
        }
        _ if upper.contains("INT") && !upper.contains("INTERVAL") && !upper.contains("POINT") => {
            TypeClass::Integer
        }
        _ => TypeClass::Text,
    }
}

/// Converts fetched rows into a `RowSet`, keeping at most `MAX_ROWS` rows.
pub(crate) fn convert_rows<R>(rows: &[R]) -> RowSet
where
    R: SqlxRow,
    usize: ColumnIndex<R>,
    for<'r> i64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> f64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> bool: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> String: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> Vec<u8>: Decode<'r, R::Database> + Type<R::Database>,
{
    let columns = rows
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect()
        })
        .unwrap_or_default();

    let total_rows = rows.len();
    let truncated = total_rows > MAX_ROWS;
    if truncated {
        warn!(
            "Statement returned {} rows, truncating to {} rows",
            total_rows, MAX_ROWS
        );
    }

    RowSet {
        columns,
        rows: rows.iter().take(MAX_ROWS).map(convert_row).collect(),
        total_rows,
        truncated,
    }
}

fn convert_row<R>(row: &R) -> Row
where
    R: SqlxRow,
    usize: ColumnIndex<R>,
    for<'r> i64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> f64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> bool: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> String: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> Vec<u8>: Decode<'r, R::Database> + Type<R::Database>,
{
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

fn convert_value<R>(row: &R, index: usize, declared_type: &str) -> Value
where
    R: SqlxRow,
    usize: ColumnIndex<R>,
    for<'r> i64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> f64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> bool: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> String: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> Vec<u8>: Decode<'r, R::Database> + Type<R::Database>,
{
    // SQLite types values, not columns, so prefer the value's own type.
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return Value::Null,
    };
    let type_name = if type_name == "NULL" {
        declared_type
    } else {
        type_name.as_str()
    };

    let text = || row.try_get_unchecked::<String, _>(index).ok();

    let typed = match classify_type(type_name) {
        TypeClass::Integer => row
            .try_get::<i64, _>(index)
            .ok()
            .or_else(|| text().and_then(|s| s.trim().parse().ok()))
            .map(Value::Int),
        TypeClass::Float => row
            .try_get::<f64, _>(index)
            .ok()
            .or_else(|| text().and_then(|s| s.trim().parse().ok()))
            .map(Value::Float),
        TypeClass::Bool => row.try_get::<bool, _>(index).ok().map(Value::Bool),
        TypeClass::Binary => row.try_get::<Vec<u8>, _>(index).ok().map(Value::Bytes),
        TypeClass::Text => row.try_get::<String, _>(index).ok().map(Value::String),
    };

    // Text-format values of any type can still be read as a string.
    typed
        .or_else(|| text().map(Value::String))
        .unwrap_or(Value::Null)
}
