//! Query result types for SQLFlow.
//!
//! Defines the structures used to represent statement results from the database.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum rows kept from a single row-producing statement.
pub const MAX_ROWS: usize = 1000;

/// The outcome of executing one SQL statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryResult {
    /// A read-style statement produced rows (possibly none).
    Rows(RowSet),
    /// A write-style statement changed this many rows.
    Affected(u64),
}

impl QueryResult {
    /// Returns the row set, if this is a row-producing result.
    pub fn as_rows(&self) -> Option<&RowSet> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::Affected(_) => None,
        }
    }
}

/// Rows returned by a read-style statement.
///
/// Each row holds one value per entry in `columns`, in the same order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    /// Column names, in result order. Empty when no rows came back.
    pub columns: Vec<String>,

    /// Rows of data.
    pub rows: Vec<Row>,

    /// Number of rows the database produced before truncation.
    pub total_rows: usize,

    /// Whether rows beyond MAX_ROWS were dropped.
    #[serde(default)]
    pub truncated: bool,
}

impl RowSet {
    /// Creates a row set with the given columns and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let total_rows = rows.len();
        Self {
            columns,
            rows,
            total_rows,
            truncated: false,
        }
    }

    /// Builds a row set from named records, taking the column order from the first record.
    pub fn from_records<K, V>(records: Vec<Vec<(K, V)>>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut columns = Vec::new();
        let mut rows = Vec::with_capacity(records.len());
        for (i, record) in records.into_iter().enumerate() {
            let mut row = Vec::with_capacity(record.len());
            for (name, value) in record {
                if i == 0 {
                    columns.push(name.into());
                }
                row.push(value.into());
            }
            rows.push(row);
        }
        Self::new(columns, rows)
    }

    /// Returns the number of rows held.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no rows were returned.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns each row as a column-name to value mapping.
    pub fn records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row.iter())
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect()
            })
            .collect()
    }

    /// Formats the rows for inclusion in an LLM prompt, as a JSON array of objects.
    pub fn format_for_llm(&self) -> String {
        let records = self.records();
        let json = serde_json::to_string(&records).unwrap_or_else(|_| "[]".to_string());
        match self.truncation_warning() {
            Some(warning) => format!("{json}\n({warning})"),
            None => json,
        }
    }

    /// Returns a truncation warning message if the result was truncated.
    pub fn truncation_warning(&self) -> Option<String> {
        self.truncated.then(|| {
            format!(
                "Result truncated: showing {} of {} rows",
                self.rows.len(),
                self.total_rows
            )
        })
    }
}

/// A row of data from a query result.
pub type Row = Vec<Value>;

/// Represents a single value from a database query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    String(String),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts the value to a string representation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }

    /// Converts the value to plain JSON.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(f.to_string())),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(_) => serde_json::Value::String(self.to_display_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}
