//! Dynamically typed row values and query results.
//!
//! Rows move from a source adapter to a destination adapter as maps from
//! column name to [`Value`]. The value set covers the scalar types that the
//! relational engines we talk to hand back from a plain `SELECT`.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// 16-bit signed integer (smallint).
    I16(i16),

    /// 32-bit signed integer (int).
    I32(i32),

    /// 64-bit signed integer (bigint).
    I64(i64),

    /// 32-bit floating point (real/float4).
    F32(f32),

    /// 64-bit floating point (double precision/float8).
    F64(f64),

    /// Decimal value with arbitrary precision.
    Decimal(Decimal),

    /// Text/string data.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// UUID value.
    Uuid(Uuid),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Timestamp with timezone offset.
    DateTimeOffset(DateTime<FixedOffset>),

    /// JSON document (json/jsonb).
    Json(serde_json::Value),
}

impl Value {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type label, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I16(_) => "int2",
            Value::I32(_) => "int4",
            Value::I64(_) => "int8",
            Value::F32(_) => "float4",
            Value::F64(_) => "float8",
            Value::Decimal(_) => "numeric",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytea",
            Value::Uuid(_) => "uuid",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "timestamp",
            Value::DateTimeOffset(_) => "timestamptz",
            Value::Json(_) => "json",
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::I16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::DateTimeOffset(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

/// One row keyed by column name.
///
/// Rows produced by a single fetch share the query's projection, but nothing
/// forces rows handed to an insert to have identical key sets.
pub type DataRow = BTreeMap<String, Value>;

/// Fully materialized result of a read query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Column names in projection order.
    pub columns: Vec<String>,

    /// Rows in result order.
    pub rows: Vec<DataRow>,

    /// Number of rows.
    pub count: u64,
}

impl QueryResult {
    /// Build a result, deriving the count from the rows.
    pub fn new(columns: Vec<String>, rows: Vec<DataRow>) -> Self {
        let count = rows.len() as u64;
        Self {
            columns,
            rows,
            count,
        }
    }

    /// Check if the result has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Project a row onto a fixed column order.
///
/// Columns missing from the row are bound as NULL and keys not named in
/// `columns` are dropped, so rows whose key set differs from the one the
/// column list was built from are silently reshaped rather than rejected.
pub fn row_values<'r>(columns: &[String], row: &'r DataRow) -> Vec<&'r Value> {
    const NULL: &Value = &Value::Null;
    columns
        .iter()
        .map(|c| row.get(c).unwrap_or(NULL))
        .collect()
}
