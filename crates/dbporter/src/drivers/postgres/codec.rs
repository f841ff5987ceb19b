//! Conversion between [`Value`] and PostgreSQL wire types.

use bytes::{BufMut, BytesMut};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, Kind, ToSql, Type};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::core::value::{DataRow, Value};
use crate::error::BoxError;

/// `jsonb` binary format version byte.
const JSONB_VERSION: u8 = 1;

fn is_enum(ty: &Type) -> bool {
    matches!(ty.kind(), Kind::Enum(_))
}

/// Label of a user-defined enum. The binary form is the label's UTF-8 text.
#[derive(Debug)]
struct EnumLabel<'a>(&'a str);

impl<'a> FromSql<'a> for EnumLabel<'a> {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Ok(EnumLabel(std::str::from_utf8(raw)?))
    }

    fn accepts(ty: &Type) -> bool {
        is_enum(ty)
    }
}

impl ToSql for EnumLabel<'_> {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        out.put_slice(self.0.as_bytes());
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        is_enum(ty)
    }

    to_sql_checked!();
}

/// Write JSON text for a `json` or `jsonb` parameter.
fn encode_json_text(text: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if *ty == Type::JSONB {
        out.put_u8(JSONB_VERSION);
    }
    out.put_slice(text.as_bytes());
    Ok(IsNull::No)
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        // Integers and floats widen to the parameter type when it is larger.
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql_checked(ty, out),
            Value::I16(v) if *ty == Type::INT4 => i32::from(*v).to_sql_checked(ty, out),
            Value::I16(v) if *ty == Type::INT8 => i64::from(*v).to_sql_checked(ty, out),
            Value::I16(v) => v.to_sql_checked(ty, out),
            Value::I32(v) if *ty == Type::INT8 => i64::from(*v).to_sql_checked(ty, out),
            Value::I32(v) => v.to_sql_checked(ty, out),
            Value::I64(v) => v.to_sql_checked(ty, out),
            Value::F32(v) if *ty == Type::FLOAT8 => f64::from(*v).to_sql_checked(ty, out),
            Value::F32(v) => v.to_sql_checked(ty, out),
            Value::F64(v) => v.to_sql_checked(ty, out),
            Value::Decimal(v) => v.to_sql_checked(ty, out),
            Value::Text(v) if is_enum(ty) => EnumLabel(v.as_str()).to_sql_checked(ty, out),
            Value::Text(v) if *ty == Type::JSON || *ty == Type::JSONB => {
                encode_json_text(v, ty, out)
            }
            Value::Text(v) => v.to_sql_checked(ty, out),
            Value::Bytes(v) => v.to_sql_checked(ty, out),
            Value::Uuid(v) => v.to_sql_checked(ty, out),
            Value::Date(v) => v.to_sql_checked(ty, out),
            Value::Time(v) => v.to_sql_checked(ty, out),
            Value::DateTime(v) => v.to_sql_checked(ty, out),
            Value::DateTimeOffset(v) => v.to_sql_checked(ty, out),
            Value::Json(v) if <String as ToSql>::accepts(ty) => {
                v.to_string().to_sql_checked(ty, out)
            }
            Value::Json(v) => v.to_sql_checked(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Decode column `idx` of `row` by its reported type name. Enums of any
/// name decode to their label.
pub(super) fn decode_value(row: &Row, idx: usize) -> Result<Value, BoxError> {
    let column = &row.columns()[idx];
    if is_enum(column.type_()) {
        let label = row.try_get::<_, Option<EnumLabel<'_>>>(idx)?;
        return Ok(label.map(|l| l.0.to_string()).into());
    }

    let value: Value = match column.type_().name() {
        "bool" => row.try_get::<_, Option<bool>>(idx)?.into(),
        "int2" => row.try_get::<_, Option<i16>>(idx)?.into(),
        "int4" => row.try_get::<_, Option<i32>>(idx)?.into(),
        "int8" => row.try_get::<_, Option<i64>>(idx)?.into(),
        "oid" => row.try_get::<_, Option<u32>>(idx)?.map(i64::from).into(),
        "float4" => row.try_get::<_, Option<f32>>(idx)?.into(),
        "float8" => row.try_get::<_, Option<f64>>(idx)?.into(),
        "numeric" => row.try_get::<_, Option<Decimal>>(idx)?.into(),
        "text" | "varchar" | "bpchar" | "name" | "citext" | "unknown" => {
            row.try_get::<_, Option<String>>(idx)?.into()
        }
        "bytea" => row.try_get::<_, Option<Vec<u8>>>(idx)?.into(),
        "uuid" => row.try_get::<_, Option<Uuid>>(idx)?.into(),
        "date" => row.try_get::<_, Option<NaiveDate>>(idx)?.into(),
        "time" => row.try_get::<_, Option<NaiveTime>>(idx)?.into(),
        "timestamp" => row.try_get::<_, Option<NaiveDateTime>>(idx)?.into(),
        "timestamptz" => row.try_get::<_, Option<DateTime<FixedOffset>>>(idx)?.into(),
        "json" | "jsonb" => row.try_get::<_, Option<serde_json::Value>>(idx)?.into(),
        other => {
            return Err(format!(
                "column '{name}' has unsupported type '{other}'; \
                 cast it in the query, e.g. \"{name}\"::text",
                name = column.name(),
            )
            .into())
        }
    };
    Ok(value)
}

/// Decode a whole row into a name-keyed map.
pub(super) fn decode_row(row: &Row) -> Result<DataRow, BoxError> {
    let mut out = DataRow::new();
    for (idx, column) in row.columns().iter().enumerate() {
        out.insert(column.name().to_string(), decode_value(row, idx)?);
    }
    Ok(out)
}
