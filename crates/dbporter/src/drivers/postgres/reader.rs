//! Catalog and data reads.
//!
//! Introspection goes through `information_schema` only. Every text column
//! is cast to `text` so the driver never sees the catalog's domain types.

use std::collections::HashSet;

use tokio_postgres::Client;

use crate::core::schema::{ColumnSchema, ForeignKeySchema};
use crate::core::value::QueryResult;
use crate::error::{BoxError, MigrateError, Result};

use super::codec::decode_row;
use super::dialect::native_type;

const LIST_TABLES_SQL: &str = r#"
    SELECT table_name::text
    FROM information_schema.tables
    WHERE table_schema = $1 AND table_type = 'BASE TABLE'
    ORDER BY table_name
"#;

const COLUMNS_SQL: &str = r#"
    SELECT
        column_name::text,
        data_type::text,
        udt_name::text,
        is_nullable::text,
        column_default::text,
        character_maximum_length::int4,
        numeric_precision::int4,
        numeric_scale::int4
    FROM information_schema.columns
    WHERE table_schema = $1 AND table_name = $2
    ORDER BY ordinal_position
"#;

const PRIMARY_KEY_SQL: &str = r#"
    SELECT kcu.column_name::text
    FROM information_schema.key_column_usage kcu
    JOIN information_schema.table_constraints tc
      ON kcu.constraint_name = tc.constraint_name
     AND kcu.table_schema = tc.table_schema
     AND kcu.table_name = tc.table_name
    WHERE tc.constraint_type = 'PRIMARY KEY'
      AND tc.table_schema = $1
      AND tc.table_name = $2
"#;

const FOREIGN_KEYS_SQL: &str = r#"
    SELECT
        tc.constraint_name::text,
        kcu.column_name::text,
        ccu.table_name::text AS foreign_table_name,
        ccu.column_name::text AS foreign_column_name,
        rc.delete_rule::text,
        rc.update_rule::text
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON tc.constraint_name = kcu.constraint_name
     AND tc.table_schema = kcu.table_schema
    JOIN information_schema.constraint_column_usage ccu
      ON ccu.constraint_name = tc.constraint_name
     AND ccu.table_schema = tc.table_schema
    JOIN information_schema.referential_constraints rc
      ON rc.constraint_name = tc.constraint_name
     AND rc.constraint_schema = tc.table_schema
    WHERE tc.constraint_type = 'FOREIGN KEY'
      AND tc.table_schema = $1
      AND tc.table_name = $2
    ORDER BY tc.constraint_name
"#;

pub(super) async fn list_tables(client: &Client, schema: &str) -> Result<Vec<String>> {
    let rows = client
        .query(LIST_TABLES_SQL, &[&schema])
        .await
        .map_err(|e| MigrateError::introspection("<tables>", e))?;

    Ok(rows.iter().map(|r| r.get::<_, String>(0)).collect())
}

/// Columns in ordinal order. Empty when the table does not exist.
pub(super) async fn load_columns(
    client: &Client,
    schema: &str,
    table: &str,
) -> Result<Vec<ColumnSchema>> {
    let rows = client
        .query(COLUMNS_SQL, &[&schema, &table])
        .await
        .map_err(|e| MigrateError::introspection(table, e))?;

    let columns = rows
        .iter()
        .map(|row| {
            let data_type: String = row.get(1);
            let udt_name: String = row.get(2);
            ColumnSchema {
                name: row.get(0),
                data_type: native_type(&data_type, &udt_name, row.get(5), row.get(6), row.get(7)),
                nullable: row.get::<_, String>(3) == "YES",
                primary_key: false,
                default_value: row.get(4),
                foreign_key: None,
            }
        })
        .collect();

    Ok(columns)
}

pub(super) async fn load_primary_key(
    client: &Client,
    schema: &str,
    table: &str,
) -> Result<HashSet<String>> {
    let rows = client
        .query(PRIMARY_KEY_SQL, &[&schema, &table])
        .await
        .map_err(|e| MigrateError::introspection(table, e))?;

    Ok(rows.iter().map(|r| r.get::<_, String>(0)).collect())
}

pub(super) async fn load_foreign_keys(
    client: &Client,
    schema: &str,
    table: &str,
) -> Result<Vec<ForeignKeySchema>> {
    let rows = client
        .query(FOREIGN_KEYS_SQL, &[&schema, &table])
        .await
        .map_err(|e| MigrateError::introspection(table, e))?;

    Ok(rows
        .iter()
        .map(|row| ForeignKeySchema {
            name: row.get(0),
            column: row.get(1),
            referenced_table: row.get(2),
            referenced_column: row.get(3),
            on_delete: row.get(4),
            on_update: row.get(5),
        })
        .collect())
}

/// Run `query` and decode every row.
pub(super) async fn fetch_rows(client: &Client, query: &str) -> Result<QueryResult> {
    let fetch_err = |e: BoxError| MigrateError::data_fetch(query, e);

    let stmt = client
        .prepare(query)
        .await
        .map_err(|e| fetch_err(e.into()))?;
    let columns: Vec<String> = stmt
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let rows = client
        .query(&stmt, &[])
        .await
        .map_err(|e| fetch_err(e.into()))?;

    let decoded = rows
        .iter()
        .map(decode_row)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(fetch_err)?;

    Ok(QueryResult::new(columns, decoded))
}
