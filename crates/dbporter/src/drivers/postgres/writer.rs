//! DDL execution and transactional batch inserts.

use deadpool_postgres::Pool;
use tokio_postgres::types::ToSql;
use tokio_postgres::Client;

use crate::core::value::{row_values, DataRow};
use crate::error::{MigrateError, Result};

/// Run one DDL statement, tagging failures with the operation and object.
pub(super) async fn execute_ddl(
    client: &Client,
    operation: &str,
    object: &str,
    sql: &str,
) -> Result<()> {
    client
        .batch_execute(sql)
        .await
        .map_err(|e| MigrateError::ddl(operation, object, e))
}

/// Insert one chunk inside its own transaction.
///
/// The statement is prepared once and executed per row with values in
/// `columns` order. Any failure drops the transaction, which rolls it back.
pub(super) async fn insert_chunk(
    pool: &Pool,
    table: &str,
    chunk: usize,
    query: &str,
    columns: &[String],
    rows: &[DataRow],
) -> Result<u64> {
    let insert_err = |e: tokio_postgres::Error| MigrateError::data_insert(table, chunk, e);

    let mut client = pool
        .get()
        .await
        .map_err(|e| MigrateError::connection(format!("checking out connection for {}", table), e))?;

    let tx = client.transaction().await.map_err(insert_err)?;
    let stmt = tx.prepare(query).await.map_err(insert_err)?;

    for row in rows {
        let values = row_values(columns, row);
        let params: Vec<&(dyn ToSql + Sync)> = values
            .iter()
            .map(|v| *v as &(dyn ToSql + Sync))
            .collect();
        tx.execute(&stmt, &params).await.map_err(insert_err)?;
    }

    tx.commit().await.map_err(insert_err)?;
    Ok(rows.len() as u64)
}
