//! The capability contract every database binding implements.
//!
//! [`DatabaseAdapter`] groups four concerns on one trait:
//!
//! - **Connection**: connect, close, ping
//! - **Schema**: introspection and single-object DDL
//! - **Data**: materialized reads and batched transactional inserts
//! - **Utility**: dialect helpers (identifier escaping, INSERT text)
//!
//! Schema and DDL stay together with the dialect helpers because both rely on
//! the same identifier escaping rules.
//!
//! Every I/O-bearing method takes the caller's [`CancellationToken`]. There is
//! no built-in timeout; cancelling the token is the only way to abort an
//! in-flight statement.

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{MigrateError, Result};

use super::schema::{ForeignKeySchema, TableSchema};
use super::value::{DataRow, QueryResult};

/// Rows per transaction used by [`DatabaseAdapter::insert_data`] and the migrator.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Relational engine binding.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    // ===== Connection =====

    /// Establish the connection pool and verify it with a round trip.
    ///
    /// Calling this twice on the same adapter is not supported.
    async fn connect(&mut self, cancel: &CancellationToken) -> Result<()>;

    /// Release connection resources. A no-op on a never-connected adapter.
    async fn close(&mut self);

    /// Liveness check.
    async fn ping(&self, cancel: &CancellationToken) -> Result<()>;

    // ===== Schema =====

    /// Base tables in the adapter's schema, ordered by name.
    async fn list_tables(&self, cancel: &CancellationToken) -> Result<Vec<String>>;

    /// Rebuild the portable description of `table` from catalog metadata.
    ///
    /// Fails with [`MigrateError::Introspection`] when the table does not
    /// exist or a catalog query fails.
    async fn get_table_schema(
        &self,
        cancel: &CancellationToken,
        table: &str,
    ) -> Result<TableSchema>;

    /// Outgoing foreign keys of `table`.
    async fn get_foreign_keys(
        &self,
        cancel: &CancellationToken,
        table: &str,
    ) -> Result<Vec<ForeignKeySchema>>;

    /// Create the table, then add each foreign key with its own statement.
    ///
    /// A failing foreign key fails the whole call but leaves the table in place.
    async fn create_table(&self, cancel: &CancellationToken, schema: &TableSchema) -> Result<()>;

    /// Add one foreign key constraint.
    async fn create_foreign_key(
        &self,
        cancel: &CancellationToken,
        table: &str,
        fk: &ForeignKeySchema,
    ) -> Result<()>;

    /// Drop one constraint. Fails if it does not exist.
    async fn drop_foreign_key(
        &self,
        cancel: &CancellationToken,
        table: &str,
        constraint: &str,
    ) -> Result<()>;

    /// Drop the table if it exists.
    async fn drop_table(&self, cancel: &CancellationToken, table: &str) -> Result<()>;

    // ===== Data =====

    /// Run a read query and materialize every row.
    ///
    /// `limit` of `None` or `Some(0)` imposes no row cap.
    async fn fetch_data(
        &self,
        cancel: &CancellationToken,
        query: &str,
        limit: Option<usize>,
    ) -> Result<QueryResult>;

    /// Insert rows with [`DEFAULT_BATCH_SIZE`] rows per transaction.
    async fn insert_data(
        &self,
        cancel: &CancellationToken,
        table: &str,
        rows: &[DataRow],
    ) -> Result<u64> {
        self.bulk_insert(cancel, table, rows, DEFAULT_BATCH_SIZE)
            .await
    }

    /// Insert rows in chunks of `batch_size`, one transaction per chunk.
    ///
    /// The column list comes from the first row. A failing chunk is rolled
    /// back and aborts the call; earlier chunks stay committed. Returns the
    /// number of rows inserted.
    async fn bulk_insert(
        &self,
        cancel: &CancellationToken,
        table: &str,
        rows: &[DataRow],
        batch_size: usize,
    ) -> Result<u64>;

    // ===== Utility =====

    /// Stable engine identifier (e.g. "postgres").
    fn database_type(&self) -> &str;

    /// Quote an identifier for this dialect.
    fn escape_identifier(&self, name: &str) -> String;

    /// Parameterized INSERT with one placeholder per column, in order.
    fn build_insert_query(&self, table: &str, columns: &[String]) -> String;
}

/// Rows per chunk for a bulk insert of `len` rows.
///
/// A `batch_size` of zero, or one at least as large as the input, collapses
/// to a single chunk.
pub fn effective_batch_size(len: usize, batch_size: usize) -> usize {
    if batch_size == 0 || batch_size >= len {
        len.max(1)
    } else {
        batch_size
    }
}

/// Sizes of the chunks a bulk insert of `len` rows is split into.
pub fn chunk_sizes(len: usize, batch_size: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    let size = effective_batch_size(len, batch_size);
    (0..len).step_by(size).map(|start| size.min(len - start)).collect()
}

/// Column list for a bulk insert, taken from the first row only.
pub fn insert_columns(rows: &[DataRow]) -> Vec<String> {
    rows.first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default()
}

/// Race `fut` against the cancellation token.
///
/// The losing future is dropped; any transaction it held is rolled back by
/// its own drop.
pub async fn cancellable<F, T>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(MigrateError::Cancelled),
        res = fut => res,
    }
}
