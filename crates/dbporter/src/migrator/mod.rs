//! Single-table migration between two adapters.
//!
//! [`Migrator::migrate_table`] walks one table through four phases:
//!
//! 1. read the source schema
//! 2. optionally drop and recreate the destination table
//! 3. read every source row
//! 4. bulk insert the rows into the destination
//!
//! Phases run strictly in order and the first fatal error stops the run.
//! Chunks committed before a failure stay in the destination.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Span};

use crate::core::{DatabaseAdapter, DEFAULT_BATCH_SIZE};
use crate::error::Result;

/// Outcome of one successful [`Migrator::migrate_table`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Table that was migrated.
    pub table: String,

    /// Rows inserted into the destination.
    pub rows_migrated: u64,

    /// Whether the destination table was dropped and recreated.
    pub recreated: bool,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Wall-clock duration in seconds.
    pub duration_seconds: f64,
}

impl MigrationReport {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Moves tables from a source adapter to a destination adapter.
///
/// Both adapters must already be connected.
pub struct Migrator {
    source: Box<dyn DatabaseAdapter>,
    destination: Box<dyn DatabaseAdapter>,
    batch_size: usize,
    span: Span,
}

impl Migrator {
    pub fn new(source: Box<dyn DatabaseAdapter>, destination: Box<dyn DatabaseAdapter>) -> Self {
        let span = info_span!(
            "migrator",
            source = source.database_type(),
            destination = destination.database_type()
        );
        Self {
            source,
            destination,
            batch_size: DEFAULT_BATCH_SIZE,
            span,
        }
    }

    /// Replace the span events are recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Rows per insert transaction. Zero means one transaction for all rows.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn source(&self) -> &dyn DatabaseAdapter {
        self.source.as_ref()
    }

    pub fn destination(&self) -> &dyn DatabaseAdapter {
        self.destination.as_ref()
    }

    /// Give the adapters back, e.g. to close them.
    pub fn into_adapters(self) -> (Box<dyn DatabaseAdapter>, Box<dyn DatabaseAdapter>) {
        (self.source, self.destination)
    }

    /// Copy one table's schema (when `recreate` is set) and rows.
    ///
    /// # Errors
    ///
    /// Fails on the first fatal error of any phase. A failed drop during
    /// recreation is only logged, since the table may not exist yet.
    pub async fn migrate_table(
        &self,
        cancel: &CancellationToken,
        table: &str,
        recreate: bool,
    ) -> Result<MigrationReport> {
        let started_at = Utc::now();
        let timer = Instant::now();

        info!(parent: &self.span, table, recreate, "reading source schema");
        let schema = self.source.get_table_schema(cancel, table).await?;

        if recreate {
            info!(parent: &self.span, table, "recreating destination table");
            if let Err(e) = self.destination.drop_table(cancel, table).await {
                warn!(parent: &self.span, table, error = %e, "drop failed; continuing with create");
            }
            self.destination.create_table(cancel, &schema).await?;
        }

        let query = format!("SELECT * FROM {}", self.source.escape_identifier(table));
        info!(parent: &self.span, table, "fetching source rows");
        let data = self.source.fetch_data(cancel, &query, None).await?;

        let rows_migrated = if data.is_empty() {
            info!(parent: &self.span, table, "source table is empty; nothing to insert");
            0
        } else {
            info!(
                parent: &self.span,
                table,
                rows = data.count,
                batch_size = self.batch_size,
                "inserting rows"
            );
            self.destination
                .bulk_insert(cancel, table, &data.rows, self.batch_size)
                .await?
        };

        let completed_at = Utc::now();
        let duration_seconds = timer.elapsed().as_secs_f64();
        info!(
            parent: &self.span,
            table,
            rows = rows_migrated,
            duration_seconds,
            "table migrated"
        );

        Ok(MigrationReport {
            table: table.to_string(),
            rows_migrated,
            recreated: recreate,
            started_at,
            completed_at,
            duration_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ColumnSchema, ForeignKeySchema, TableSchema};
    use crate::core::traits::chunk_sizes;
    use crate::core::value::{DataRow, QueryResult, Value};
    use crate::error::MigrateError;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    type CallLog = Arc<Mutex<Vec<String>>>;

    /// In-memory adapter that records every call.
    #[derive(Default)]
    struct RecordingAdapter {
        log: CallLog,
        rows: Vec<DataRow>,
        fail_drop: bool,
        fail_create: bool,
        missing_table: bool,
    }

    impl RecordingAdapter {
        fn record(&self, call: String) {
            self.log.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl DatabaseAdapter for RecordingAdapter {
        async fn connect(&mut self, _cancel: &CancellationToken) -> Result<()> {
            Ok(())
        }

        async fn close(&mut self) {}

        async fn ping(&self, _cancel: &CancellationToken) -> Result<()> {
            Ok(())
        }

        async fn list_tables(&self, _cancel: &CancellationToken) -> Result<Vec<String>> {
            Ok(vec!["users".to_string()])
        }

        async fn get_table_schema(
            &self,
            _cancel: &CancellationToken,
            table: &str,
        ) -> Result<TableSchema> {
            self.record(format!("get_table_schema {}", table));
            if self.missing_table {
                return Err(MigrateError::introspection(table, "table does not exist"));
            }
            let mut schema = TableSchema::new(table);
            schema.columns = vec![
                ColumnSchema::new("id", "integer").primary(),
                ColumnSchema::new("name", "text").not_null(),
            ];
            Ok(schema)
        }

        async fn get_foreign_keys(
            &self,
            _cancel: &CancellationToken,
            _table: &str,
        ) -> Result<Vec<ForeignKeySchema>> {
            Ok(Vec::new())
        }

        async fn create_table(
            &self,
            _cancel: &CancellationToken,
            schema: &TableSchema,
        ) -> Result<()> {
            self.record(format!("create_table {}", schema.name));
            if self.fail_create {
                return Err(MigrateError::ddl("create table", &schema.name, "permission denied"));
            }
            Ok(())
        }

        async fn create_foreign_key(
            &self,
            _cancel: &CancellationToken,
            _table: &str,
            _fk: &ForeignKeySchema,
        ) -> Result<()> {
            Ok(())
        }

        async fn drop_foreign_key(
            &self,
            _cancel: &CancellationToken,
            _table: &str,
            _constraint: &str,
        ) -> Result<()> {
            Ok(())
        }

        async fn drop_table(&self, _cancel: &CancellationToken, table: &str) -> Result<()> {
            self.record(format!("drop_table {}", table));
            if self.fail_drop {
                return Err(MigrateError::ddl("drop table", table, "does not exist"));
            }
            Ok(())
        }

        async fn fetch_data(
            &self,
            _cancel: &CancellationToken,
            query: &str,
            limit: Option<usize>,
        ) -> Result<QueryResult> {
            self.record(format!("fetch_data {} {:?}", query, limit));
            Ok(QueryResult::new(
                vec!["id".to_string(), "name".to_string()],
                self.rows.clone(),
            ))
        }

        async fn bulk_insert(
            &self,
            _cancel: &CancellationToken,
            table: &str,
            rows: &[DataRow],
            batch_size: usize,
        ) -> Result<u64> {
            for size in chunk_sizes(rows.len(), batch_size) {
                self.record(format!("insert_chunk {} {}", table, size));
            }
            Ok(rows.len() as u64)
        }

        fn database_type(&self) -> &str {
            "memory"
        }

        fn escape_identifier(&self, name: &str) -> String {
            crate::core::identifier::quote_with(name, '"')
        }

        fn build_insert_query(&self, table: &str, columns: &[String]) -> String {
            format!("INSERT INTO {} ({})", table, columns.join(", "))
        }
    }

    fn rows(n: i32) -> Vec<DataRow> {
        (1..=n)
            .map(|i| {
                let mut row = DataRow::new();
                row.insert("id".to_string(), Value::I32(i));
                row.insert("name".to_string(), Value::from(format!("user{}", i)));
                row
            })
            .collect()
    }

    fn pair(source: RecordingAdapter, destination: RecordingAdapter) -> (Migrator, CallLog, CallLog) {
        let source_log = source.log.clone();
        let destination_log = destination.log.clone();
        let migrator = Migrator::new(Box::new(source), Box::new(destination));
        (migrator, source_log, destination_log)
    }

    fn calls(log: &CallLog) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_migrate_copies_rows_in_default_batches() {
        let source = RecordingAdapter {
            rows: rows(2500),
            ..Default::default()
        };
        let (migrator, source_log, destination_log) = pair(source, RecordingAdapter::default());

        let report = migrator
            .migrate_table(&CancellationToken::new(), "users", false)
            .await
            .unwrap();

        assert_eq!(report.rows_migrated, 2500);
        assert!(!report.recreated);
        assert_eq!(
            calls(&source_log),
            vec!["get_table_schema users", "fetch_data SELECT * FROM \"users\" None"]
        );
        assert_eq!(
            calls(&destination_log),
            vec![
                "insert_chunk users 1000",
                "insert_chunk users 1000",
                "insert_chunk users 500"
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_source_inserts_nothing() {
        let (migrator, _, destination_log) =
            pair(RecordingAdapter::default(), RecordingAdapter::default());

        let report = migrator
            .migrate_table(&CancellationToken::new(), "users", true)
            .await
            .unwrap();

        assert_eq!(report.rows_migrated, 0);
        assert_eq!(
            calls(&destination_log),
            vec!["drop_table users", "create_table users"]
        );
    }

    #[tokio::test]
    async fn test_recreate_tolerates_drop_failure() {
        let source = RecordingAdapter {
            rows: rows(3),
            ..Default::default()
        };
        let destination = RecordingAdapter {
            fail_drop: true,
            ..Default::default()
        };
        let (migrator, _, destination_log) = pair(source, destination);

        let report = migrator
            .migrate_table(&CancellationToken::new(), "users", true)
            .await
            .unwrap();

        assert_eq!(report.rows_migrated, 3);
        assert!(report.recreated);
        assert_eq!(
            calls(&destination_log),
            vec!["drop_table users", "create_table users", "insert_chunk users 3"]
        );
    }

    #[tokio::test]
    async fn test_create_failure_stops_before_fetch() {
        let source = RecordingAdapter {
            rows: rows(3),
            ..Default::default()
        };
        let destination = RecordingAdapter {
            fail_create: true,
            ..Default::default()
        };
        let (migrator, source_log, _) = pair(source, destination);

        let err = migrator
            .migrate_table(&CancellationToken::new(), "users", true)
            .await
            .unwrap_err();

        assert!(matches!(err, MigrateError::Ddl { .. }));
        assert!(calls(&source_log).iter().all(|c| !c.starts_with("fetch_data")));
    }

    #[tokio::test]
    async fn test_missing_source_table_is_fatal() {
        let source = RecordingAdapter {
            missing_table: true,
            ..Default::default()
        };
        let (migrator, source_log, destination_log) = pair(source, RecordingAdapter::default());

        let err = migrator
            .migrate_table(&CancellationToken::new(), "ghost", true)
            .await
            .unwrap_err();

        assert!(matches!(err, MigrateError::Introspection { .. }));
        assert_eq!(calls(&source_log), vec!["get_table_schema ghost"]);
        assert!(calls(&destination_log).is_empty());
    }

    #[tokio::test]
    async fn test_batch_size_at_least_rows_is_one_chunk() {
        let source = RecordingAdapter {
            rows: rows(10),
            ..Default::default()
        };
        let (migrator, _, destination_log) = pair(source, RecordingAdapter::default());
        let migrator = migrator.with_batch_size(10);

        migrator
            .migrate_table(&CancellationToken::new(), "users", false)
            .await
            .unwrap();

        assert_eq!(calls(&destination_log), vec!["insert_chunk users 10"]);
    }
}
