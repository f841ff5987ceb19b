//! PostgreSQL implementation of [`DatabaseAdapter`].

use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use tokio_postgres::{Config as PgConfig, NoTls};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Span};

use crate::config::ConnectionConfig;
use crate::core::schema::{assemble_table_schema, ForeignKeySchema, TableSchema};
use crate::core::traits::{cancellable, effective_batch_size, insert_columns, DatabaseAdapter};
use crate::core::value::{DataRow, QueryResult};
use crate::drivers::common::{SslMode, TlsBuilder};
use crate::error::{MigrateError, Result};

use super::dialect::PostgresDialect;
use super::{reader, writer};

/// Schema used when the connection config does not name one.
pub const DEFAULT_SCHEMA: &str = "public";

const DEFAULT_MAX_CONNECTIONS: usize = 4;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// PostgreSQL adapter backed by a deadpool connection pool.
///
/// The pool is created by [`DatabaseAdapter::connect`]; every other I/O call
/// fails with a connection error until then.
pub struct PostgresAdapter {
    config: ConnectionConfig,
    schema: String,
    dialect: PostgresDialect,
    pool: Option<Pool>,
    span: Span,
}

impl PostgresAdapter {
    pub fn new(config: ConnectionConfig) -> Self {
        let span = info_span!(
            "postgres",
            host = %config.host,
            port = config.port,
            database = %config.database
        );
        let schema = config
            .schema
            .clone()
            .unwrap_or_else(|| DEFAULT_SCHEMA.to_string());

        Self {
            config,
            schema,
            dialect: PostgresDialect::new(),
            pool: None,
            span,
        }
    }

    /// Replace the span events are recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Schema introspection and `list_tables` are scoped to.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn dialect(&self) -> &PostgresDialect {
        &self.dialect
    }

    fn target(&self) -> String {
        format!(
            "{}:{}/{}",
            self.config.host, self.config.port, self.config.database
        )
    }

    fn pg_config(&self) -> PgConfig {
        let c = &self.config;
        let mut pg = PgConfig::new();
        pg.host(&c.host)
            .port(c.port)
            .dbname(&c.database)
            .user(&c.username)
            .password(&c.password)
            .application_name("dbporter")
            .connect_timeout(Duration::from_secs(
                c.extra_or("connect_timeout_secs", DEFAULT_CONNECT_TIMEOUT_SECS),
            ));

        // Unqualified DDL and INSERTs land in the configured schema.
        if let Some(ref schema) = c.schema {
            pg.options(&search_path_option(schema));
        }
        pg
    }

    fn build_pool(&self) -> Result<Pool> {
        let max_size = self
            .config
            .extra_or("max_connections", DEFAULT_MAX_CONNECTIONS)
            .max(1);
        let mgr_config = || ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let tls = TlsBuilder::new(SslMode::from_config(&self.config)?);

        let built = match tls.build()? {
            None => {
                let mgr = Manager::from_config(self.pg_config(), NoTls, mgr_config());
                Pool::builder(mgr).max_size(max_size).build()
            }
            Some(connector) => {
                let mgr = Manager::from_config(self.pg_config(), connector, mgr_config());
                Pool::builder(mgr).max_size(max_size).build()
            }
        };

        debug!(
            parent: &self.span,
            max_size,
            ssl_mode = %tls.ssl_mode(),
            "building connection pool"
        );
        built.map_err(|e| MigrateError::connection(format!("building pool for {}", self.target()), e))
    }

    fn pool(&self) -> Result<&Pool> {
        self.pool.as_ref().ok_or_else(|| {
            MigrateError::connection(self.target(), "adapter is not connected")
        })
    }

    async fn client(&self, purpose: &str) -> Result<Object> {
        self.pool()?
            .get()
            .await
            .map_err(|e| MigrateError::connection(format!("{} ({})", purpose, self.target()), e))
    }

    async fn add_foreign_key(&self, table: &str, fk: &ForeignKeySchema) -> Result<()> {
        let client = self.client("add foreign key").await?;
        let sql = self.dialect.build_add_foreign_key(table, fk);
        writer::execute_ddl(&client, "add foreign key", &fk.name, &sql).await?;
        debug!(parent: &self.span, table, constraint = %fk.name, "added foreign key");
        Ok(())
    }
}

#[async_trait]
impl DatabaseAdapter for PostgresAdapter {
    async fn connect(&mut self, cancel: &CancellationToken) -> Result<()> {
        let pool = self.build_pool()?;
        let target = self.target();

        cancellable(cancel, async {
            let client = pool
                .get()
                .await
                .map_err(|e| MigrateError::connection(format!("connecting to {}", target), e))?;
            client
                .simple_query("SELECT 1")
                .await
                .map_err(|e| MigrateError::connection(format!("verifying {}", target), e))?;
            Ok(())
        })
        .await?;

        info!(parent: &self.span, schema = %self.schema, "connected to {}", target);
        self.pool = Some(pool);
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close();
            debug!(parent: &self.span, "connection pool closed");
        }
    }

    async fn ping(&self, cancel: &CancellationToken) -> Result<()> {
        cancellable(cancel, async {
            let client = self.client("ping").await?;
            client
                .simple_query("SELECT 1")
                .await
                .map_err(|e| MigrateError::connection(format!("ping {}", self.target()), e))?;
            Ok(())
        })
        .await
    }

    async fn list_tables(&self, cancel: &CancellationToken) -> Result<Vec<String>> {
        cancellable(cancel, async {
            let client = self.client("list tables").await?;
            reader::list_tables(&client, &self.schema).await
        })
        .await
    }

    async fn get_table_schema(
        &self,
        cancel: &CancellationToken,
        table: &str,
    ) -> Result<TableSchema> {
        cancellable(cancel, async {
            let client = self.client("introspect table").await?;

            let columns = reader::load_columns(&client, &self.schema, table).await?;
            if columns.is_empty() {
                return Err(MigrateError::introspection(
                    table,
                    format!("table does not exist in schema '{}'", self.schema),
                ));
            }
            let pk = reader::load_primary_key(&client, &self.schema, table).await?;
            let fks = reader::load_foreign_keys(&client, &self.schema, table).await?;

            let schema = assemble_table_schema(table, columns, &pk, fks);
            debug!(
                parent: &self.span,
                table,
                columns = schema.columns.len(),
                primary_key = ?schema.primary_key(),
                foreign_keys = schema.foreign_keys.len(),
                "introspected table"
            );
            Ok(schema)
        })
        .await
    }

    async fn get_foreign_keys(
        &self,
        cancel: &CancellationToken,
        table: &str,
    ) -> Result<Vec<ForeignKeySchema>> {
        cancellable(cancel, async {
            let client = self.client("load foreign keys").await?;
            reader::load_foreign_keys(&client, &self.schema, table).await
        })
        .await
    }

    async fn create_table(&self, cancel: &CancellationToken, schema: &TableSchema) -> Result<()> {
        schema
            .validate()
            .map_err(|e| MigrateError::ddl("create table", &schema.name, e))?;

        cancellable(cancel, async {
            let client = self.client("create table").await?;
            let statements = create_table_statements(&self.dialect, schema);

            for (i, (object, sql)) in statements.iter().enumerate() {
                let operation = if i == 0 { "create table" } else { "add foreign key" };
                writer::execute_ddl(&client, operation, object, sql).await?;
                debug!(parent: &self.span, table = %schema.name, object = %object, "{}", operation);
            }
            Ok(())
        })
        .await
    }

    async fn create_foreign_key(
        &self,
        cancel: &CancellationToken,
        table: &str,
        fk: &ForeignKeySchema,
    ) -> Result<()> {
        cancellable(cancel, self.add_foreign_key(table, fk)).await
    }

    async fn drop_foreign_key(
        &self,
        cancel: &CancellationToken,
        table: &str,
        constraint: &str,
    ) -> Result<()> {
        cancellable(cancel, async {
            let client = self.client("drop foreign key").await?;
            let sql = self.dialect.build_drop_constraint(table, constraint);
            writer::execute_ddl(&client, "drop constraint", constraint, &sql).await?;
            debug!(parent: &self.span, table, constraint, "dropped constraint");
            Ok(())
        })
        .await
    }

    async fn drop_table(&self, cancel: &CancellationToken, table: &str) -> Result<()> {
        cancellable(cancel, async {
            let client = self.client("drop table").await?;
            let sql = self.dialect.build_drop_table(table);
            writer::execute_ddl(&client, "drop table", table, &sql).await?;
            debug!(parent: &self.span, table, "dropped table");
            Ok(())
        })
        .await
    }

    async fn fetch_data(
        &self,
        cancel: &CancellationToken,
        query: &str,
        limit: Option<usize>,
    ) -> Result<QueryResult> {
        let sql = self.dialect.apply_limit(query, limit);

        cancellable(cancel, async {
            let client = self.client("fetch data").await?;
            let result = reader::fetch_rows(&client, &sql).await?;
            debug!(parent: &self.span, rows = result.count, "fetched rows");
            Ok(result)
        })
        .await
    }

    async fn bulk_insert(
        &self,
        cancel: &CancellationToken,
        table: &str,
        rows: &[DataRow],
        batch_size: usize,
    ) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let columns = insert_columns(rows);
        let query = self.dialect.build_insert_query(table, &columns);
        let chunk_size = effective_batch_size(rows.len(), batch_size);
        let pool = self.pool()?;

        let mut inserted = 0u64;
        for (chunk, chunk_rows) in rows.chunks(chunk_size).enumerate() {
            let n = cancellable(
                cancel,
                writer::insert_chunk(pool, table, chunk, &query, &columns, chunk_rows),
            )
            .await?;
            inserted += n;
            debug!(parent: &self.span, table, chunk, rows = n, total = inserted, "chunk committed");
        }

        Ok(inserted)
    }

    fn database_type(&self) -> &str {
        self.dialect.name()
    }

    fn escape_identifier(&self, name: &str) -> String {
        self.dialect.quote_ident(name)
    }

    fn build_insert_query(&self, table: &str, columns: &[String]) -> String {
        self.dialect.build_insert_query(table, columns)
    }
}

/// Statements `create_table` runs in order, each with the object it creates:
/// `CREATE TABLE` without any foreign key clause, then one
/// `ALTER TABLE ... ADD CONSTRAINT` per foreign key. The table stays in place
/// when a later statement fails.
fn create_table_statements<'s>(
    dialect: &PostgresDialect,
    schema: &'s TableSchema,
) -> Vec<(&'s str, String)> {
    let mut statements = vec![(schema.name.as_str(), dialect.build_create_table(schema))];
    for fk in constraint_list(schema) {
        statements.push((fk.name.as_str(), dialect.build_add_foreign_key(&schema.name, fk)));
    }
    statements
}

/// Foreign keys to add after `CREATE TABLE`: the table-level list, plus any
/// key attached only to a column.
fn constraint_list(schema: &TableSchema) -> Vec<&ForeignKeySchema> {
    let mut fks: Vec<&ForeignKeySchema> = schema.foreign_keys.iter().collect();
    for fk in schema.columns.iter().filter_map(|c| c.foreign_key.as_ref()) {
        if !fks.iter().any(|existing| existing.name == fk.name) {
            fks.push(fk);
        }
    }
    fks
}

/// Startup `options` value that pins `search_path` to `schema`.
///
/// The server splits `options` on unescaped whitespace, so spaces and
/// backslashes in the quoted name are escaped.
fn search_path_option(schema: &str) -> String {
    let quoted = crate::core::identifier::quote_with(schema, '"');
    format!(
        "-c search_path={}",
        quoted.replace('\\', "\\\\").replace(' ', "\\ ")
    )
}
