//! # dbporter
//!
//! Move a relational table's schema and rows from one database to another.
//!
//! The library is built around the [`DatabaseAdapter`] contract:
//!
//! - **Introspection** rebuilds a portable [`TableSchema`] from catalog metadata
//! - **DDL** recreates that schema on another instance
//! - **Batched inserts** load rows with one transaction per chunk
//!
//! [`Migrator`] drives two adapters through schema fetch, optional
//! recreation, data fetch and data load for a single table.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dbporter::{create_adapter, DatabaseAdapter, Migrator, PipelineConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> dbporter::Result<()> {
//! let pipeline = PipelineConfig::load("pipeline.yaml")?;
//! let cancel = CancellationToken::new();
//!
//! let mut source = create_adapter(&pipeline.source)?;
//! let mut destination = create_adapter(&pipeline.destination)?;
//! source.connect(&cancel).await?;
//! destination.connect(&cancel).await?;
//!
//! let migrator = Migrator::new(source, destination);
//! let report = migrator.migrate_table(&cancel, "users", true).await?;
//! println!("Migrated {} rows", report.rows_migrated);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod migrator;

// Re-exports for convenient access
pub use config::{AdapterConfig, ConnectionConfig, PipelineConfig};
pub use crate::core::{
    ColumnSchema, DataRow, DatabaseAdapter, ForeignKeySchema, IndexSchema, QueryResult,
    TableSchema, Value, DEFAULT_BATCH_SIZE,
};
pub use drivers::{create_adapter, PostgresAdapter, SUPPORTED_TYPES};
pub use error::{MigrateError, Result};
pub use migrator::{MigrationReport, Migrator};
