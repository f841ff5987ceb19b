//! Core abstractions for engine-agnostic table migration.
//!
//! - [`schema`]: table, column, foreign key and index metadata
//! - [`value`]: dynamically typed row values and query results
//! - [`traits`]: the [`DatabaseAdapter`] contract and shared batching helpers
//! - [`identifier`]: identifier validation and quoting
//!
//! Driver modules (`drivers/postgres`) implement the contract; the migrator
//! only ever talks to `dyn DatabaseAdapter`.

pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{assemble_table_schema, ColumnSchema, ForeignKeySchema, IndexSchema, TableSchema};
pub use traits::{DatabaseAdapter, DEFAULT_BATCH_SIZE};
pub use value::{DataRow, QueryResult, Value};
