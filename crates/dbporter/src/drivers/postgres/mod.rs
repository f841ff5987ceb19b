//! PostgreSQL driver.
//!
//! - [`PostgresAdapter`]: the [`DatabaseAdapter`](crate::core::DatabaseAdapter) implementation
//! - [`PostgresDialect`]: statement text builders
//!
//! Catalog reads live in `reader`, DDL and batch inserts in `writer`, and
//! the [`Value`](crate::core::Value) wire conversions in `codec`.

mod adapter;
mod codec;
mod dialect;
mod reader;
mod writer;

pub use adapter::{PostgresAdapter, DEFAULT_SCHEMA};
pub use dialect::{native_type, PostgresDialect};
