//! Database driver implementations.
//!
//! - [`postgres`]: PostgreSQL adapter
//! - [`common`]: shared helpers (TLS)
//!
//! # Adding New Databases
//!
//! 1. Create a module under `drivers/` with a type implementing
//!    [`DatabaseAdapter`](crate::core::DatabaseAdapter)
//! 2. Add its type tag (and aliases) to [`canonical_type`] and [`SUPPORTED_TYPES`]
//! 3. Construct it in [`create_adapter`]

pub mod common;
pub mod postgres;

pub use common::{SslMode, TlsBuilder};
pub use postgres::{PostgresAdapter, PostgresDialect};

use crate::config::AdapterConfig;
use crate::core::DatabaseAdapter;
use crate::error::{MigrateError, Result};

/// Canonical adapter type tags accepted in a pipeline document.
pub const SUPPORTED_TYPES: &[&str] = &["postgres"];

/// Map a type tag (case-insensitive, aliases allowed) to its canonical name.
pub fn canonical_type(tag: &str) -> Option<&'static str> {
    match tag.trim().to_lowercase().as_str() {
        "postgres" | "postgresql" | "pg" => Some("postgres"),
        _ => None,
    }
}

/// Build an adapter from one side of a pipeline document.
///
/// The adapter is returned unconnected.
///
/// # Errors
///
/// Returns a config error if the type tag is unknown or the settings bag
/// cannot be decoded for that adapter.
pub fn create_adapter(config: &AdapterConfig) -> Result<Box<dyn DatabaseAdapter>> {
    match canonical_type(&config.r#type) {
        Some("postgres") => Ok(Box::new(PostgresAdapter::new(config.connection()?))),
        _ => Err(MigrateError::Config(format!(
            "unknown database type: '{}'. Supported types: {}",
            config.r#type,
            SUPPORTED_TYPES.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter_config(kind: &str, bag: &str) -> AdapterConfig {
        AdapterConfig {
            r#type: kind.to_string(),
            config: serde_yaml::from_str(bag).unwrap(),
        }
    }

    #[test]
    fn test_canonical_type_aliases() {
        assert_eq!(canonical_type("postgres"), Some("postgres"));
        assert_eq!(canonical_type("PostgreSQL"), Some("postgres"));
        assert_eq!(canonical_type("pg"), Some("postgres"));
        assert_eq!(canonical_type("gsheet"), None);

        for tag in SUPPORTED_TYPES {
            assert_eq!(canonical_type(tag), Some(*tag));
        }
    }

    #[test]
    fn test_create_adapter_postgres() {
        let config = adapter_config("pg", "host: localhost\ndatabase: app\nusername: app\n");
        let adapter = create_adapter(&config).unwrap();
        assert_eq!(adapter.database_type(), "postgres");
        assert_eq!(adapter.escape_identifier("users"), "\"users\"");
    }

    #[test]
    fn test_create_adapter_unknown_type() {
        let config = adapter_config("snowflake", "host: localhost\n");
        let err = create_adapter(&config).err().unwrap();
        assert!(matches!(err, MigrateError::Config(_)));
    }

    #[test]
    fn test_create_adapter_bad_bag() {
        // username missing
        let config = adapter_config("postgres", "host: localhost\ndatabase: app\n");
        assert!(create_adapter(&config).is_err());
    }
}
