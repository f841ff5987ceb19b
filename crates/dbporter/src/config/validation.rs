//! Configuration validation.

use super::{ConnectionConfig, PipelineConfig};
use crate::core::identifier::validate_identifier;
use crate::drivers::{canonical_type, SslMode, SUPPORTED_TYPES};
use crate::error::{MigrateError, Result};

/// Validate the pipeline document.
pub fn validate_pipeline(config: &PipelineConfig) -> Result<()> {
    for (side, adapter) in [("source", &config.source), ("destination", &config.destination)] {
        if adapter.r#type.trim().is_empty() {
            return Err(MigrateError::Config(format!("{}.type is required", side)));
        }
        if canonical_type(&adapter.r#type).is_none() {
            return Err(MigrateError::Config(format!(
                "{}.type '{}' is not supported. Supported types: {}",
                side,
                adapter.r#type,
                SUPPORTED_TYPES.join(", ")
            )));
        }
    }

    Ok(())
}

/// Validate connection settings.
pub fn validate_connection(config: &ConnectionConfig) -> Result<()> {
    if config.host.is_empty() {
        return Err(MigrateError::Config("host is required".into()));
    }
    if config.database.is_empty() {
        return Err(MigrateError::Config("database is required".into()));
    }
    if config.username.is_empty() {
        return Err(MigrateError::Config("username is required".into()));
    }
    if config.port == 0 {
        return Err(MigrateError::Config("port must be non-zero".into()));
    }
    if let Some(ref mode) = config.ssl_mode {
        SslMode::parse(mode)?;
    }
    if let Some(ref schema) = config.schema {
        validate_identifier(schema)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterConfig;
    use std::collections::HashMap;

    fn valid_connection() -> ConnectionConfig {
        ConnectionConfig {
            host: "127.0.0.1".to_string(),
            port: 5435,
            database: "cms".to_string(),
            username: "postgres".to_string(),
            password: "postgres".to_string(),
            ssl_mode: Some("disable".to_string()),
            schema: None,
            extra: HashMap::new(),
        }
    }

    fn adapter(kind: &str) -> AdapterConfig {
        AdapterConfig {
            r#type: kind.to_string(),
            config: serde_yaml::Mapping::new(),
        }
    }

    #[test]
    fn test_valid_connection() {
        assert!(validate_connection(&valid_connection()).is_ok());
    }

    #[test]
    fn test_missing_host() {
        let mut config = valid_connection();
        config.host = String::new();
        assert!(validate_connection(&config).is_err());
    }

    #[test]
    fn test_invalid_ssl_mode() {
        let mut config = valid_connection();
        config.ssl_mode = Some("sometimes".to_string());
        assert!(validate_connection(&config).is_err());
    }

    #[test]
    fn test_zero_port() {
        let mut config = valid_connection();
        config.port = 0;
        assert!(validate_connection(&config).is_err());
    }

    #[test]
    fn test_connection_debug_redacts_password() {
        let mut config = valid_connection();
        config.password = "super_secret_password_123".to_string();
        let debug_output = format!("{:?}", config);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_password_123"));
    }

    #[test]
    fn test_pipeline_types() {
        let ok = PipelineConfig {
            source: adapter("postgres"),
            destination: adapter("Postgres"),
        };
        assert!(validate_pipeline(&ok).is_ok());

        let unknown = PipelineConfig {
            source: adapter("gsheet"),
            destination: adapter("postgres"),
        };
        assert!(validate_pipeline(&unknown).is_err());

        let empty = PipelineConfig {
            source: adapter("postgres"),
            destination: adapter(" "),
        };
        assert!(validate_pipeline(&empty).is_err());
    }

    #[test]
    fn test_pipeline_from_yaml() {
        let yaml = r#"
source:
  type: postgres
  config:
    host: 127.0.0.1
    port: 5435
    database: cms
    username: postgres
    password: postgres
    ssl_mode: disable
    extra:
      max_connections: 8
destination:
  type: postgres
  config:
    host: 127.0.0.1
    database: cms_copy
    user: postgres
"#;
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.source.r#type, "postgres");

        let source = config.source.connection().unwrap();
        assert_eq!(source.port, 5435);
        assert_eq!(source.extra_or("max_connections", 4usize), 8);

        let destination = config.destination.connection().unwrap();
        assert_eq!(destination.port, 5432);
        assert_eq!(destination.username, "postgres");
        assert_eq!(destination.extra_or("max_connections", 4usize), 4);
    }

    #[test]
    fn test_pipeline_from_json() {
        let json = r#"{
            "source": {"type": "postgres", "config": {"host": "a", "database": "d", "username": "u"}},
            "destination": {"type": "postgres"}
        }"#;
        let config = PipelineConfig::from_json(json).unwrap();
        assert!(config.destination.config.is_empty());
        assert_eq!(config.source.connection().unwrap().host, "a");
        // Empty bag cannot produce connection settings
        assert!(config.destination.connection().is_err());
    }

    #[test]
    fn test_pipeline_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(
            &path,
            r#"{"source": {"type": "postgres"}, "destination": {"type": "postgres"}}"#,
        )
        .unwrap();
        assert!(PipelineConfig::load(&path).is_ok());

        let yaml_path = dir.path().join("pipeline.yaml");
        std::fs::write(&yaml_path, "source:\n  type: postgres\ndestination:\n  type: mysql\n")
            .unwrap();
        assert!(PipelineConfig::load(&yaml_path).is_err());
    }
}
