//! Configuration loading and validation.
//!
//! The pipeline document names a source and a destination adapter. Each side
//! carries a type tag and an open settings bag that is decoded into the
//! adapter's own configuration (for the relational adapters, a
//! [`ConnectionConfig`]) only when the adapter is built.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl PipelineConfig {
    /// Load a pipeline document.
    ///
    /// Files ending in `.json` are read as JSON; anything else as YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Parse a pipeline document from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a pipeline document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the document.
    pub fn validate(&self) -> Result<()> {
        validation::validate_pipeline(self)
    }
}

impl AdapterConfig {
    /// Decode the settings bag as connection settings.
    pub fn connection(&self) -> Result<ConnectionConfig> {
        ConnectionConfig::from_bag(&self.config)
    }
}

impl ConnectionConfig {
    /// Decode connection settings from an adapter's settings bag.
    pub fn from_bag(bag: &serde_yaml::Mapping) -> Result<Self> {
        let config: ConnectionConfig =
            serde_yaml::from_value(serde_yaml::Value::Mapping(bag.clone()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the connection settings.
    pub fn validate(&self) -> Result<()> {
        validation::validate_connection(self)
    }
}
