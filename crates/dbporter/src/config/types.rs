//! Configuration type definitions.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Pipeline document: which adapter reads and which adapter writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Where rows are read from.
    pub source: AdapterConfig,

    /// Where rows are written to.
    pub destination: AdapterConfig,
}

/// One side of a pipeline.
///
/// The type tag picks the adapter variant; the bag is that variant's own
/// configuration and is not interpreted until the adapter is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Adapter type tag (e.g. "postgres").
    #[serde(rename = "type")]
    pub r#type: String,

    /// Adapter-specific settings.
    #[serde(default)]
    pub config: serde_yaml::Mapping,
}

/// Connection settings shared by the relational adapters.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    #[serde(alias = "user")]
    pub username: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// TLS mode: disable, require, verify-ca, verify-full (default: disable).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_mode: Option<String>,

    /// Schema that holds the application tables (adapter default if unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Free-form driver options. Scalar values are stored as strings.
    #[serde(
        default,
        deserialize_with = "scalar_string_map",
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub extra: HashMap<String, String>,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("ssl_mode", &self.ssl_mode)
            .field("schema", &self.schema)
            .field("extra", &self.extra)
            .finish()
    }
}

impl ConnectionConfig {
    /// Read an `extra` option and parse it, falling back to `default`.
    pub fn extra_or<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.extra
            .get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }
}

fn default_pg_port() -> u16 {
    5432
}

/// Accept numbers and booleans in the extension bag alongside strings.
fn scalar_string_map<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: HashMap<String, serde_yaml::Value> = HashMap::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(k, v)| {
            let s = match v {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Null => String::new(),
                other => {
                    return Err(serde::de::Error::custom(format!(
                        "extra.{} must be a scalar, got {:?}",
                        k, other
                    )))
                }
            };
            Ok((k, s))
        })
        .collect()
}
