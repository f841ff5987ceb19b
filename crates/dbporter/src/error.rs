//! Error types for the migration library.

use thiserror::Error;

/// Boxed driver error carried as the source of adapter failures.
///
/// Keeps [`MigrateError`] independent of any particular database driver so
/// that every adapter can report its native error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connect, ping or pool checkout failed.
    #[error("Connection error ({context}): {source}")]
    Connection {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Catalog query failed or the table does not exist.
    #[error("Introspection failed for table {table}: {source}")]
    Introspection {
        table: String,
        #[source]
        source: BoxError,
    },

    /// CREATE / ALTER / DROP statement failed.
    #[error("DDL error during {operation} on {object}: {source}")]
    Ddl {
        operation: String,
        object: String,
        #[source]
        source: BoxError,
    },

    /// Read query failed.
    #[error("Data fetch failed for query `{query}`: {source}")]
    DataFetch {
        query: String,
        #[source]
        source: BoxError,
    },

    /// A chunk of the batched insert failed and was rolled back.
    #[error("Insert into {table} failed in chunk {chunk}: {source}")]
    DataInsert {
        table: String,
        chunk: usize,
        #[source]
        source: BoxError,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The caller's cancellation token fired.
    #[error("Operation cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        MigrateError::Connection {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Create an Introspection error
    pub fn introspection(table: impl Into<String>, source: impl Into<BoxError>) -> Self {
        MigrateError::Introspection {
            table: table.into(),
            source: source.into(),
        }
    }

    /// Create a DDL error
    pub fn ddl(
        operation: impl Into<String>,
        object: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        MigrateError::Ddl {
            operation: operation.into(),
            object: object.into(),
            source: source.into(),
        }
    }

    /// Create a DataFetch error
    pub fn data_fetch(query: impl Into<String>, source: impl Into<BoxError>) -> Self {
        MigrateError::DataFetch {
            query: query.into(),
            source: source.into(),
        }
    }

    /// Create a DataInsert error
    pub fn data_insert(table: impl Into<String>, chunk: usize, source: impl Into<BoxError>) -> Self {
        MigrateError::DataInsert {
            table: table.into(),
            chunk,
            source: source.into(),
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Process exit code for this error category.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_)
            | MigrateError::Io(_)
            | MigrateError::Yaml(_)
            | MigrateError::Json(_) => 2,
            MigrateError::Connection { .. } => 3,
            MigrateError::Introspection { .. } | MigrateError::Ddl { .. } => 4,
            MigrateError::DataFetch { .. } | MigrateError::DataInsert { .. } => 5,
            MigrateError::Cancelled => 130,
        }
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
