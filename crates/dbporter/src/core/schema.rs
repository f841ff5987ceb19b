//! Schema metadata types for tables, columns, indexes, and foreign keys.
//!
//! These types are a portable description of a single table, rebuilt from the
//! catalog on every introspection call and handed from a source adapter to a
//! destination adapter.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,

    /// Column definitions in physical order.
    pub columns: Vec<ColumnSchema>,

    /// Indexes. Carried for completeness; no adapter populates or recreates
    /// them yet.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexSchema>,

    /// Outgoing foreign key constraints.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKeySchema>,
}

impl TableSchema {
    /// Create an empty table description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Primary key column names in column order.
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Check if the table has a primary key.
    pub fn has_pk(&self) -> bool {
        self.columns.iter().any(|c| c.primary_key)
    }

    /// Look up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Check structural invariants.
    ///
    /// Column names must be pairwise distinct and every foreign key must name
    /// a local column that exists in this table.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.columns.len());
        for col in &self.columns {
            if !seen.insert(col.name.as_str()) {
                return Err(MigrateError::Config(format!(
                    "table {} has duplicate column {}",
                    self.name, col.name
                )));
            }
        }

        for fk in &self.foreign_keys {
            if !seen.contains(fk.column.as_str()) {
                return Err(MigrateError::Config(format!(
                    "foreign key {} on {} references unknown local column {}",
                    fk.name, self.name, fk.column
                )));
            }
        }

        Ok(())
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,

    /// Engine-native type string (e.g. "integer", "character varying(255)").
    #[serde(rename = "type")]
    pub data_type: String,

    /// Whether the column allows NULL.
    pub nullable: bool,

    /// Whether the column is part of the primary key.
    pub primary_key: bool,

    /// Default expression, passed through to DDL verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,

    /// Foreign key whose local column is this one.
    ///
    /// A lookup copy of an entry in [`TableSchema::foreign_keys`]. When a
    /// column has several outgoing keys only the last one seen is kept here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeySchema>,
}

impl ColumnSchema {
    /// Create a nullable, non-key column.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            primary_key: false,
            default_value: None,
            foreign_key: None,
        }
    }

    /// Mark the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark the column as a primary key member (implies NOT NULL).
    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Set the default expression.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default_value = Some(default.into());
        self
    }
}

/// Foreign key metadata (single column).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeySchema {
    /// Constraint name.
    pub name: String,

    /// Local column name.
    pub column: String,

    /// Referenced table name.
    pub referenced_table: String,

    /// Referenced column name.
    pub referenced_column: String,

    /// ON DELETE action, as reported by the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,

    /// ON UPDATE action, as reported by the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
}

/// Index metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    /// Index name.
    pub name: String,

    /// Indexed column names.
    pub columns: Vec<String>,

    /// Whether the index is unique.
    pub unique: bool,
}

/// Merge the three introspection results into one [`TableSchema`].
///
/// Columns whose name is in `pk_columns` get their primary-key flag set, and
/// each foreign key is attached to the column it originates from. A column
/// with more than one outgoing key keeps only the last one (the full list is
/// still available in [`TableSchema::foreign_keys`]).
pub fn assemble_table_schema(
    name: &str,
    mut columns: Vec<ColumnSchema>,
    pk_columns: &HashSet<String>,
    foreign_keys: Vec<ForeignKeySchema>,
) -> TableSchema {
    for col in &mut columns {
        col.primary_key = pk_columns.contains(&col.name);
    }

    for fk in &foreign_keys {
        if let Some(col) = columns.iter_mut().find(|c| c.name == fk.column) {
            col.foreign_key = Some(fk.clone());
        }
    }

    TableSchema {
        name: name.to_string(),
        columns,
        indexes: Vec::new(),
        foreign_keys,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fk(name: &str, column: &str, ref_table: &str) -> ForeignKeySchema {
        ForeignKeySchema {
            name: name.to_string(),
            column: column.to_string(),
            referenced_table: ref_table.to_string(),
            referenced_column: "id".to_string(),
            on_delete: Some("CASCADE".to_string()),
            on_update: None,
        }
    }

    fn users_columns() -> Vec<ColumnSchema> {
        vec![
            ColumnSchema::new("id", "integer").not_null(),
            ColumnSchema::new("name", "text").not_null(),
            ColumnSchema::new("email", "text"),
        ]
    }

    #[test]
    fn test_assemble_marks_primary_key() {
        let pk: HashSet<String> = ["id".to_string()].into_iter().collect();
        let table = assemble_table_schema("users", users_columns(), &pk, vec![]);

        assert_eq!(table.columns.len(), 3);
        assert!(table.column("id").unwrap().primary_key);
        assert!(!table.column("name").unwrap().nullable);
        assert!(table.column("email").unwrap().nullable);
        assert_eq!(table.primary_key(), vec!["id"]);
    }

    #[test]
    fn test_assemble_pk_flags_match_catalog_set() {
        let pk: HashSet<String> = ["name".to_string(), "id".to_string()].into_iter().collect();
        let table = assemble_table_schema("users", users_columns(), &pk, vec![]);

        let flagged: HashSet<String> = table
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(flagged, pk);
        // Composite key is reported in column order, not set order
        assert_eq!(table.primary_key(), vec!["id", "name"]);
    }

    #[test]
    fn test_assemble_attaches_foreign_keys() {
        let columns = vec![
            ColumnSchema::new("id", "integer").primary(),
            ColumnSchema::new("order_id", "integer"),
        ];
        let fks = vec![fk("items_order_fk", "order_id", "orders")];
        let table = assemble_table_schema("items", columns, &HashSet::new(), fks);

        assert_eq!(table.foreign_keys.len(), 1);
        let attached = table.column("order_id").unwrap().foreign_key.as_ref().unwrap();
        assert_eq!(attached.referenced_table, "orders");
        assert!(table.column("id").unwrap().foreign_key.is_none());
    }

    #[test]
    fn test_assemble_multiple_fks_on_one_column_last_wins() {
        let columns = vec![ColumnSchema::new("ref_id", "integer")];
        let fks = vec![fk("fk_a", "ref_id", "alpha"), fk("fk_b", "ref_id", "beta")];
        let table = assemble_table_schema("t", columns, &HashSet::new(), fks);

        assert_eq!(table.foreign_keys.len(), 2);
        let attached = table.column("ref_id").unwrap().foreign_key.as_ref().unwrap();
        assert_eq!(attached.name, "fk_b");
    }

    #[test]
    fn test_validate_rejects_duplicate_columns() {
        let mut table = TableSchema::new("t");
        table.columns = vec![ColumnSchema::new("a", "int"), ColumnSchema::new("a", "text")];
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_fk_on_missing_column() {
        let mut table = TableSchema::new("t");
        table.columns = vec![ColumnSchema::new("a", "int")];
        table.foreign_keys = vec![fk("fk", "missing", "other")];
        assert!(table.validate().is_err());

        table.foreign_keys = vec![fk("fk", "a", "other")];
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_serde_field_names() {
        let col = ColumnSchema::new("id", "integer").primary();
        let json = serde_json::to_value(&col).unwrap();
        assert_eq!(json["type"], "integer");
        assert_eq!(json["primary_key"], true);
        assert!(json.get("default_value").is_none());
    }
}
