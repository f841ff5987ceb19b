//! PostgreSQL SQL dialect.
//!
//! Pure text builders for every statement the adapter emits. Identifiers are
//! always quoted; default expressions and referential actions are written as
//! the catalog reported them.

use crate::core::identifier::quote_with;
use crate::core::schema::{ForeignKeySchema, TableSchema};

/// PostgreSQL dialect.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    pub fn new() -> Self {
        Self
    }

    pub fn name(&self) -> &'static str {
        "postgres"
    }

    /// Double-quote an identifier, doubling embedded quotes.
    pub fn quote_ident(&self, name: &str) -> String {
        quote_with(name, '"')
    }

    /// 1-based positional parameter.
    pub fn param_placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    /// `INSERT INTO "t" ("a", "b") VALUES ($1, $2)`.
    pub fn build_insert_query(&self, table: &str, columns: &[String]) -> String {
        let cols: Vec<String> = columns.iter().map(|c| self.quote_ident(c)).collect();
        let params: Vec<String> = (1..=columns.len())
            .map(|i| self.param_placeholder(i))
            .collect();

        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.quote_ident(table),
            cols.join(", "),
            params.join(", ")
        )
    }

    /// Single `CREATE TABLE` statement with an inline composite primary key.
    pub fn build_create_table(&self, schema: &TableSchema) -> String {
        let mut defs: Vec<String> = schema
            .columns
            .iter()
            .map(|col| {
                let mut def = format!("{} {}", self.quote_ident(&col.name), col.data_type);
                if !col.nullable {
                    def.push_str(" NOT NULL");
                }
                if let Some(ref default) = col.default_value {
                    def.push_str(" DEFAULT ");
                    def.push_str(default);
                }
                def
            })
            .collect();

        let pk: Vec<String> = schema
            .primary_key()
            .into_iter()
            .map(|c| self.quote_ident(c))
            .collect();
        if !pk.is_empty() {
            defs.push(format!("PRIMARY KEY ({})", pk.join(", ")));
        }

        format!(
            "CREATE TABLE {} (\n    {}\n)",
            self.quote_ident(&schema.name),
            defs.join(",\n    ")
        )
    }

    /// `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY ... REFERENCES ...`.
    pub fn build_add_foreign_key(&self, table: &str, fk: &ForeignKeySchema) -> String {
        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote_ident(table),
            self.quote_ident(&fk.name),
            self.quote_ident(&fk.column),
            self.quote_ident(&fk.referenced_table),
            self.quote_ident(&fk.referenced_column)
        );

        if let Some(action) = fk.on_delete.as_deref().and_then(referential_action) {
            sql.push_str(" ON DELETE ");
            sql.push_str(action);
        }
        if let Some(action) = fk.on_update.as_deref().and_then(referential_action) {
            sql.push_str(" ON UPDATE ");
            sql.push_str(action);
        }
        sql
    }

    pub fn build_drop_constraint(&self, table: &str, constraint: &str) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_ident(table),
            self.quote_ident(constraint)
        )
    }

    pub fn build_drop_table(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote_ident(table))
    }

    /// Append ` LIMIT n` for a positive limit; `None` and `Some(0)` leave the
    /// query untouched.
    pub fn apply_limit(&self, query: &str, limit: Option<usize>) -> String {
        match limit {
            Some(n) if n > 0 => format!("{} LIMIT {}", query, n),
            _ => query.to_string(),
        }
    }
}

/// Normalize a catalog referential action. Unknown actions yield `None` and
/// the clause is left out.
fn referential_action(action: &str) -> Option<&'static str> {
    match action.trim().to_uppercase().replace('_', " ").as_str() {
        "CASCADE" => Some("CASCADE"),
        "SET NULL" => Some("SET NULL"),
        "SET DEFAULT" => Some("SET DEFAULT"),
        "RESTRICT" => Some("RESTRICT"),
        "NO ACTION" => Some("NO ACTION"),
        _ => None,
    }
}

/// Rebuild a declarable type string from `information_schema.columns`.
///
/// Arrays and user-defined types use `udt_name`; character types carry their
/// length and `numeric` its precision and scale when declared.
pub fn native_type(
    data_type: &str,
    udt_name: &str,
    char_length: Option<i32>,
    numeric_precision: Option<i32>,
    numeric_scale: Option<i32>,
) -> String {
    match data_type {
        "ARRAY" | "USER-DEFINED" => udt_name.to_string(),
        "character varying" | "character" | "bit" | "bit varying" => match char_length {
            Some(len) if len > 0 => format!("{}({})", data_type, len),
            _ => data_type.to_string(),
        },
        "numeric" => match numeric_precision {
            Some(p) if p > 0 => format!("numeric({},{})", p, numeric_scale.unwrap_or(0)),
            _ => data_type.to_string(),
        },
        _ => data_type.to_string(),
    }
}
