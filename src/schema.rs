//! Schema catalog: table and column definitions, resolved at
//! expression-construction time.
//!
//! Column references are created through a [`Source`] handle obtained from
//! the [`Schema`], so an unknown table or column fails immediately with a
//! resolution error instead of surfacing later during execution.
//!
//! ```rust
//! use quill_query::{Schema, TableSchema, ColumnType};
//!
//! let mut schema = Schema::new();
//! schema.register(
//!     TableSchema::new("member")
//!         .column("id", ColumnType::Int)
//!         .column("username", ColumnType::Text)
//!         .column("age", ColumnType::Int),
//! );
//!
//! let member = schema.table("member").unwrap();
//! let age = member.col("age").unwrap();
//! assert_eq!(age.to_string(), "member.age");
//!
//! // Aliased handle for self-joins and subqueries.
//! let member_sub = schema.alias("member", "member_sub").unwrap();
//! assert_eq!(member_sub.col("age").unwrap().to_string(), "member_sub.age");
//!
//! assert!(member.col("usrname").is_err());
//! ```

use crate::error::{QueryError, QueryResult};
use crate::expr::Expr;
use crate::types::Identifier;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Column data types known to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// Boolean column.
    Bool,
    /// Integer column.
    Int,
    /// Float column.
    Float,
    /// Text column.
    Text,
    /// JSON column.
    Json,
}

/// Definition of a single table: name plus ordered columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    name: Identifier,
    columns: IndexMap<Identifier, ColumnType>,
}

impl TableSchema {
    /// Create an empty table definition.
    pub fn new(name: impl Into<Identifier>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
        }
    }

    /// Add a column. Declaration order is the select-all order.
    pub fn column(mut self, name: impl Into<Identifier>, ty: ColumnType) -> Self {
        self.columns.insert(name.into(), ty);
        self
    }

    /// The table name.
    pub fn name(&self) -> &Identifier {
        &self.name
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the table has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Positional index of a column, if it exists.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(name)
    }

    /// The column type, if the column exists.
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns.get(name).copied()
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &Identifier> {
        self.columns.keys()
    }
}

/// The catalog of known tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    tables: IndexMap<Identifier, TableSchema>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table definition, replacing any previous definition with
    /// the same name.
    pub fn register(&mut self, table: TableSchema) -> &mut Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Look up a table definition.
    pub fn get(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    /// Obtain a source handle for a table, aliased by its own name.
    pub fn table(&self, name: &str) -> QueryResult<Source> {
        let table = self
            .tables
            .get(name)
            .ok_or_else(|| self.unknown_table(name))?;
        Ok(Source {
            table: table.name.clone(),
            alias: table.name.clone(),
            columns: table.columns.clone(),
        })
    }

    /// Obtain a source handle under an explicit alias, for self-joins and
    /// subqueries over the same table.
    pub fn alias(&self, name: &str, alias: impl Into<Identifier>) -> QueryResult<Source> {
        let table = self
            .tables
            .get(name)
            .ok_or_else(|| self.unknown_table(name))?;
        Ok(Source {
            table: table.name.clone(),
            alias: alias.into(),
            columns: table.columns.clone(),
        })
    }

    /// Registered table definitions, in registration order.
    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.values()
    }

    fn unknown_table(&self, name: &str) -> QueryError {
        let known: Vec<_> = self.tables.keys().map(Identifier::as_str).collect();
        QueryError::unknown_table(name)
            .with_help(format!("Known tables: {}", known.join(", ")))
    }
}

/// A handle to a table under an alias, used to construct resolved column
/// references.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    table: Identifier,
    alias: Identifier,
    columns: IndexMap<Identifier, ColumnType>,
}

impl Source {
    /// The underlying table name.
    pub fn table(&self) -> &Identifier {
        &self.table
    }

    /// The alias this handle binds columns to.
    pub fn alias(&self) -> &Identifier {
        &self.alias
    }

    /// Resolve a column reference, failing if the column does not exist.
    pub fn col(&self, name: &str) -> QueryResult<Expr> {
        match self.columns.get_key_value(name) {
            Some((key, _)) => Ok(Expr::column(self.alias.clone(), key.clone())),
            None => {
                let known: Vec<_> = self.columns.keys().map(Identifier::as_str).collect();
                Err(QueryError::unknown_column(self.table.as_str(), name)
                    .with_help(format!("Columns on '{}': {}", self.table, known.join(", "))))
            }
        }
    }

    /// Column references for every column, in declaration order.
    pub fn all(&self) -> Vec<Expr> {
        self.columns
            .keys()
            .map(|name| Expr::column(self.alias.clone(), name.clone()))
            .collect()
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &Identifier> {
        self.columns.keys()
    }

    /// The column type, if the column exists.
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn member_schema() -> Schema {
        let mut schema = Schema::new();
        schema.register(
            TableSchema::new("member")
                .column("id", ColumnType::Int)
                .column("username", ColumnType::Text)
                .column("age", ColumnType::Int),
        );
        schema
    }

    #[test]
    fn test_resolution_succeeds() {
        let schema = member_schema();
        let member = schema.table("member").unwrap();
        assert_eq!(member.col("username").unwrap().to_string(), "member.username");
    }

    #[test]
    fn test_unknown_table() {
        let schema = member_schema();
        let err = schema.table("membr").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownTable);
    }

    #[test]
    fn test_unknown_column() {
        let schema = member_schema();
        let member = schema.table("member").unwrap();
        let err = member.col("usrname").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownColumn);
        assert!(err.context.help.as_deref().unwrap().contains("username"));
    }

    #[test]
    fn test_alias_binds_columns() {
        let schema = member_schema();
        let sub = schema.alias("member", "member_sub").unwrap();
        assert_eq!(sub.col("age").unwrap().to_string(), "member_sub.age");
        assert_eq!(sub.table().as_str(), "member");
    }

    #[test]
    fn test_all_preserves_declaration_order() {
        let schema = member_schema();
        let member = schema.table("member").unwrap();
        let names: Vec<_> = member.all().iter().map(|e| e.to_string()).collect();
        assert_eq!(names, ["member.id", "member.username", "member.age"]);
    }
}
