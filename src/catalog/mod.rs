//! Catalog reading.
//!
//! A [`CatalogReader`] queries a database's metadata catalog for one table and
//! returns a normalized, database-agnostic [`TableDescriptor`]. Column order is
//! the order the catalog reports.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        CatalogReader                         │
//! │   read(table)          list_tables()        read_batch()     │
//! └──────────────────────────────────────────────────────────────┘
//!          │                      │                    │
//!          ▼                      ▼                    ▼
//!   SqliteGateway (PRAGMA)  PgGateway (pg_catalog)  StaticCatalog
//! ```
//!
//! Readers issue read-only metadata queries. Transport failures surface as
//! [`Error::Connection`](crate::Error::Connection) and are never retried here.

mod fixture;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::Result;

pub use fixture::StaticCatalog;

/// A column as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Native type string. `None` when the catalog reports no type.
    pub native_type: Option<String>,
    pub nullable: bool,
    /// Default value expression, verbatim.
    pub default: Option<String>,
    pub primary_key: bool,
}

impl ColumnDescriptor {
    /// A non-null column of the given native type.
    pub fn new(name: impl Into<String>, native_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native_type: Some(native_type.into()),
            nullable: false,
            default: None,
            primary_key: false,
        }
    }

    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDescriptor {
    pub columns: Vec<String>,
    pub referenced_table: String,
    /// Empty when the constraint references the primary key implicitly.
    pub referenced_columns: Vec<String>,
}

/// An index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

/// Complete catalog metadata for a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    /// Primary key columns in key order.
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
    pub indexes: Vec<IndexDescriptor>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        let primary_key = columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect();
        Self {
            name: name.into(),
            columns,
            primary_key,
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Add a single-column foreign key.
    #[must_use]
    pub fn foreign_key(mut self, column: &str, table: &str, referenced: &str) -> Self {
        self.foreign_keys.push(ForeignKeyDescriptor {
            columns: vec![column.to_string()],
            referenced_table: table.to_string(),
            referenced_columns: vec![referenced.to_string()],
        });
        self
    }

    #[must_use]
    pub fn index(mut self, name: &str, columns: &[&str], unique: bool) -> Self {
        self.indexes.push(IndexDescriptor {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique,
        });
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Trait for reading table metadata from a database catalog.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Dialect of the underlying database.
    fn dialect(&self) -> Dialect;

    /// Read complete metadata for a table.
    ///
    /// Fails with `SchemaNotFound` if the table does not exist.
    async fn read(&self, table: &str) -> Result<TableDescriptor>;

    /// List the user tables visible to this reader.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Read the columns of a table in catalog order.
    async fn read_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        Ok(self.read(table).await?.columns)
    }

    /// Batch read multiple tables.
    ///
    /// Default implementation reads tables concurrently using `join_all`
    /// and fails with the first error in input order.
    async fn read_batch(&self, tables: &[String]) -> Result<Vec<TableDescriptor>> {
        let futures: Vec<_> = tables.iter().map(|table| self.read(table)).collect();

        let results = futures::future::join_all(futures).await;

        results.into_iter().collect()
    }
}
