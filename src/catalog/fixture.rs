//! In-memory catalog.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{CatalogReader, TableDescriptor};
use crate::dialect::Dialect;
use crate::error::{Error, Result};

/// Catalog backed by descriptors held in memory.
///
/// Useful for offline inference from a captured catalog and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    dialect: Dialect,
    tables: BTreeMap<String, TableDescriptor>,
}

impl StaticCatalog {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            tables: BTreeMap::new(),
        }
    }

    /// Add a table, replacing any previous descriptor with the same name.
    #[must_use]
    pub fn with_table(mut self, table: TableDescriptor) -> Self {
        self.insert(table);
        self
    }

    pub fn insert(&mut self, table: TableDescriptor) {
        self.tables.insert(table.name.clone(), table);
    }
}

#[async_trait]
impl CatalogReader for StaticCatalog {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn read(&self, table: &str) -> Result<TableDescriptor> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| Error::SchemaNotFound {
                relation: table.to_string(),
            })
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }
}
