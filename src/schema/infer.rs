//! Schema inference: catalog reader + type mapper.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::{Attribute, AttributeMeta, Schema, SchemaSet};
use crate::catalog::{CatalogReader, TableDescriptor};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::types::{AttributeType, BaseType, TypeMapper};

/// Per-relation attribute type overrides.
///
/// An override replaces the inferred base type of an attribute. Nullability
/// and catalog metadata still come from the catalog.
#[derive(Debug, Clone, Default)]
pub struct AttributeOverrides {
    by_relation: HashMap<String, BTreeMap<String, BaseType>>,
}

impl AttributeOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, relation: &str, attribute: &str, base: BaseType) {
        self.by_relation
            .entry(relation.to_string())
            .or_default()
            .insert(attribute.to_string(), base);
    }

    #[must_use]
    pub fn with(mut self, relation: &str, attribute: &str, base: BaseType) -> Self {
        self.insert(relation, attribute, base);
        self
    }

    pub fn get(&self, relation: &str, attribute: &str) -> Option<&BaseType> {
        self.by_relation.get(relation)?.get(attribute)
    }

    pub fn is_empty(&self) -> bool {
        self.by_relation.values().all(BTreeMap::is_empty)
    }
}

/// Builds typed schemas from catalog metadata.
///
/// Nothing is cached: every call reads the catalog again, so re-inference
/// after a schema change picks the change up.
#[derive(Debug, Clone, Default)]
pub struct SchemaInferrer {
    mapper: TypeMapper,
    overrides: AttributeOverrides,
}

impl SchemaInferrer {
    pub fn new(mapper: TypeMapper) -> Self {
        Self {
            mapper,
            overrides: AttributeOverrides::default(),
        }
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: AttributeOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn mapper(&self) -> &TypeMapper {
        &self.mapper
    }

    /// Read `table` from the catalog and infer its schema.
    pub async fn infer(&self, reader: &dyn CatalogReader, table: &str) -> Result<Schema> {
        let descriptor = reader.read(table).await?;
        self.build(&descriptor, reader.dialect())
    }

    /// Infer schemas for several tables, reading their catalogs concurrently.
    pub async fn infer_all(&self, reader: &dyn CatalogReader, tables: &[String]) -> Result<SchemaSet> {
        let descriptors = reader.read_batch(tables).await?;
        let dialect = reader.dialect();

        descriptors
            .iter()
            .map(|descriptor| self.build(descriptor, dialect))
            .collect()
    }

    /// Build a schema from an already read table descriptor.
    pub fn build(&self, table: &TableDescriptor, dialect: Dialect) -> Result<Schema> {
        let mut attributes = Vec::with_capacity(table.columns.len());

        for column in &table.columns {
            // An override wins over the native type, even one the mapper rejects.
            let ty = match self.overrides.get(&table.name, &column.name) {
                Some(base) => AttributeType::from_base(base.clone(), column.nullable),
                None => self.mapper.map_in(&table.name, column, dialect)?,
            };

            let foreign_key = table
                .foreign_keys
                .iter()
                .find(|fk| fk.columns.len() == 1 && fk.columns[0] == column.name)
                .map(|fk| fk.referenced_table.clone());

            let indexed = table
                .indexes
                .iter()
                .any(|idx| idx.columns.first() == Some(&column.name));

            attributes.push(Attribute {
                name: column.name.clone(),
                ty,
                meta: AttributeMeta {
                    primary_key: column.primary_key || table.primary_key.contains(&column.name),
                    foreign_key,
                    default: column.default.clone(),
                    indexed,
                },
            });
        }

        debug!(
            relation = %table.name,
            attributes = attributes.len(),
            foreign_keys = table.foreign_keys.len(),
            "inferred schema"
        );

        Ok(Schema::new(&table.name, attributes))
    }
}
