//! Relation schemas.
//!
//! A [`Schema`] is the typed description of one relation: its attributes in
//! catalog order, each with a portable [`AttributeType`] and the catalog
//! metadata the association resolver needs (primary key, foreign key target,
//! index membership).
//!
//! Projection, renaming, prefixing and qualification are methods returning
//! new schemas; a schema is never mutated once inferred.

mod hash;
mod infer;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::AttributeType;

pub use hash::digest;
pub use infer::{AttributeOverrides, SchemaInferrer};

/// A (relation, attribute) pair.
///
/// Used for every column reference in generated joins so identically named
/// columns of joined relations never shadow each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    pub relation: String,
    pub attribute: String,
}

impl QualifiedName {
    pub fn new(relation: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.relation, self.attribute)
    }
}

/// Catalog metadata attached to an attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeMeta {
    #[serde(default)]
    pub primary_key: bool,
    /// Relation referenced by a single-column foreign key on this attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Leading column of at least one index.
    #[serde(default)]
    pub indexed: bool,
}

/// A typed attribute of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: AttributeType,
    #[serde(default)]
    pub meta: AttributeMeta,
}

impl Attribute {
    pub fn new(name: impl Into<String>, ty: AttributeType) -> Self {
        Self {
            name: name.into(),
            ty,
            meta: AttributeMeta::default(),
        }
    }

    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.meta.primary_key = true;
        self
    }

    #[must_use]
    pub fn foreign_key(mut self, relation: impl Into<String>) -> Self {
        self.meta.foreign_key = Some(relation.into());
        self
    }

    pub fn is_primary_key(&self) -> bool {
        self.meta.primary_key
    }

    /// Check whether this attribute references `relation` through a catalog foreign key.
    pub fn references(&self, relation: &str) -> bool {
        self.meta.foreign_key.as_deref() == Some(relation)
    }
}

/// Ordered set of typed attributes, tagged with its relation name.
///
/// Attribute names are unique; inserting an attribute with an existing name
/// replaces it in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Schema {
    relation: String,
    attributes: Vec<Attribute>,
}

impl Schema {
    pub fn new(relation: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        let mut schema = Self {
            relation: relation.into(),
            attributes: Vec::with_capacity(attributes.len()),
        };
        for attribute in attributes {
            schema.insert(attribute);
        }
        schema
    }

    fn insert(&mut self, attribute: Attribute) {
        match self.attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    /// Primary key attributes in schema order.
    pub fn primary_key(&self) -> Vec<&Attribute> {
        self.attributes.iter().filter(|a| a.is_primary_key()).collect()
    }

    /// The primary key attribute, if the key is a single column.
    pub fn single_primary_key(&self) -> Option<&Attribute> {
        match self.primary_key().as_slice() {
            [key] => Some(*key),
            _ => None,
        }
    }

    /// Attributes carrying a catalog foreign key.
    pub fn foreign_keys(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.meta.foreign_key.is_some())
    }

    /// Attributes whose catalog foreign key references `relation`.
    pub fn foreign_keys_to(&self, relation: &str) -> Vec<&Attribute> {
        self.attributes
            .iter()
            .filter(|a| a.references(relation))
            .collect()
    }

    /// Qualified name of an attribute, if present.
    pub fn qualified(&self, name: &str) -> Option<QualifiedName> {
        self.attribute(name)
            .map(|a| QualifiedName::new(&self.relation, &a.name))
    }

    /// Every attribute qualified with `relation` (an alias or the relation name).
    pub fn qualify(&self, relation: &str) -> Vec<QualifiedName> {
        self.attributes
            .iter()
            .map(|a| QualifiedName::new(relation, &a.name))
            .collect()
    }

    /// Schema restricted to `names`, in the order given. Unknown names are skipped.
    #[must_use]
    pub fn project(&self, names: &[&str]) -> Schema {
        let attributes = names
            .iter()
            .filter_map(|n| self.attribute(n).cloned())
            .collect();
        Schema::new(&self.relation, attributes)
    }

    /// Schema with attributes renamed according to `mapping` (old name -> new name).
    #[must_use]
    pub fn rename(&self, mapping: &HashMap<String, String>) -> Schema {
        let attributes = self
            .attributes
            .iter()
            .map(|a| {
                let mut a = a.clone();
                if let Some(new_name) = mapping.get(&a.name) {
                    a.name = new_name.clone();
                }
                a
            })
            .collect();
        Schema::new(&self.relation, attributes)
    }

    /// Schema with every attribute name prefixed as `<prefix>_<name>`.
    #[must_use]
    pub fn prefix(&self, prefix: &str) -> Schema {
        let mapping = self
            .attributes
            .iter()
            .map(|a| (a.name.clone(), format!("{}_{}", prefix, a.name)))
            .collect();
        self.rename(&mapping)
    }

    /// Schema with the type of `name` replaced, keeping its metadata.
    ///
    /// Returns the schema unchanged when the attribute does not exist.
    #[must_use]
    pub fn with_type(&self, name: &str, ty: AttributeType) -> Schema {
        let mut schema = self.clone();
        if let Some(attr) = schema.attributes.iter_mut().find(|a| a.name == name) {
            attr.ty = ty;
        }
        schema
    }

    /// SHA-256 of the schema's canonical JSON form.
    ///
    /// Two inference runs over an unchanged table produce the same fingerprint.
    pub fn fingerprint(&self) -> String {
        // Schema serialization has no fallible fields (string keys, plain enums).
        digest(self).unwrap_or_default()
    }
}

/// Schemas keyed by relation name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSet {
    schemas: BTreeMap<String, Schema>,
}

impl SchemaSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, schema: Schema) {
        self.schemas.insert(schema.relation.clone(), schema);
    }

    pub fn get(&self, relation: &str) -> Option<&Schema> {
        self.schemas.get(relation)
    }

    pub fn contains(&self, relation: &str) -> bool {
        self.schemas.contains_key(relation)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }
}

impl FromIterator<Schema> for SchemaSet {
    fn from_iter<I: IntoIterator<Item = Schema>>(iter: I) -> Self {
        let mut set = SchemaSet::new();
        for schema in iter {
            set.insert(schema);
        }
        set
    }
}
