//! Association intents and their resolved join specifications.
//!
//! Callers declare [`AssociationIntent`]s (belongs-to, has-one, has-many,
//! has-many-through). [`resolve`] turns each one into a [`ResolvedAssociation`]:
//! a chain of [`JoinStep`]s from the source relation to the target, every join
//! key qualified with the relation (or alias) that owns it.
//!
//! ```text
//! eans ──ean_stats.ean_id = eans.id──▶ ean_stats
//!      ──contract_ean_stats.ean_stat_id = ean_stats.id──▶ contract_ean_stats
//!      ──contract_ean_stats.contract_id = contracts.id──▶ contracts
//! ```
//!
//! Resolution happens once, at configuration time. A resolved association is
//! immutable and only consulted when queries are shaped.

pub mod eager;
pub mod graph;
pub mod inflection;
mod resolver;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::{QualifiedName, Schema};

pub use graph::RelationGraph;
pub use resolver::resolve;

/// Kind of association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    /// The source holds a key referencing the target.
    BelongsTo,
    /// The target holds a key referencing the source; at most one child.
    HasOne,
    /// The target holds a key referencing the source.
    HasMany,
    /// Source and target are linked through a chain of intermediate relations.
    HasManyThrough,
}

impl AssociationKind {
    /// Check whether loaded children nest as a list.
    pub fn is_collection(&self) -> bool {
        matches!(self, AssociationKind::HasMany | AssociationKind::HasManyThrough)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssociationKind::BelongsTo => "belongs_to",
            AssociationKind::HasOne => "has_one",
            AssociationKind::HasMany => "has_many",
            AssociationKind::HasManyThrough => "has_many_through",
        }
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared association, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationIntent {
    /// Relation declaring the association.
    pub source: String,
    pub kind: AssociationKind,
    pub target: String,
    /// Name under which children are nested. Defaults to the target name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Overrides the near-side key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    /// Overrides the far-side key of a through association.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_key: Option<String>,
    /// Intermediate relations, source side first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub through: Vec<String>,
}

impl AssociationIntent {
    pub fn new(source: impl Into<String>, kind: AssociationKind, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind,
            target: target.into(),
            alias: None,
            foreign_key: None,
            target_key: None,
            through: Vec::new(),
        }
    }

    pub fn belongs_to(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(source, AssociationKind::BelongsTo, target)
    }

    pub fn has_one(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(source, AssociationKind::HasOne, target)
    }

    pub fn has_many(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(source, AssociationKind::HasMany, target)
    }

    pub fn has_many_through(
        source: impl Into<String>,
        target: impl Into<String>,
        through: &[&str],
    ) -> Self {
        let mut intent = Self::new(source, AssociationKind::HasManyThrough, target);
        intent.through = through.iter().map(|r| r.to_string()).collect();
        intent
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn foreign_key(mut self, key: impl Into<String>) -> Self {
        self.foreign_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn target_key(mut self, key: impl Into<String>) -> Self {
        self.target_key = Some(key.into());
        self
    }

    /// Name of the association: the alias, or the target relation.
    pub fn name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.target)
    }

    /// `source.name`, used to locate the declaration in error messages.
    pub fn label(&self) -> String {
        format!("{}.{}", self.source, self.name())
    }
}

/// A relation occurrence in a join path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationRef {
    pub relation: String,
    /// Set when the relation already occurs earlier in the path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl RelationRef {
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            alias: None,
        }
    }

    pub fn aliased(relation: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            alias: Some(alias.into()),
        }
    }

    /// Name this occurrence is referenced by in a query.
    pub fn name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.relation)
    }

    pub fn qualify(&self, attribute: &str) -> QualifiedName {
        QualifiedName::new(self.name(), attribute)
    }
}

/// An equality between two qualified attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinKey {
    /// Attribute on the step's left relation.
    pub left: QualifiedName,
    /// Attribute on the step's right relation.
    pub right: QualifiedName,
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}

/// One hop of a join path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinStep {
    /// Relation nearer the source.
    pub left: RelationRef,
    pub right: RelationRef,
    pub keys: Vec<JoinKey>,
}

/// A fully resolved association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAssociation {
    pub name: String,
    pub kind: AssociationKind,
    pub source: RelationRef,
    pub target: RelationRef,
    /// Join steps from source to target. One step for direct associations.
    pub path: Vec<JoinStep>,
    pub source_schema: Schema,
    pub target_schema: Schema,
    /// Intermediate schemas, in path order.
    pub through: Vec<Schema>,
}

impl ResolvedAssociation {
    /// Every join key pair along the path, source side first.
    pub fn join_keys(&self) -> Vec<&JoinKey> {
        self.path.iter().flat_map(|step| step.keys.iter()).collect()
    }

    /// The key of the first hop: left is read from parent tuples, right is
    /// matched against them.
    pub fn near_key(&self) -> Option<&JoinKey> {
        self.path.first().and_then(|step| step.keys.first())
    }

    pub fn is_through(&self) -> bool {
        !self.through.is_empty()
    }
}
