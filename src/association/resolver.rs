//! Association resolution.
//!
//! Key selection for a link between relations `a` and `b`, where the key may
//! live on either side:
//!
//! 1. an explicit override (`foreign_key` for the first link, `target_key` for
//!    the last link of a through chain)
//! 2. the naming convention `<singular(other)>_id`
//! 3. a unique catalog foreign key to the other relation
//!
//! Several catalog candidates with no override is an ambiguity error, even
//! when one of them matches the convention. A key of an intermediate relation
//! that anchors one of its links is excluded from the other.
//!
//! The join relation of a single-hop through association must carry exactly
//! two catalog foreign keys unless both ends are overridden.

use std::collections::HashSet;

use tracing::debug;

use super::graph::RelationGraph;
use super::inflection::foreign_key_name;
use super::{AssociationIntent, AssociationKind, JoinKey, JoinStep, RelationRef, ResolvedAssociation};
use crate::error::{Error, Result};
use crate::schema::{Attribute, Schema, SchemaSet};

/// Resolve `intents` against `schemas`.
///
/// The output has one entry per intent, in input order. The first failure
/// aborts resolution. Relations repeated within a path are aliased
/// `<relation>_<n>`, `n` counting up from 1 across the whole call.
pub fn resolve(schemas: &SchemaSet, intents: &[AssociationIntent]) -> Result<Vec<ResolvedAssociation>> {
    let graph = RelationGraph::from_schemas(schemas);
    let mut resolver = Resolver {
        schemas,
        graph: &graph,
        next_alias: 1,
    };

    intents.iter().map(|intent| resolver.resolve(intent)).collect()
}

/// Which side of a link holds the key.
enum KeySide {
    /// The right relation references the left one's primary key.
    Right(String),
    /// The left relation references the right one's primary key.
    Left(String),
}

struct Resolver<'a> {
    schemas: &'a SchemaSet,
    graph: &'a RelationGraph,
    next_alias: usize,
}

impl<'a> Resolver<'a> {
    fn resolve(&mut self, intent: &AssociationIntent) -> Result<ResolvedAssociation> {
        let label = intent.label();

        match (intent.kind, intent.through.is_empty()) {
            (AssociationKind::HasManyThrough, true) => {
                return Err(Error::InvalidAssociation {
                    association: label,
                    message: "has_many_through needs at least one through relation".into(),
                });
            }
            (AssociationKind::HasManyThrough, false) | (_, true) => {}
            (kind, false) => {
                return Err(Error::InvalidAssociation {
                    association: label,
                    message: format!("{} does not take through relations", kind),
                });
            }
        }

        let names: Vec<&str> = std::iter::once(intent.source.as_str())
            .chain(intent.through.iter().map(String::as_str))
            .chain(std::iter::once(intent.target.as_str()))
            .collect();

        let chain = names
            .iter()
            .map(|name| self.schema(name))
            .collect::<Result<Vec<&Schema>>>()?;
        let refs = self.alias_path(&names);

        let path = match intent.kind {
            AssociationKind::BelongsTo => {
                let key = self.required_key(&label, chain[0], chain[1], intent.foreign_key.as_deref())?;
                vec![self.step(&label, &chain, &refs, 0, KeySide::Left(key))?]
            }
            AssociationKind::HasMany | AssociationKind::HasOne => {
                let key = self.required_key(&label, chain[1], chain[0], intent.foreign_key.as_deref())?;
                vec![self.step(&label, &chain, &refs, 0, KeySide::Right(key))?]
            }
            AssociationKind::HasManyThrough => self.through_path(&label, intent, &chain, &refs)?,
        };

        debug!(
            association = %label,
            kind = %intent.kind,
            hops = path.len(),
            "resolved association"
        );

        let last = chain.len() - 1;
        Ok(ResolvedAssociation {
            name: intent.name().to_string(),
            kind: intent.kind,
            source: refs[0].clone(),
            target: refs[last].clone(),
            path,
            source_schema: chain[0].clone(),
            target_schema: chain[last].clone(),
            through: chain[1..last].iter().map(|s| (*s).clone()).collect(),
        })
    }

    fn schema(&self, relation: &str) -> Result<&'a Schema> {
        self.schemas.get(relation).ok_or_else(|| Error::SchemaNotFound {
            relation: relation.to_string(),
        })
    }

    /// Relation references for a path, aliasing repeated occurrences.
    fn alias_path(&mut self, names: &[&str]) -> Vec<RelationRef> {
        let mut seen = HashSet::new();
        names
            .iter()
            .map(|name| {
                if seen.insert(*name) {
                    RelationRef::new(*name)
                } else {
                    let alias = format!("{}_{}", name, self.next_alias);
                    self.next_alias += 1;
                    RelationRef::aliased(*name, alias)
                }
            })
            .collect()
    }

    /// Key on `holder` referencing `referenced` for a direct association.
    fn required_key(
        &self,
        label: &str,
        holder: &Schema,
        referenced: &Schema,
        override_key: Option<&str>,
    ) -> Result<String> {
        if let Some(key) = override_key {
            return match holder.contains(key) {
                true => Ok(key.to_string()),
                false => Err(Error::ForeignKeyNotFound {
                    association: label.to_string(),
                    relation: holder.relation().to_string(),
                    attribute: key.to_string(),
                }),
            };
        }

        self.candidate_key(label, holder, referenced.relation(), &HashSet::new())?
            .ok_or_else(|| Error::ForeignKeyNotFound {
                association: label.to_string(),
                relation: holder.relation().to_string(),
                attribute: foreign_key_name(referenced.relation()),
            })
    }

    /// The key of `holder` pointing at `referenced`, if exactly one qualifies.
    fn candidate_key(
        &self,
        label: &str,
        holder: &Schema,
        referenced: &str,
        excluded: &HashSet<String>,
    ) -> Result<Option<String>> {
        let candidates: Vec<&str> = self
            .graph
            .references(holder.relation(), referenced)
            .into_iter()
            .filter(|attribute| !excluded.contains(*attribute))
            .collect();

        if candidates.len() > 1 {
            return Err(Error::AmbiguousAssociation {
                association: label.to_string(),
                relation: holder.relation().to_string(),
                candidates: candidates.iter().map(|c| c.to_string()).collect(),
            });
        }

        let convention = foreign_key_name(referenced);
        if holder.contains(&convention) && !excluded.contains(&convention) {
            return Ok(Some(convention));
        }

        Ok(candidates.first().map(|key| key.to_string()))
    }

    /// A single-hop join relation with catalog foreign keys needs exactly two
    /// of them unless both ends are overridden.
    fn check_join_relation(&self, label: &str, intent: &AssociationIntent, join: &Schema) -> Result<()> {
        if intent.through.len() != 1 || (intent.foreign_key.is_some() && intent.target_key.is_some()) {
            return Ok(());
        }

        let keys: Vec<&str> = join
            .attributes()
            .iter()
            .filter(|attr| attr.meta.foreign_key.is_some())
            .map(|attr| attr.name.as_str())
            .collect();

        match keys.len() {
            0 | 2 => Ok(()),
            n => Err(Error::InvalidAssociation {
                association: label.to_string(),
                message: format!(
                    "through relation '{}' has {} foreign keys ({}); expected two, or both foreign_key and target_key",
                    join.relation(),
                    n,
                    keys.join(", ")
                ),
            }),
        }
    }

    fn through_path(
        &self,
        label: &str,
        intent: &AssociationIntent,
        chain: &[&Schema],
        refs: &[RelationRef],
    ) -> Result<Vec<JoinStep>> {
        let links = chain.len() - 1;
        self.check_join_relation(label, intent, chain[1])?;

        let mut used: Vec<HashSet<String>> = vec![HashSet::new(); chain.len()];
        let mut path = Vec::with_capacity(links);

        // The far-side override is held back so earlier links cannot take it.
        let far_key = intent.target_key.as_deref();
        if let Some(key) = far_key {
            if chain[links - 1].contains(key) {
                used[links - 1].insert(key.to_string());
            }
        }

        for i in 0..links {
            let override_key = if i == 0 {
                intent.foreign_key.as_deref()
            } else if i == links - 1 {
                if let Some(key) = far_key {
                    used[i].remove(key);
                }
                far_key
            } else {
                None
            };

            let side = self.link(label, chain[i], chain[i + 1], override_key, &used[i], &used[i + 1])?;
            match &side {
                KeySide::Right(key) => used[i + 1].insert(key.clone()),
                KeySide::Left(key) => used[i].insert(key.clone()),
            };
            path.push(self.step(label, chain, refs, i, side)?);
        }

        Ok(path)
    }

    /// Decide which side of the link `left -> right` holds the key.
    fn link(
        &self,
        label: &str,
        left: &Schema,
        right: &Schema,
        override_key: Option<&str>,
        left_used: &HashSet<String>,
        right_used: &HashSet<String>,
    ) -> Result<KeySide> {
        if let Some(key) = override_key {
            if right.contains(key) && !right_used.contains(key) {
                return Ok(KeySide::Right(key.to_string()));
            }
            if left.contains(key) && !left_used.contains(key) {
                return Ok(KeySide::Left(key.to_string()));
            }
            return Err(Error::ForeignKeyNotFound {
                association: label.to_string(),
                relation: right.relation().to_string(),
                attribute: key.to_string(),
            });
        }

        if let Some(key) = self.candidate_key(label, right, left.relation(), right_used)? {
            return Ok(KeySide::Right(key));
        }
        if let Some(key) = self.candidate_key(label, left, right.relation(), left_used)? {
            return Ok(KeySide::Left(key));
        }

        Err(Error::ForeignKeyNotFound {
            association: label.to_string(),
            relation: right.relation().to_string(),
            attribute: foreign_key_name(left.relation()),
        })
    }

    /// Build the join step between `chain[i]` and `chain[i + 1]`.
    fn step(
        &self,
        label: &str,
        chain: &[&Schema],
        refs: &[RelationRef],
        i: usize,
        side: KeySide,
    ) -> Result<JoinStep> {
        let (left, right) = (chain[i], chain[i + 1]);

        let (left_attr, right_attr) = match &side {
            KeySide::Right(key) => (primary_key(label, left)?, attribute(label, right, key)?),
            KeySide::Left(key) => (attribute(label, left, key)?, primary_key(label, right)?),
        };

        let key = JoinKey {
            left: refs[i].qualify(&left_attr.name),
            right: refs[i + 1].qualify(&right_attr.name),
        };

        let (left_tag, right_tag) = (left_attr.ty.tag(), right_attr.ty.tag());
        if !left_tag.is_comparable_with(right_tag) {
            return Err(Error::IncompatibleJoinKeys {
                association: label.to_string(),
                left: key.left,
                right: key.right,
                left_type: left_attr.ty.to_string(),
                right_type: right_attr.ty.to_string(),
            });
        }

        Ok(JoinStep {
            left: refs[i].clone(),
            right: refs[i + 1].clone(),
            keys: vec![key],
        })
    }
}

fn primary_key<'s>(label: &str, schema: &'s Schema) -> Result<&'s Attribute> {
    schema
        .single_primary_key()
        .ok_or_else(|| Error::MissingPrimaryKey {
            association: label.to_string(),
            relation: schema.relation().to_string(),
        })
}

fn attribute<'s>(label: &str, schema: &'s Schema, name: &str) -> Result<&'s Attribute> {
    schema.attribute(name).ok_or_else(|| Error::ForeignKeyNotFound {
        association: label.to_string(),
        relation: schema.relation().to_string(),
        attribute: name.to_string(),
    })
}
