//! Foreign key graph over a set of schemas.
//!
//! Nodes are relations, edges point from the referencing relation to the
//! referenced one and carry the referencing attribute. A relation with two
//! foreign keys to the same target (`positions.manager_id` and
//! `positions.participant_id` both referencing `employees`) gets two parallel
//! edges.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::schema::SchemaSet;

/// Directed graph of catalog foreign keys.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    graph: DiGraph<String, String>,
    index: HashMap<String, NodeIndex>,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from the foreign key metadata of `schemas`.
    ///
    /// Referenced relations that are not part of the set still get a node.
    pub fn from_schemas(schemas: &SchemaSet) -> Self {
        let mut graph = Self::new();
        for schema in schemas.iter() {
            graph.node(schema.relation());
        }
        for schema in schemas.iter() {
            for attribute in schema.foreign_keys() {
                if let Some(target) = &attribute.meta.foreign_key {
                    graph.add_reference(schema.relation(), &attribute.name, target);
                }
            }
        }
        graph
    }

    fn node(&mut self, relation: &str) -> NodeIndex {
        if let Some(idx) = self.index.get(relation) {
            return *idx;
        }
        let idx = self.graph.add_node(relation.to_string());
        self.index.insert(relation.to_string(), idx);
        idx
    }

    /// Record that `from.attribute` references `to`.
    pub fn add_reference(&mut self, from: &str, attribute: &str, to: &str) {
        let from_idx = self.node(from);
        let to_idx = self.node(to);
        self.graph.add_edge(from_idx, to_idx, attribute.to_string());
    }

    pub fn contains(&self, relation: &str) -> bool {
        self.index.contains_key(relation)
    }

    /// Attributes of `from` that reference `to`, in schema order.
    pub fn references(&self, from: &str, to: &str) -> Vec<&str> {
        let (Some(&from_idx), Some(&to_idx)) = (self.index.get(from), self.index.get(to)) else {
            return Vec::new();
        };

        // edge indices follow insertion order, which is schema order
        let mut edges: Vec<_> = self
            .graph
            .edges_connecting(from_idx, to_idx)
            .map(|edge| (edge.id(), edge.weight().as_str()))
            .collect();
        edges.sort_unstable_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, attribute)| attribute).collect()
    }

    /// Every `(relation, attribute)` that references `to`.
    pub fn referenced_by(&self, to: &str) -> Vec<(&str, &str)> {
        let Some(&to_idx) = self.index.get(to) else {
            return Vec::new();
        };

        let mut refs: Vec<(&str, &str)> = self
            .graph
            .edges_directed(to_idx, Direction::Incoming)
            .map(|edge| (self.graph[edge.source()].as_str(), edge.weight().as_str()))
            .collect();
        refs.sort_unstable();
        refs
    }

    /// Relations directly connected to `relation` by a foreign key in either direction.
    pub fn neighbors(&self, relation: &str) -> Vec<&str> {
        let Some(&idx) = self.index.get(relation) else {
            return Vec::new();
        };

        let mut names: Vec<&str> = self
            .graph
            .neighbors_undirected(idx)
            .map(|n| self.graph[n].as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn relation_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn reference_count(&self) -> usize {
        self.graph.edge_count()
    }
}
