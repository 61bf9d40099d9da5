//! Eager loading of associated tuples.
//!
//! One preload query per association loads the children of a whole batch of
//! parents. The query selects the target attributes plus the near-side key,
//! joins the path back to the first hop and filters that key with `IN`:
//!
//! ```text
//! SELECT contracts.*, ean_stats.ean_id AS ean_id
//! FROM contracts
//! INNER JOIN contract_ean_stats ON contract_ean_stats.contract_id = contracts.id
//! INNER JOIN ean_stats ON ean_stats.id = contract_ean_stats.ean_stat_id
//! WHERE ean_stats.ean_id IN (?, ?)
//! ```
//!
//! [`nest`] then attaches children to parents by matching the key values.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::debug;

use super::{JoinKey, ResolvedAssociation};
use crate::error::{Error, Result};
use crate::query::{QueryExecutor, SelectQuery, Tuple};

/// A preload query and the keys that connect its rows to parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadQuery {
    pub query: SelectQuery,
    /// Attribute read from parent tuples.
    pub parent_key: String,
    /// Output column of child tuples matched against `parent_key`.
    pub child_key: String,
}

/// The near-side join key of `assoc` and the output name of its child side.
fn near_key(assoc: &ResolvedAssociation) -> Result<(&JoinKey, String)> {
    let near = assoc.near_key().ok_or_else(|| Error::Query {
        message: format!("association '{}' has an empty join path", assoc.name),
        source: None,
    })?;

    let on_target = near.right.relation == assoc.target.name();
    let child_key = if on_target || !assoc.target_schema.contains(&near.right.attribute) {
        near.right.attribute.clone()
    } else {
        format!("{}_{}", near.right.relation, near.right.attribute)
    };

    Ok((near, child_key))
}

/// Build the preload query for `key_count` distinct parent keys.
pub fn preload_query(assoc: &ResolvedAssociation, key_count: usize) -> Result<PreloadQuery> {
    let (near, child_key) = near_key(assoc)?;

    let target = &assoc.target;
    let mut query = SelectQuery::new().from(&target.relation, target.alias.as_deref());

    for attribute in assoc.target_schema.attributes() {
        query = query.column_as(target.qualify(&attribute.name), &attribute.name);
    }
    if near.right.relation != target.name() {
        query = query.column_as(near.right.clone(), &child_key);
    }

    for step in assoc.path.iter().skip(1).rev() {
        let on = step
            .keys
            .iter()
            .map(|key| (key.left.clone(), key.right.clone()))
            .collect();
        query = query.join(&step.left.relation, step.left.alias.as_deref(), on);
    }

    Ok(PreloadQuery {
        query: query.where_in(near.right.clone(), key_count),
        parent_key: near.left.attribute.clone(),
        child_key,
    })
}

/// Load the children of `parents` for `assoc` and nest them.
///
/// Runs a single query for all distinct, non-null parent keys; none when
/// there are no keys.
pub async fn load(
    executor: &dyn QueryExecutor,
    assoc: &ResolvedAssociation,
    parents: Vec<Tuple>,
) -> Result<Vec<Tuple>> {
    let parent_key = near_key(assoc)?.0.left.attribute.clone();

    let mut seen = HashSet::new();
    let keys: Vec<Value> = parents
        .iter()
        .filter_map(|parent| parent.get(parent_key.as_str()))
        .filter(|value| !value.is_null() && seen.insert(value.to_string()))
        .cloned()
        .collect();

    if keys.is_empty() {
        return nest(assoc, parents, Vec::new());
    }

    let preload = preload_query(assoc, keys.len())?;
    let children = executor.fetch(&preload.query, &keys).await?;

    debug!(
        association = %assoc.name,
        parents = parents.len(),
        keys = keys.len(),
        children = children.len(),
        "preloaded association"
    );

    nest(assoc, parents, children)
}

/// Attach `children` to `parents` under the association name.
///
/// Collections nest as a list (empty when a parent has no children); singular
/// associations nest as a tuple or `null`. Parent order is kept and children
/// keep the order they arrived in.
pub fn nest(assoc: &ResolvedAssociation, parents: Vec<Tuple>, children: Vec<Tuple>) -> Result<Vec<Tuple>> {
    let (near, child_key) = near_key(assoc)?;
    let parent_key = &near.left.attribute;

    let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
    for child in children {
        let Some(key) = child.get(&child_key).filter(|v| !v.is_null()) else {
            continue;
        };
        grouped
            .entry(key.to_string())
            .or_default()
            .push(Value::Object(child));
    }

    let nested = parents
        .into_iter()
        .map(|mut parent| {
            let matches = parent
                .get(parent_key)
                .filter(|v| !v.is_null())
                .and_then(|key| grouped.get(&key.to_string()));

            let value = match (assoc.kind.is_collection(), matches) {
                (true, Some(list)) => Value::Array(list.clone()),
                (true, None) => Value::Array(Vec::new()),
                (false, Some(list)) => list.first().cloned().unwrap_or(Value::Null),
                (false, None) => Value::Null,
            };
            parent.insert(assoc.name.clone(), value);
            parent
        })
        .collect();

    Ok(nested)
}
