//! Relation name inflection for key conventions.
//!
//! Association keys follow the `<singular>_id` convention. Only the last
//! snake_case segment of a relation name is inflected, so `contract_ean_stats`
//! keys as `contract_ean_stat_id`.

use inflector::Inflector;

/// Plurals the `inflector` rules get wrong for common table names.
fn irregular_singular(word: &str) -> Option<&'static str> {
    let singular = match word {
        "people" | "person" => "person",
        "children" | "child" => "child",
        "men" | "man" => "man",
        "women" | "woman" => "woman",
        "statuses" | "status" => "status",
        "addresses" | "address" => "address",
        "analyses" | "analysis" => "analysis",
        "criteria" | "criterion" => "criterion",
        "data" | "datum" => "datum",
        "media" | "medium" => "medium",
        "indices" | "indexes" | "index" => "index",
        "matrices" | "matrix" => "matrix",
        "vertices" | "vertex" => "vertex",
        _ => return None,
    };
    Some(singular)
}

/// Singularize the last word of a snake_case relation name.
pub fn singularize(name: &str) -> String {
    let (head, last) = match name.rfind('_') {
        Some(pos) => name.split_at(pos + 1),
        None => ("", name),
    };
    if last.is_empty() {
        return name.to_string();
    }

    match irregular_singular(&last.to_lowercase()) {
        Some(singular) => format!("{}{}", head, singular),
        None => format!("{}{}", head, last.to_singular()),
    }
}

/// Conventional foreign key attribute referencing `relation`.
pub fn foreign_key_name(relation: &str) -> String {
    format!("{}_id", singularize(relation))
}
