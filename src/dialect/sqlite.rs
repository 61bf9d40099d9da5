//! SQLite type overrides.
//!
//! SQLite accepts any declared type name and derives a column affinity from
//! it. Well-known names are matched exactly first; everything else follows
//! the affinity rules, so `VARYING CHARACTER(10)` or `UNSIGNED BIG INT` still
//! map to a portable type.

use crate::types::{BaseType, NativeType, TypeTag};

pub(super) fn override_type(native: &NativeType) -> Option<BaseType> {
    let exact = match native.name.as_str() {
        "boolean" | "bool" => Some(TypeTag::Boolean),
        "date" => Some(TypeTag::Date),
        "datetime" | "timestamp" => Some(TypeTag::Timestamp),
        "time" => Some(TypeTag::Time),
        "json" => Some(TypeTag::Json),
        "decimal" | "numeric" => Some(TypeTag::Decimal),
        _ => None,
    };

    let tag = exact.or_else(|| affinity(&native.name))?;
    Some(native.to_base(tag))
}

/// Column affinity rules, in SQLite's order of precedence.
fn affinity(name: &str) -> Option<TypeTag> {
    let upper = name.to_uppercase();
    if upper.contains("INT") {
        Some(TypeTag::Integer)
    } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
        Some(TypeTag::String)
    } else if upper.contains("BLOB") {
        Some(TypeTag::Binary)
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        Some(TypeTag::Float)
    } else {
        None
    }
}
