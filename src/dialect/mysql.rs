//! MySQL type overrides.
//!
//! `tinyint(1)` is MySQL's boolean. Sized text and blob variants collapse to
//! their portable kind, and `enum(...)` is a string restricted to its members.

use crate::types::{Annotation, BaseType, NativeType, TypeTag};

pub(super) fn override_type(native: &NativeType) -> Option<BaseType> {
    let base = match native.name.as_str() {
        "tinyint" if native.numeric_param(0) == Some(1) => BaseType::new(TypeTag::Boolean),
        "bit" if native.numeric_param(0).unwrap_or(1) == 1 => BaseType::new(TypeTag::Boolean),
        "tinytext" | "mediumtext" | "longtext" => BaseType::new(TypeTag::String),
        "tinyblob" | "mediumblob" | "longblob" => BaseType::new(TypeTag::Binary),
        "year" => BaseType::new(TypeTag::Integer),
        "enum" | "set" => BaseType::new(TypeTag::String).annotate(Annotation::Enum),
        "datetime" | "timestamp" => BaseType::new(TypeTag::Timestamp),
        _ => return None,
    };
    Some(native.flag(base))
}
