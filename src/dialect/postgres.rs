//! PostgreSQL type overrides.
//!
//! PostgreSQL reports `udt_name` style names (`int4`, `timestamptz`, `_int4`
//! for arrays) as well as SQL standard names. Network, text-search and
//! extension types have no portable equivalent and map to `Custom`.

use crate::types::{Annotation, BaseType, NativeType, TypeTag};

pub(super) fn override_type(native: &NativeType) -> Option<BaseType> {
    // udt_name arrays: `_int4` is `int4[]`
    if let Some(element) = native.name.strip_prefix('_') {
        let inner = NativeType {
            name: element.to_string(),
            array: true,
            ..native.clone()
        };
        let base = override_type(&inner)
            .or_else(|| crate::types::native::default_tag(element).map(|tag| inner.to_base(tag)))?;
        return Some(base.annotate(Annotation::Array));
    }

    let base = match native.name.as_str() {
        "jsonb" => native.to_base(TypeTag::Json).annotate(Annotation::Jsonb),
        "timestamptz" | "timestamp with time zone" => native.to_base(TypeTag::Timestamp),
        "bytea" => native.to_base(TypeTag::Binary),
        "serial" | "serial4" | "bigserial" | "serial8" | "smallserial" | "serial2" => {
            native.to_base(TypeTag::Integer)
        }
        "bit" | "bit varying" | "varbit" => native.to_base(TypeTag::Custom("bit".into())),
        "uuid" | "inet" | "cidr" | "macaddr" | "money" | "xml" | "ltree" | "hstore"
        | "tsvector" | "tsquery" | "point" | "line" | "box" | "interval" => {
            native.to_base(TypeTag::Custom(native.name.clone()))
        }
        _ => return None,
    };
    Some(base)
}
