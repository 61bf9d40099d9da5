//! Oracle type overrides.
//!
//! `NUMBER` with a zero scale is an integer. `DATE` carries a time of day.

use crate::types::{BaseType, NativeType, TypeTag};

pub(super) fn override_type(native: &NativeType) -> Option<BaseType> {
    let tag = match native.name.as_str() {
        "number" if native.numeric_param(0).is_some() && native.numeric_param(1).unwrap_or(0) == 0 => {
            TypeTag::Integer
        }
        "number" => TypeTag::Decimal,
        "varchar2" | "nvarchar2" | "nchar" | "nclob" | "long" => TypeTag::String,
        "date" => TypeTag::Timestamp,
        "raw" | "long raw" | "bfile" => TypeTag::Binary,
        "binary_float" | "binary_double" => TypeTag::Float,
        _ => return None,
    };
    Some(native.to_base(tag))
}
