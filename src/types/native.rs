//! Native type string parsing and the shared default mapping table.
//!
//! Catalogs report types as free-form strings: `varchar(255)`,
//! `numeric(10, 2)`, `int(10) unsigned`, `timestamp(6) with time zone`,
//! `integer[]`. [`NativeType::parse`] splits those into a normalized base name,
//! its parameters and the flags that matter for mapping.

use std::sync::LazyLock;

use regex::Regex;

use super::{Annotation, BaseType, TypeTag};

static NATIVE_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*([a-z_][a-z0-9_ ]*)\s*(?:\(([^)]*)\))?\s*([a-z ]*?)\s*((?:\[\])*)\s*$")
        .expect("native type pattern is valid")
});

/// A parsed native type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeType {
    /// The string as reported by the catalog.
    pub raw: String,
    /// Lowercase base name with single spaces (`character varying`).
    pub name: String,
    /// Parenthesised parameters, trimmed (`["10", "2"]`).
    pub params: Vec<String>,
    /// `[]` suffix.
    pub array: bool,
    /// `unsigned` modifier.
    pub unsigned: bool,
}

impl NativeType {
    /// Parse a native type string. Returns `None` for empty or malformed input.
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = NATIVE_TYPE.captures(raw)?;

        let mut unsigned = false;
        let words: Vec<String> = caps
            .get(1)
            .map(|m| m.as_str())
            .into_iter()
            .chain(caps.get(3).map(|m| m.as_str()))
            .flat_map(|part| part.split_whitespace())
            .map(|w| w.to_lowercase())
            .filter(|w| match w.as_str() {
                "unsigned" => {
                    unsigned = true;
                    false
                }
                "signed" | "zerofill" => false,
                _ => true,
            })
            .collect();

        if words.is_empty() {
            return None;
        }

        let params = caps
            .get(2)
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let array = caps.get(4).is_some_and(|m| !m.as_str().is_empty());

        Some(Self {
            raw: raw.trim().to_string(),
            name: words.join(" "),
            params,
            array,
            unsigned,
        })
    }

    /// Numeric value of the parameter at `idx`, ignoring trailing words
    /// (Oracle `varchar2(20 byte)`).
    pub fn numeric_param(&self, idx: usize) -> Option<u32> {
        self.params
            .get(idx)
            .and_then(|p| p.split_whitespace().next())
            .and_then(|p| p.parse().ok())
    }

    /// Build a base type for `tag`, carrying over constraints and flags.
    pub fn to_base(&self, tag: TypeTag) -> BaseType {
        let base = match tag {
            TypeTag::String | TypeTag::Binary => {
                BaseType::new(tag).with_max_length(self.numeric_param(0))
            }
            TypeTag::Decimal => {
                BaseType::new(tag).with_precision(self.numeric_param(0), self.numeric_param(1))
            }
            other => BaseType::new(other),
        };
        self.flag(base)
    }

    /// Apply the array and unsigned flags to an already built base type.
    pub fn flag(&self, mut base: BaseType) -> BaseType {
        if self.array {
            base = base.annotate(Annotation::Array);
        }
        if self.unsigned {
            base = base.annotate(Annotation::Unsigned);
        }
        base
    }
}

/// Shared mapping from normalized base names to portable tags.
///
/// Consulted after the dialect override table.
pub fn default_tag(name: &str) -> Option<TypeTag> {
    let tag = match name {
        "int" | "integer" | "int2" | "int4" | "int8" | "smallint" | "bigint" | "tinyint"
        | "mediumint" | "serial" | "bigserial" | "smallserial" => TypeTag::Integer,

        "real" | "float" | "float4" | "float8" | "double" | "double precision" => TypeTag::Float,

        "decimal" | "numeric" | "number" => TypeTag::Decimal,

        "text" | "varchar" | "char" | "character" | "character varying" | "nvarchar"
        | "nchar" | "string" | "clob" | "citext" => TypeTag::String,

        "date" => TypeTag::Date,

        "time" | "timetz" | "time without time zone" | "time with time zone" => TypeTag::Time,

        "timestamp" | "timestamptz" | "datetime" | "datetime2" | "smalldatetime"
        | "timestamp without time zone" | "timestamp with time zone" => TypeTag::Timestamp,

        "bool" | "boolean" => TypeTag::Boolean,

        "blob" | "binary" | "varbinary" | "bytea" => TypeTag::Binary,

        "json" | "jsonb" => TypeTag::Json,

        "uuid" => TypeTag::Custom("uuid".to_string()),

        _ => return None,
    };
    Some(tag)
}
