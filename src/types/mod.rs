//! Portable attribute types.
//!
//! Every column read from a catalog is mapped to an [`AttributeType`]: a
//! [`BaseType`] (portable tag, constraints, dialect annotations) optionally
//! wrapped as nullable. The mapping itself lives in [`mapper`]; native type
//! string parsing and the shared default table live in [`native`].
//!
//! ```text
//! ColumnDescriptor { name: "title", native_type: "varchar(80)", nullable: true }
//!         │
//!         ▼ TypeMapper::map(column, Dialect::Postgres)
//! Nullable(BaseType { tag: String, constraints: { max_length: 80 } })
//! ```

pub mod mapper;
pub mod native;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use mapper::{FallbackPolicy, TypeMapper};
pub use native::NativeType;

/// Portable type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    Integer,
    Float,
    Decimal,
    String,
    Date,
    Time,
    /// Date and time of day.
    Timestamp,
    Boolean,
    Binary,
    Json,
    /// Database-specific type with no portable equivalent (e.g. `inet`).
    Custom(String),
    /// Accepts any value. Used for columns the catalog reports without a type.
    Any,
}

impl TypeTag {
    /// Parse a tag from its configuration name.
    ///
    /// Used for attribute overrides in settings (`title = "string"`).
    /// Database-specific types need an explicit `custom:` prefix
    /// (`"custom:uuid"`); any other unknown name is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        let name = s.trim().to_lowercase();
        if let Some(custom) = name.strip_prefix("custom:") {
            let custom = custom.trim();
            return (!custom.is_empty()).then(|| TypeTag::Custom(custom.to_string()));
        }

        let tag = match name.as_str() {
            "integer" | "int" => TypeTag::Integer,
            "float" => TypeTag::Float,
            "decimal" => TypeTag::Decimal,
            "string" | "text" => TypeTag::String,
            "date" => TypeTag::Date,
            "time" => TypeTag::Time,
            "timestamp" | "datetime" => TypeTag::Timestamp,
            "boolean" | "bool" => TypeTag::Boolean,
            "binary" | "blob" => TypeTag::Binary,
            "json" => TypeTag::Json,
            "any" => TypeTag::Any,
            _ => return None,
        };
        Some(tag)
    }

    /// Check whether values of two tags can be compared in a join condition.
    pub fn is_comparable_with(&self, other: &TypeTag) -> bool {
        match (self, other) {
            (TypeTag::Any, _) | (_, TypeTag::Any) => true,
            (TypeTag::Integer, TypeTag::Decimal) | (TypeTag::Decimal, TypeTag::Integer) => true,
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Integer => write!(f, "integer"),
            TypeTag::Float => write!(f, "float"),
            TypeTag::Decimal => write!(f, "decimal"),
            TypeTag::String => write!(f, "string"),
            TypeTag::Date => write!(f, "date"),
            TypeTag::Time => write!(f, "time"),
            TypeTag::Timestamp => write!(f, "timestamp"),
            TypeTag::Boolean => write!(f, "boolean"),
            TypeTag::Binary => write!(f, "binary"),
            TypeTag::Json => write!(f, "json"),
            TypeTag::Custom(name) => write!(f, "custom({})", name),
            TypeTag::Any => write!(f, "any"),
        }
    }
}

/// Size constraints carried over from the native type string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraints {
    /// Maximum length for character and binary types (`varchar(255)`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    /// Total digits for decimal types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    /// Digits after the decimal point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.max_length.is_none() && self.precision.is_none() && self.scale.is_none()
    }
}

/// Dialect-specific annotation on a base type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Annotation {
    /// The catalog reported no type, or the type was unknown and the
    /// untyped fallback policy applied.
    Untyped,
    /// Array of the base type (PostgreSQL `integer[]`).
    Array,
    /// Binary JSON storage (PostgreSQL `jsonb`).
    Jsonb,
    /// Unsigned numeric (MySQL).
    Unsigned,
    /// Enumerated string (MySQL `enum(...)`).
    Enum,
    /// The native type string as reported by the catalog.
    Native(String),
}

/// A portable type with its constraints and annotations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseType {
    pub tag: TypeTag,
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub annotations: BTreeSet<Annotation>,
}

impl BaseType {
    pub fn new(tag: TypeTag) -> Self {
        Self {
            tag,
            constraints: Constraints::default(),
            annotations: BTreeSet::new(),
        }
    }

    /// The untyped escape hatch.
    pub fn any() -> Self {
        Self::new(TypeTag::Any).annotate(Annotation::Untyped)
    }

    #[must_use]
    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.insert(annotation);
        self
    }

    #[must_use]
    pub fn with_max_length(mut self, len: Option<u32>) -> Self {
        self.constraints.max_length = len;
        self
    }

    #[must_use]
    pub fn with_precision(mut self, precision: Option<u32>, scale: Option<u32>) -> Self {
        self.constraints.precision = precision;
        self.constraints.scale = scale;
        self
    }

    pub fn has(&self, annotation: &Annotation) -> bool {
        self.annotations.contains(annotation)
    }

    pub fn is_untyped(&self) -> bool {
        self.has(&Annotation::Untyped)
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)?;
        if self.has(&Annotation::Array) {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

/// Type of a schema attribute.
///
/// `Nullable` is the sum of "absent" and the base type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "nullability", content = "type", rename_all = "snake_case")]
pub enum AttributeType {
    Required(BaseType),
    Nullable(BaseType),
}

impl AttributeType {
    /// Build a type, wrapping it when `nullable` is set.
    pub fn from_base(base: BaseType, nullable: bool) -> Self {
        if nullable {
            AttributeType::Nullable(base)
        } else {
            AttributeType::Required(base)
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, AttributeType::Nullable(_))
    }

    pub fn base(&self) -> &BaseType {
        match self {
            AttributeType::Required(base) | AttributeType::Nullable(base) => base,
        }
    }

    pub fn tag(&self) -> &TypeTag {
        &self.base().tag
    }

    /// The same type without the nullable wrapper.
    #[must_use]
    pub fn non_null(&self) -> AttributeType {
        AttributeType::Required(self.base().clone())
    }

    /// The same type wrapped as nullable.
    #[must_use]
    pub fn optional(&self) -> AttributeType {
        AttributeType::Nullable(self.base().clone())
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::Required(base) => write!(f, "{}", base),
            AttributeType::Nullable(base) => write!(f, "{}?", base),
        }
    }
}
