//! Column descriptor to attribute type mapping.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::native::{default_tag, NativeType};
use super::{Annotation, AttributeType, BaseType};
use crate::catalog::ColumnDescriptor;
use crate::dialect::Dialect;
use crate::error::{Error, Result};

/// What to do with a native type that neither the dialect nor the default
/// table knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Fail with `UnknownNativeType`.
    #[default]
    Fail,
    /// Map to `Any`, annotated `Untyped` and with the native type string,
    /// and log a warning.
    Untyped,
}

/// Maps catalog column descriptors to portable attribute types.
///
/// Resolution order for a column:
///
/// 1. no native type: the dialect's untyped column mapping (SQLite only)
/// 2. the dialect override table
/// 3. the shared default table
/// 4. the fallback policy
///
/// Mapping is a pure function of the descriptor, the dialect and the policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeMapper {
    policy: FallbackPolicy,
}

impl TypeMapper {
    pub fn new(policy: FallbackPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Map a column to its attribute type.
    ///
    /// Errors carry an empty relation name; [`map_in`](Self::map_in) fills it.
    pub fn map(&self, column: &ColumnDescriptor, dialect: Dialect) -> Result<AttributeType> {
        let base = self.map_base(column, dialect)?;
        Ok(AttributeType::from_base(base, column.nullable))
    }

    /// Map a column of `relation`, naming the relation in errors.
    pub fn map_in(
        &self,
        relation: &str,
        column: &ColumnDescriptor,
        dialect: Dialect,
    ) -> Result<AttributeType> {
        self.map(column, dialect).map_err(|err| match err {
            Error::UnknownNativeType {
                attribute,
                native_type,
                dialect,
                ..
            } => Error::UnknownNativeType {
                relation: relation.to_string(),
                attribute,
                native_type,
                dialect,
            },
            other => other,
        })
    }

    fn map_base(&self, column: &ColumnDescriptor, dialect: Dialect) -> Result<BaseType> {
        let raw = column.native_type.as_deref().map(str::trim).unwrap_or("");

        if raw.is_empty() {
            return match dialect.untyped_column() {
                Some(base) => Ok(base),
                None => self.fallback(column, dialect, raw),
            };
        }

        let Some(native) = NativeType::parse(raw) else {
            return self.fallback(column, dialect, raw);
        };

        if let Some(base) = dialect.override_type(&native) {
            return Ok(base);
        }

        match default_tag(&native.name) {
            Some(tag) => Ok(native.to_base(tag)),
            None => self.fallback(column, dialect, raw),
        }
    }

    fn fallback(&self, column: &ColumnDescriptor, dialect: Dialect, raw: &str) -> Result<BaseType> {
        match self.policy {
            FallbackPolicy::Fail => Err(Error::UnknownNativeType {
                relation: String::new(),
                attribute: column.name.clone(),
                native_type: raw.to_string(),
                dialect,
            }),
            FallbackPolicy::Untyped => {
                warn!(
                    column = %column.name,
                    native_type = raw,
                    %dialect,
                    "unknown native type, mapping to untyped attribute"
                );
                Ok(BaseType::any().annotate(Annotation::Native(raw.to_string())))
            }
        }
    }
}
