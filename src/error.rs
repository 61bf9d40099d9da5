//! Error types for inference and association resolution.

use thiserror::Error;

use crate::config::SettingsError;
use crate::dialect::Dialect;
use crate::schema::QualifiedName;

/// Result type for relmap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed transport error from a connection layer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while reading catalogs, mapping types or resolving associations.
///
/// Everything except `Connection` and `Query` is a configuration error: it points
/// at a declaration that must be fixed, and is reported before any query runs.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure, surfaced unchanged from the connection layer.
    #[error("connection error: {0}")]
    Connection(#[source] BoxError),

    /// A referenced table does not exist.
    #[error("schema not found: '{relation}'")]
    SchemaNotFound { relation: String },

    /// The native type string has no mapping and no fallback policy applies.
    #[error("unknown native type '{native_type}' for {relation}.{attribute} ({dialect})")]
    UnknownNativeType {
        relation: String,
        attribute: String,
        native_type: String,
        dialect: Dialect,
    },

    /// The key an association needs is absent from its relation.
    #[error("foreign key '{attribute}' not found on '{relation}' (association '{association}')")]
    ForeignKeyNotFound {
        association: String,
        relation: String,
        attribute: String,
    },

    /// More than one key qualifies and no override disambiguates.
    #[error(
        "ambiguous association '{association}': '{relation}' has several candidate keys ({}), \
         set foreign_key or target_key",
        .candidates.join(", ")
    )]
    AmbiguousAssociation {
        association: String,
        relation: String,
        candidates: Vec<String>,
    },

    /// Join key attributes have types that cannot be compared.
    #[error(
        "association '{association}' joins {left} ({left_type}) with {right} ({right_type})"
    )]
    IncompatibleJoinKeys {
        association: String,
        left: QualifiedName,
        right: QualifiedName,
        left_type: String,
        right_type: String,
    },

    /// The intent itself is malformed, e.g. a through association with no chain.
    #[error("invalid association '{association}': {message}")]
    InvalidAssociation { association: String, message: String },

    /// The relation on the key side of an association has no primary key.
    #[error("association '{association}' needs a primary key on '{relation}'")]
    MissingPrimaryKey {
        association: String,
        relation: String,
    },

    /// A statement failed while being executed.
    #[error("query failed: {message}")]
    Query {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Settings could not be loaded.
    #[error(transparent)]
    Config(#[from] SettingsError),
}

impl Error {
    /// Wrap a transport error.
    pub fn connection(err: impl Into<BoxError>) -> Self {
        Self::Connection(err.into())
    }

    /// Wrap a statement execution error.
    pub fn query(err: impl Into<BoxError>) -> Self {
        let source = err.into();
        Self::Query {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Check if this error comes from a bad declaration rather than the database.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::Connection(_) | Self::Query { .. })
    }
}
