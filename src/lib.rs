//! # relmap
//!
//! Catalog-driven schema and association inference for SQL databases.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          Catalog Reader (SQLite, PostgreSQL, fixture)    │
//! │  (columns, primary keys, foreign keys, indexes)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [type mapper]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Schema (typed attributes)               │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [association resolver]
//! ┌─────────────────────────────────────────────────────────┐
//! │       ResolvedAssociation (qualified join paths)         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [eager loading]
//! ┌─────────────────────────────────────────────────────────┐
//! │           Preload queries + nested tuples                │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! [`Setup`] drives the first three stages at configuration time, so every
//! declared association is validated before any query runs.

pub mod association;
pub mod catalog;
pub mod config;
pub mod dialect;
pub mod error;
pub mod gateway;
pub mod observer;
pub mod query;
pub mod schema;
pub mod setup;
pub mod types;


/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::association::{
        resolve, AssociationIntent, AssociationKind, JoinKey, JoinStep, RelationRef,
        ResolvedAssociation,
    };
    pub use crate::catalog::{CatalogReader, ColumnDescriptor, StaticCatalog, TableDescriptor};
    pub use crate::config::Settings;
    pub use crate::dialect::Dialect;
    pub use crate::error::{Error, Result};
    pub use crate::query::{QueryExecutor, SelectQuery, Tuple};
    pub use crate::schema::{Attribute, QualifiedName, Schema, SchemaInferrer, SchemaSet};
    pub use crate::setup::{Configuration, Setup};
    pub use crate::types::{AttributeType, BaseType, FallbackPolicy, TypeMapper, TypeTag};
}

pub use dialect::Dialect;
pub use error::{Error, Result};
pub use setup::{Configuration, Setup};
