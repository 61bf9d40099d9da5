//! Live database gateways.
//!
//! A gateway implements [`CatalogReader`](crate::catalog::CatalogReader) and,
//! where supported, [`QueryExecutor`](crate::query::QueryExecutor) over a
//! database driver. Every query a gateway issues is reported to its
//! [`QueryObserver`](crate::observer::QueryObserver).

#[cfg(feature = "postgres")]
mod postgres;
mod sqlite;

#[cfg(feature = "postgres")]
pub use postgres::PgGateway;
pub use sqlite::SqliteGateway;

use tracing::debug;

use crate::catalog::CatalogReader;
use crate::config::{ConnectionSettings, SettingsError};
use crate::dialect::Dialect;
use crate::error::Result;

/// Open a catalog reader for the configured connection.
///
/// The URL is env-expanded first. SQLite takes a file path or `:memory:`;
/// PostgreSQL needs the `postgres` feature. MySQL and Oracle have no gateway.
pub async fn connect(settings: &ConnectionSettings) -> Result<Box<dyn CatalogReader>> {
    let dialect = settings.dialect()?;
    let url = settings.resolved_url()?;
    debug!(dialect = %dialect, "opening catalog connection");

    match dialect {
        Dialect::Sqlite => Ok(Box::new(SqliteGateway::open(&url)?)),
        #[cfg(feature = "postgres")]
        Dialect::Postgres => Ok(Box::new(PgGateway::connect(&url).await?)),
        #[cfg(not(feature = "postgres"))]
        Dialect::Postgres => Err(SettingsError::InvalidConfig(
            "postgres connections need the `postgres` feature".into(),
        )
        .into()),
        Dialect::MySql | Dialect::Oracle => Err(SettingsError::InvalidConfig(format!(
            "no gateway for dialect {}",
            dialect
        ))
        .into()),
    }
}
