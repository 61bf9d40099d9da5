//! Query instrumentation.
//!
//! Gateways call an injected [`QueryObserver`] synchronously at every query
//! execution boundary: catalog metadata reads as well as data selects. The
//! observer is built once at startup and shared as `Arc<dyn QueryObserver>`.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::dialect::Dialect;

/// What a query was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Read-only metadata query.
    Catalog,
    /// Data select, e.g. an association preload.
    Select,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Catalog => "catalog",
            QueryKind::Select => "select",
        }
    }
}

/// A finished query.
#[derive(Debug, Clone)]
pub struct QueryEvent<'a> {
    pub dialect: Dialect,
    pub kind: QueryKind,
    pub sql: &'a str,
    pub elapsed: Duration,
    /// Rows returned, when the query succeeded.
    pub rows: Option<usize>,
    pub failed: bool,
}

/// Receives an event after each query.
pub trait QueryObserver: Send + Sync {
    fn on_query(&self, event: &QueryEvent<'_>);
}

/// Emits a `tracing` debug record per query.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl QueryObserver for TracingObserver {
    fn on_query(&self, event: &QueryEvent<'_>) {
        debug!(
            dialect = %event.dialect,
            kind = event.kind.as_str(),
            elapsed_us = event.elapsed.as_micros() as u64,
            rows = event.rows,
            failed = event.failed,
            sql = event.sql,
            "query"
        );
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl QueryObserver for NoopObserver {
    fn on_query(&self, _event: &QueryEvent<'_>) {}
}

/// The observer used when none is injected.
pub fn default_observer() -> Arc<dyn QueryObserver> {
    Arc::new(TracingObserver)
}
