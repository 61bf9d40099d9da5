use async_trait::async_trait;
use serde_json::{Map, Value};

use super::SelectQuery;
use crate::dialect::Dialect;
use crate::error::Result;

/// A result row, keyed by output column name.
pub type Tuple = Map<String, Value>;

/// Runs select queries against a live connection.
///
/// Implementations render the query for their own dialect, bind `params` in
/// order and report execution to their observer.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    fn dialect(&self) -> Dialect;

    async fn fetch(&self, query: &SelectQuery, params: &[Value]) -> Result<Vec<Tuple>>;
}
