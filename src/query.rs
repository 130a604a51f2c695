//! Query descriptors and the execution seam.
//!
//! `SqlQuery` is the opaque descriptor handed to a `QueryExecutor`; `ObservedClient` wraps an
//! executor and, when type generation is enabled, hands every completed result to the
//! `QueryObserver` before returning it unchanged.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::observer::QueryObserver;
use crate::shape::FieldMeta;

/// Literal query text plus its bound parameter values (`$1`, `$2`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlQuery {
    pub sql: String,
    #[serde(default)]
    pub values: Vec<JsonValue>,
}

impl SqlQuery {
    pub fn new<S: Into<String>>(sql: S, values: Vec<JsonValue>) -> Self { Self { sql: sql.into(), values } }

    /// Query without bound values.
    pub fn text<S: Into<String>>(sql: S) -> Self { Self::new(sql, Vec::new()) }
}

/// Result of one execution: declared column metadata plus row data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub fields: Vec<FieldMeta>,
    pub rows: Vec<Vec<JsonValue>>,
}

/// External query-execution collaborator.
pub trait QueryExecutor: Send + Sync {
    fn execute(&self, query: &SqlQuery) -> impl Future<Output = anyhow::Result<QueryResult>> + Send;
}

/// Executor wrapper that feeds completed results to the observer.
pub struct ObservedClient<E: QueryExecutor> {
    executor: E,
    observer: Option<Arc<QueryObserver>>,
}

impl<E: QueryExecutor> ObservedClient<E> {
    pub fn new(executor: E, observer: Option<Arc<QueryObserver>>) -> Self { Self { executor, observer } }

    pub fn executor(&self) -> &E { &self.executor }

    pub fn observer(&self) -> Option<&Arc<QueryObserver>> { self.observer.as_ref() }

    /// Execute `query`. Executor errors propagate unchanged; generation failures are
    /// recorded on the observer and never reach this result.
    pub async fn query(&self, query: &SqlQuery) -> anyhow::Result<QueryResult> {
        let result = self.executor.execute(query).await?;
        Ok(match &self.observer {
            Some(observer) => observer.after_query_execution(query, result),
            None => result,
        })
    }
}
