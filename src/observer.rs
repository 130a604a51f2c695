//!
//! pgtypegen query observer
//! ------------------------
//! Correlates executed queries with the logical identifiers that asked for them.
//!
//! - Tag: `TaggedSql::query` builds the query descriptor and appends its identifier to the
//!   session's pending execution index under the query's content key.
//! - Execute: the executor runs the query untouched (`ObservedClient`).
//! - Observe: `QueryObserver::after_query_execution` recomputes the content key, extracts
//!   the shape once and writes it for every identifier tagged against that key.
//!
//! The index lives in one observer (one generation session) and is never pruned.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tracing::{debug, error, info};
use xxhash_rust::xxh3::xxh3_128;

use crate::error::AppError;
use crate::query::{QueryResult, SqlQuery};
use crate::registry::TypeMapper;
use crate::shape::{self, FieldMeta};
use crate::store::CodegenStore;

/// Content address of a query: digest of the JSON array `[sql, values]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryKey(u128);

impl QueryKey {
    pub fn of(sql: &str, values: &[JsonValue]) -> Self {
        let canonical = JsonValue::Array(vec![JsonValue::String(sql.to_string()), JsonValue::Array(values.to_vec())]).to_string();
        QueryKey(xxh3_128(canonical.as_bytes()))
    }

    pub fn for_query(query: &SqlQuery) -> Self { Self::of(&query.sql, &query.values) }
}

/// Content key → identifiers tagged against it, in tagging order.
#[derive(Debug, Default)]
pub struct PendingExecutionIndex {
    map: Mutex<HashMap<QueryKey, Vec<String>>>,
}

impl PendingExecutionIndex {
    pub fn new() -> Self { Self::default() }

    /// Append (never replace): the same query may be tagged by several identifiers.
    pub fn tag(&self, key: QueryKey, identifier: &str) {
        self.map.lock().entry(key).or_default().push(identifier.to_string());
    }

    pub fn identifiers(&self, key: &QueryKey) -> Option<Vec<String>> { self.map.lock().get(key).cloned() }

    pub fn len(&self) -> usize { self.map.lock().len() }

    pub fn is_empty(&self) -> bool { self.map.lock().is_empty() }
}

/// A store write that failed during observation.
#[derive(Debug, Clone)]
pub struct GenerationFailure {
    pub identifier: String,
    pub query: String,
    pub error: AppError,
}

/// One generation session: pending index, type mapper and the store shapes go to.
pub struct QueryObserver {
    pending: PendingExecutionIndex,
    store: CodegenStore,
    mapper: Option<TypeMapper>,
    failures: Mutex<Vec<GenerationFailure>>,
}

impl QueryObserver {
    pub fn new(store: CodegenStore, mapper: Option<TypeMapper>) -> Self {
        Self { pending: PendingExecutionIndex::new(), store, mapper, failures: Mutex::new(Vec::new()) }
    }

    pub fn store(&self) -> &CodegenStore { &self.store }

    pub fn pending(&self) -> &PendingExecutionIndex { &self.pending }

    pub fn tag(&self, identifier: &str, query: &SqlQuery) {
        let key = QueryKey::for_query(query);
        self.pending.tag(key, identifier);
        debug!(target: "pgtypegen::observer", "tagged '{}' for {:?}", identifier, key);
    }

    /// Post-execution hook. Returns `result` unmodified; shape generation is a side effect.
    pub fn after_query_execution(&self, query: &SqlQuery, result: QueryResult) -> QueryResult {
        self.observe(query, &result.fields);
        result
    }

    /// Write the shape of `fields` for every identifier tagged against `query`. Returns the
    /// number of successful writes; failures are logged and kept for `take_failures`.
    pub fn observe(&self, query: &SqlQuery, fields: &[FieldMeta]) -> usize {
        let Some(identifiers) = self.pending.identifiers(&QueryKey::for_query(query)) else { return 0 };
        let description = shape::canonical_query_text(&query.sql);
        let properties = shape::extract(fields, self.mapper.as_ref());
        let mut written = 0usize;
        for identifier in identifiers {
            match self.store.write(&identifier, properties.clone(), &description) {
                Ok(()) => written += 1,
                Err(e) => {
                    error!(target: "pgtypegen::observer", "type generation for '{}' failed: {}", identifier, e);
                    self.failures.lock().push(GenerationFailure { identifier, query: description.clone(), error: e });
                }
            }
        }
        info!(target: "pgtypegen::observer", "observed {} field(s) for {} write(s): {}", fields.len(), written, description);
        written
    }

    pub fn has_failures(&self) -> bool { !self.failures.lock().is_empty() }

    /// Drain recorded failures.
    pub fn take_failures(&self) -> Vec<GenerationFailure> { std::mem::take(&mut *self.failures.lock()) }
}

/// Query constructor bound to one logical identifier.
#[derive(Clone)]
pub struct TaggedSql {
    identifier: String,
    observer: Option<Arc<QueryObserver>>,
}

impl TaggedSql {
    pub fn identifier(&self) -> &str { &self.identifier }

    /// Build a query and, when generation is enabled, tag it for this identifier.
    pub fn query<S: Into<String>>(&self, sql: S, values: Vec<JsonValue>) -> SqlQuery {
        let q = SqlQuery::new(sql, values);
        if let Some(observer) = &self.observer { observer.tag(&self.identifier, &q); }
        q
    }
}

/// Identifier → tagged constructor. Known identifiers are created up front; any other
/// identifier gets an entry point on first use.
pub struct SqlTags {
    tags: Mutex<HashMap<String, TaggedSql>>,
    observer: Option<Arc<QueryObserver>>,
}

impl SqlTags {
    pub fn new<I, S>(known: I, observer: Option<Arc<QueryObserver>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags = known
            .into_iter()
            .map(|k| {
                let identifier: String = k.into();
                (identifier.clone(), TaggedSql { identifier, observer: observer.clone() })
            })
            .collect();
        Self { tags: Mutex::new(tags), observer }
    }

    pub fn get(&self, identifier: &str) -> TaggedSql {
        self.tags
            .lock()
            .entry(identifier.to_string())
            .or_insert_with(|| TaggedSql { identifier: identifier.to_string(), observer: self.observer.clone() })
            .clone()
    }

    pub fn contains(&self, identifier: &str) -> bool { self.tags.lock().contains_key(identifier) }

    /// Identifiers with an entry point so far, sorted.
    pub fn identifiers(&self) -> Vec<String> {
        let mut v: Vec<String> = self.tags.lock().keys().cloned().collect();
        v.sort();
        v
    }

    /// Untagged query constructor.
    pub fn plain<S: Into<String>>(&self, sql: S, values: Vec<JsonValue>) -> SqlQuery { SqlQuery::new(sql, values) }
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod observer_tests;
