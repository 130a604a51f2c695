use super::*;
use crate::registry::oid;
use crate::store::{ArtifactStore, DuplicatePolicy, MemoryArtifactStore};
use crate::error::AppResult;
use serde_json::json;

fn observer_with_memory() -> (Arc<MemoryArtifactStore>, Arc<QueryObserver>) {
    let mem = Arc::new(MemoryArtifactStore::new());
    let store = CodegenStore::new(mem.clone(), DuplicatePolicy::KeepFirst);
    (mem, Arc::new(QueryObserver::new(store, None)))
}

fn users_result() -> QueryResult {
    QueryResult {
        fields: vec![FieldMeta::new("id", oid::INT4), FieldMeta::new("name", oid::TEXT)],
        rows: vec![vec![json!(1), json!("ada")]],
    }
}

#[test]
fn key_depends_on_text_and_values() {
    let a = QueryKey::of("select $1", &[json!(1)]);
    assert_eq!(a, QueryKey::of("select $1", &[json!(1)]));
    assert_ne!(a, QueryKey::of("select $1", &[json!(2)]));
    assert_ne!(a, QueryKey::of("select $1", &[json!("1")]));
    assert_ne!(a, QueryKey::of("select  $1", &[json!(1)]));
}

#[test]
fn pending_index_appends() {
    let idx = PendingExecutionIndex::new();
    let k = QueryKey::of("select 1", &[]);
    assert!(idx.identifiers(&k).is_none());
    idx.tag(k, "a");
    idx.tag(k, "b");
    idx.tag(k, "a");
    assert_eq!(idx.identifiers(&k).unwrap(), vec!["a", "b", "a"]);
    assert_eq!(idx.len(), 1);
}

#[test]
fn tagged_query_writes_shape_and_returns_result_unchanged() {
    let (mem, observer) = observer_with_memory();
    let tags = SqlTags::new(["get_user"], Some(observer.clone()));
    let q = tags.get("get_user").query("\nselect id::int4, name::text from users\n", vec![]);

    let out = observer.after_query_execution(&q, users_result());
    assert_eq!(out, users_result());

    let entries = observer.store().load("get_user").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].description, "select id::int4, name::text from users");
    let got: Vec<(&str, &str)> = entries[0].properties.iter().map(|p| (p.name.as_str(), p.value.as_str())).collect();
    assert_eq!(got, vec![("id", "number"), ("name", "string")]);
    assert!(mem.get("index").unwrap().contains("get_user"));
}

#[test]
fn same_query_tagged_by_two_identifiers_fans_out() {
    let (mem, observer) = observer_with_memory();
    let tags = SqlTags::new(Vec::<String>::new(), Some(observer.clone()));
    let q1 = tags.get("first").query("select 1::int4 as n where $1", vec![json!(true)]);
    let q2 = tags.get("second").query("select 1::int4 as n where $1", vec![json!(true)]);
    assert_eq!(q1, q2);

    let written = observer.observe(&q1, &[FieldMeta::new("n", oid::INT4)]);
    assert_eq!(written, 2);
    assert_eq!(mem.list().unwrap(), vec!["first".to_string(), "second".to_string()]);
}

#[test]
fn untagged_query_writes_nothing() {
    let (mem, observer) = observer_with_memory();
    let tags = SqlTags::new(["get_user"], Some(observer.clone()));
    let _tagged = tags.get("get_user").query("select 1", vec![json!(1)]);

    // same text, different values: not the tagged execution
    let other = tags.plain("select 1", vec![json!(2)]);
    let out = observer.after_query_execution(&other, users_result());
    assert_eq!(out, users_result());
    assert!(mem.list().unwrap().is_empty());
    assert!(!observer.has_failures());
}

#[test]
fn unknown_oid_is_recorded_as_unknown() {
    let (_mem, observer) = observer_with_memory();
    let tags = SqlTags::new(["moods"], Some(observer.clone()));
    let q = tags.get("moods").query("select mood from people", vec![]);
    observer.observe(&q, &[FieldMeta::new("mood", 16_999)]);
    let entries = observer.store().load("moods").unwrap();
    assert_eq!(entries[0].properties[0].value, "unknown");
}

#[test]
fn fallback_factory_caches_unseen_identifiers() {
    let tags = SqlTags::new(["known"], None);
    assert!(tags.contains("known"));
    assert!(!tags.contains("adhoc"));
    let t = tags.get("adhoc");
    assert_eq!(t.identifier(), "adhoc");
    assert_eq!(tags.identifiers(), vec!["adhoc".to_string(), "known".to_string()]);
}

struct FailingStore;

impl ArtifactStore for FailingStore {
    fn read(&self, _name: &str) -> AppResult<Option<String>> { Ok(None) }
    fn write(&self, _name: &str, _content: &str) -> AppResult<()> {
        Err(AppError::io("store_write_failed", "medium unavailable"))
    }
    fn list(&self) -> AppResult<Vec<String>> { Ok(Vec::new()) }
    fn reset(&self) -> AppResult<()> { Ok(()) }
    fn describe(&self) -> String { "failing".to_string() }
}

#[test]
fn store_failure_is_recorded_and_result_untouched() {
    let store = CodegenStore::new(Arc::new(FailingStore), DuplicatePolicy::KeepFirst);
    let observer = Arc::new(QueryObserver::new(store, None));
    let tags = SqlTags::new(["a", "b"], Some(observer.clone()));
    let q = tags.get("a").query("select 1", vec![]);
    tags.get("b").query("select 1", vec![]);

    let out = observer.after_query_execution(&q, users_result());
    assert_eq!(out, users_result());
    let failures = observer.take_failures();
    // every tagged identifier is attempted
    assert_eq!(failures.iter().map(|f| f.identifier.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(failures[0].query, "select 1");
    assert!(failures[0].error.is_io());
    assert!(!observer.has_failures());
}
