//! Session wiring: builds the tag table, observer and codegen store from a `TypegenConfig`.

use std::sync::Arc;

use tracing::info;

use crate::config::{TypegenConfig, WriteTypes};
use crate::error::{AppError, AppResult};
use crate::observer::{GenerationFailure, QueryObserver, SqlTags, TaggedSql};
use crate::query::{ObservedClient, QueryExecutor};
use crate::store::{reset_codegen_directory, ArtifactStore, CodegenStore, FsArtifactStore};

/// One generation session.
pub struct Typegen {
    tags: SqlTags,
    observer: Option<Arc<QueryObserver>>,
}

/// Set up a session writing to the configured directory. With `WriteTypes::Disabled` the
/// session is a pass-through: nothing is tagged, observed or written.
pub fn setup_typegen(config: TypegenConfig) -> AppResult<Typegen> {
    let artifacts: Option<Arc<dyn ArtifactStore>> = match &config.write_types {
        WriteTypes::Disabled => None,
        WriteTypes::Directory(dir) => {
            if config.reset {
                info!(target: "pgtypegen::store", "resetting generated directory '{}'", dir.display());
                reset_codegen_directory(dir)?;
            }
            Some(Arc::new(FsArtifactStore::open(dir)?))
        }
    };
    Ok(build(config, artifacts))
}

/// Set up a session over a caller-provided artifact medium. `write_types` still decides
/// whether observation is enabled; the directory it names is not used.
pub fn setup_typegen_with_store(config: TypegenConfig, artifacts: Arc<dyn ArtifactStore>) -> AppResult<Typegen> {
    if !config.write_types.is_enabled() { return Ok(build(config, None)); }
    if config.reset {
        info!(target: "pgtypegen::store", "resetting artifact store '{}'", artifacts.describe());
        artifacts.reset()?;
    }
    Ok(build(config, Some(artifacts)))
}

fn build(config: TypegenConfig, artifacts: Option<Arc<dyn ArtifactStore>>) -> Typegen {
    let observer = artifacts.map(|a| {
        let store = CodegenStore::new(a, config.duplicate_policy);
        Arc::new(QueryObserver::new(store, config.type_mapper.clone()))
    });
    info!(
        target: "pgtypegen::observer",
        "typegen session: enabled={} known_types={} policy={:?}",
        observer.is_some(), config.known_types.len(), config.duplicate_policy
    );
    Typegen { tags: SqlTags::new(config.known_types, observer.clone()), observer }
}

impl Typegen {
    pub fn is_enabled(&self) -> bool { self.observer.is_some() }

    /// Tagged query constructor for `identifier`.
    pub fn sql(&self, identifier: &str) -> TaggedSql { self.tags.get(identifier) }

    pub fn tags(&self) -> &SqlTags { &self.tags }

    pub fn observer(&self) -> Option<&Arc<QueryObserver>> { self.observer.as_ref() }

    /// Wrap `executor` so that its results are observed by this session.
    pub fn client<E: QueryExecutor>(&self, executor: E) -> ObservedClient<E> { ObservedClient::new(executor, self.observer.clone()) }

    pub fn take_failures(&self) -> Vec<GenerationFailure> {
        self.observer.as_ref().map(|o| o.take_failures()).unwrap_or_default()
    }

    /// End of a generation pass: any store failure recorded so far fails the pass.
    pub fn finish(&self) -> AppResult<()> {
        let failures = self.take_failures();
        let Some(first) = failures.first() else { return Ok(()) };
        let names: Vec<&str> = failures.iter().map(|f| f.identifier.as_str()).collect();
        Err(AppError::io(
            "generation_failed".to_string(),
            format!("{} write(s) failed ({}); first: {}", failures.len(), names.join(", "), first.error),
        ))
    }
}
