//!
//! pgtypegen codegen store
//! -----------------------
//! Accumulates observed result shapes per logical identifier and regenerates the
//! generated modules on every write:
//!
//! 1. load the identifier's previously persisted entries (missing or corrupt → empty),
//! 2. merge the new entry, sort by canonical query text and drop duplicates,
//! 3. rewrite `<identifier>.ts` in full,
//! 4. rebuild `index.ts` from the artifact medium's listing, so identifiers written by
//!    earlier runs stay visible.
//!
//! The read-modify-write is not atomic across processes; generation is a development-time
//! activity and a single writer per identifier is assumed.

pub mod artifacts;

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use artifacts::{create_codegen_directory, reset_codegen_directory, ArtifactStore, FsArtifactStore, MemoryArtifactStore};

use crate::codegen::{self, ShapeEntry, INDEX_MODULE};
use crate::error::{AppError, AppResult};
use crate::shape::FieldDescriptor;

/// What to do when a newly observed shape has the same canonical query text as a
/// persisted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The shape recorded at first observation is kept; later drift is ignored.
    #[default]
    KeepFirst,
    /// The newest observation replaces the persisted shape.
    KeepLatest,
}

impl FromStr for DuplicatePolicy {
    type Err = AppError;
    fn from_str(s: &str) -> AppResult<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "keep_first" | "first" => Ok(DuplicatePolicy::KeepFirst),
            "keep_latest" | "latest" => Ok(DuplicatePolicy::KeepLatest),
            other => Err(AppError::config("bad_duplicate_policy".to_string(), format!("unknown duplicate policy '{}'", other))),
        }
    }
}

/// Merge `incoming` into `existing`: stable sort by canonical text, one entry per text.
pub fn merge_entries(mut existing: Vec<ShapeEntry>, incoming: ShapeEntry, policy: DuplicatePolicy) -> Vec<ShapeEntry> {
    if policy == DuplicatePolicy::KeepLatest {
        existing.retain(|e| e.description != incoming.description);
    }
    existing.push(incoming);
    // sort_by is stable: among equal texts, loaded entries stay ahead of the new one
    existing.sort_by(|a, b| a.description.cmp(&b.description));
    existing.dedup_by(|later, earlier| later.description == earlier.description);
    existing
}

/// Reject names that cannot be used as a module name and TypeScript identifier.
pub fn validate_identifier(identifier: &str) -> AppResult<()> {
    if !codegen::is_ts_identifier(identifier) {
        return Err(AppError::user("bad_identifier".to_string(), format!("'{}' is not a valid type identifier", identifier)));
    }
    if identifier == INDEX_MODULE {
        return Err(AppError::user("reserved_identifier".to_string(), format!("'{}' is reserved for the index module", identifier)));
    }
    Ok(())
}

/// Per-identifier shape accumulation over an artifact medium.
#[derive(Clone)]
pub struct CodegenStore {
    artifacts: Arc<dyn ArtifactStore>,
    policy: DuplicatePolicy,
}

impl CodegenStore {
    pub fn new(artifacts: Arc<dyn ArtifactStore>, policy: DuplicatePolicy) -> Self { Self { artifacts, policy } }

    pub fn artifacts(&self) -> &Arc<dyn ArtifactStore> { &self.artifacts }

    pub fn policy(&self) -> DuplicatePolicy { self.policy }

    /// Persisted entries for `identifier`. A module whose metadata cannot be parsed is
    /// treated as empty; it is regenerated, never hand-edited.
    pub fn load(&self, identifier: &str) -> AppResult<Vec<ShapeEntry>> {
        let Some(content) = self.artifacts.read(identifier)? else { return Ok(Vec::new()) };
        match codegen::parse_identifier_module(identifier, &content) {
            Ok(Some(entries)) => Ok(entries),
            Ok(None) => {
                warn!(target: "pgtypegen::store", "'{}' in {} has no metadata line; starting fresh", identifier, self.artifacts.describe());
                Ok(Vec::new())
            }
            Err(e) => {
                warn!(target: "pgtypegen::store", "'{}' in {} has corrupt metadata ({}); starting fresh", identifier, self.artifacts.describe(), e);
                Ok(Vec::new())
            }
        }
    }

    /// Record one observed shape for `identifier` and regenerate its module and the index.
    pub fn write(&self, identifier: &str, properties: Vec<FieldDescriptor>, description: &str) -> AppResult<()> {
        validate_identifier(identifier)?;
        let existing = self.load(identifier)?;
        let before = existing.len();
        let entries = merge_entries(existing, ShapeEntry { properties, description: description.to_string() }, self.policy);
        debug!(target: "pgtypegen::store", "merge '{}': {} -> {} entries (policy={:?})", identifier, before, entries.len(), self.policy);

        let content = codegen::render_identifier_module(identifier, &entries)?;
        self.artifacts.write(identifier, &content)?;
        let known = self.regenerate_index()?;
        info!(target: "pgtypegen::store", "generated '{}' ({} shapes, {} known identifiers)", identifier, entries.len(), known.len());
        Ok(())
    }

    /// Rewrite the index from the identifiers currently present in the artifact medium.
    pub fn regenerate_index(&self) -> AppResult<Vec<String>> {
        let known = self.artifacts.list()?;
        self.artifacts.write(INDEX_MODULE, &codegen::render_index(&known))?;
        Ok(known)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
