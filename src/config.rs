use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::registry::{Oid, TypeMapper, TypeRegistry};
use crate::store::DuplicatePolicy;

pub const ENV_WRITE_TYPES: &str = "PGTYPEGEN_WRITE_TYPES";
pub const ENV_RESET: &str = "PGTYPEGEN_RESET";
pub const ENV_DUPLICATE_POLICY: &str = "PGTYPEGEN_DUPLICATE_POLICY";

/// Where generated modules go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WriteTypes {
    /// Observation is off: no tagging, no correlation, no writes.
    #[default]
    Disabled,
    Directory(PathBuf),
}

impl WriteTypes {
    pub fn is_enabled(&self) -> bool { !matches!(self, WriteTypes::Disabled) }

    pub fn directory(&self) -> Option<&Path> {
        match self {
            WriteTypes::Directory(p) => Some(p.as_path()),
            WriteTypes::Disabled => None,
        }
    }
}

/// Runtime configuration consumed by `setup_typegen`.
#[derive(Clone, Default)]
pub struct TypegenConfig {
    /// Identifiers whose entry points are created at setup.
    pub known_types: Vec<String>,
    pub write_types: WriteTypes,
    /// Wipe and recreate the output directory at setup.
    pub reset: bool,
    pub type_mapper: Option<TypeMapper>,
    pub duplicate_policy: DuplicatePolicy,
}

impl TypegenConfig {
    pub fn new(write_types: WriteTypes) -> Self { Self { write_types, ..Self::default() } }

    pub fn with_known_types<I, S>(mut self, known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_types = known.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reset(mut self, reset: bool) -> Self { self.reset = reset; self }

    pub fn with_type_mapper(mut self, mapper: TypeMapper) -> Self { self.type_mapper = Some(mapper); self }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self { self.duplicate_policy = policy; self }
}

impl fmt::Debug for TypegenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypegenConfig")
            .field("known_types", &self.known_types)
            .field("write_types", &self.write_types)
            .field("reset", &self.reset)
            .field("type_mapper", &self.type_mapper.as_ref().map(|_| "<fn>"))
            .field("duplicate_policy", &self.duplicate_policy)
            .finish()
    }
}

/// File/env form of the configuration (`typegen.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypegenSettings {
    #[serde(default)]
    pub known_types: Vec<String>,
    /// Output directory; absent or null disables generation.
    #[serde(default)]
    pub write_types: Option<PathBuf>,
    #[serde(default)]
    pub reset: bool,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    /// Catalog type name → type expression, consulted before the built-in table
    /// (e.g. `{"int8": "bigint", "timestamptz": "Date"}`).
    #[serde(default)]
    pub type_overrides: BTreeMap<String, String>,
}

impl TypegenSettings {
    pub fn load(path: &Path) -> AppResult<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| AppError::config("settings_unreadable".to_string(), format!("read {}: {}", path.display(), e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| AppError::config("settings_invalid".to_string(), format!("parse {}: {}", path.display(), e)))
    }

    /// Apply `PGTYPEGEN_*` environment overrides.
    pub fn apply_env(&mut self) -> AppResult<()> { self.apply_overrides(|k| std::env::var(k).ok()) }

    pub fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) -> AppResult<()> {
        if let Some(v) = lookup(ENV_WRITE_TYPES) {
            let v = v.trim();
            self.write_types = match v.to_ascii_lowercase().as_str() {
                "" | "0" | "false" | "off" => None,
                _ => Some(PathBuf::from(v)),
            };
        }
        if let Some(v) = lookup(ENV_RESET) {
            self.reset = parse_flag(ENV_RESET, &v)?;
        }
        if let Some(v) = lookup(ENV_DUPLICATE_POLICY) {
            self.duplicate_policy = v.parse()?;
        }
        Ok(())
    }

    pub fn into_config(self) -> AppResult<TypegenConfig> {
        let type_mapper = overrides_mapper(&self.type_overrides)?;
        Ok(TypegenConfig {
            known_types: self.known_types,
            write_types: self.write_types.map(WriteTypes::Directory).unwrap_or_default(),
            reset: self.reset,
            type_mapper,
            duplicate_policy: self.duplicate_policy,
        })
    }
}

fn parse_flag(name: &str, v: &str) -> AppResult<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::config("bad_flag".to_string(), format!("{}: expected a boolean, got '{}'", name, other))),
    }
}

fn overrides_mapper(overrides: &BTreeMap<String, String>) -> AppResult<Option<TypeMapper>> {
    if overrides.is_empty() { return Ok(None); }
    let reg = TypeRegistry::global();
    let mut by_oid: BTreeMap<Oid, String> = BTreeMap::new();
    for (name, expr) in overrides {
        let o = reg
            .name_to_oid(name)
            .ok_or_else(|| AppError::config("unknown_type_name".to_string(), format!("type override for unknown type '{}'", name)))?;
        by_oid.insert(o, expr.clone());
    }
    let mapper: TypeMapper = Arc::new(move |o: Oid, _: &TypeRegistry| by_oid.get(&o).cloned());
    Ok(Some(mapper))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
