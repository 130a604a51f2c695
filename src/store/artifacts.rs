//! Artifact media for generated modules. The codegen store only needs keyed full-content
//! reads/writes plus a listing of known identifiers; `FsArtifactStore` keeps one
//! `<name>.ts` per identifier in a directory, `MemoryArtifactStore` keeps them in a map.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::codegen::{EMPTY_INDEX, INDEX_MODULE};
use crate::error::{AppError, AppResult};

const MODULE_EXT: &str = "ts";

/// Keyed artifact medium. `list` never includes the index module and is sorted.
pub trait ArtifactStore: Send + Sync {
    fn read(&self, name: &str) -> AppResult<Option<String>>;
    fn write(&self, name: &str, content: &str) -> AppResult<()>;
    fn list(&self) -> AppResult<Vec<String>>;
    /// Delete every artifact and recreate an empty index.
    fn reset(&self) -> AppResult<()>;
    fn describe(&self) -> String;
}

fn io_err(code: &str, what: &str, path: &Path, e: std::io::Error) -> AppError {
    AppError::io(code.to_string(), format!("{} {}: {}", what, path.display(), e))
}

/// Create `dir` (recursively) and an empty `index.ts` inside it.
pub fn create_codegen_directory(dir: &Path) -> AppResult<()> {
    fs::create_dir_all(dir).map_err(|e| io_err("store_write_failed", "create dir", dir, e))?;
    let index = dir.join(format!("{}.{}", INDEX_MODULE, MODULE_EXT));
    fs::write(&index, EMPTY_INDEX).map_err(|e| io_err("store_write_failed", "write", &index, e))?;
    Ok(())
}

/// Remove every file in `dir` and the directory itself, then recreate it empty.
pub fn reset_codegen_directory(dir: &Path) -> AppResult<()> {
    if dir.exists() {
        let rd = fs::read_dir(dir).map_err(|e| io_err("store_reset_failed", "read dir", dir, e))?;
        for entry in rd.flatten() {
            let p = entry.path();
            if p.is_file() {
                fs::remove_file(&p).map_err(|e| io_err("store_reset_failed", "remove", &p, e))?;
            }
        }
        fs::remove_dir(dir).map_err(|e| io_err("store_reset_failed", "remove dir", dir, e))?;
    }
    create_codegen_directory(dir)
}

/// Directory of generated TypeScript modules.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Open `root`, bootstrapping it with an empty index if it does not exist yet.
    pub fn open<P: AsRef<Path>>(root: P) -> AppResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() { create_codegen_directory(&root)?; }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path { &self.root }

    pub fn module_path(&self, name: &str) -> PathBuf { self.root.join(format!("{}.{}", name, MODULE_EXT)) }
}

impl ArtifactStore for FsArtifactStore {
    fn read(&self, name: &str) -> AppResult<Option<String>> {
        let path = self.module_path(name);
        if !path.exists() { return Ok(None); }
        let bytes = fs::read(&path).map_err(|e| io_err("store_read_failed", "read", &path, e))?;
        match String::from_utf8(bytes) {
            Ok(s) => Ok(Some(s)),
            Err(e) => {
                // damaged bytes fail metadata parsing downstream and the module starts fresh
                warn!(target: "pgtypegen::store", "'{}' is not valid UTF-8; decoding lossily", path.display());
                Ok(Some(String::from_utf8_lossy(e.as_bytes()).into_owned()))
            }
        }
    }

    fn write(&self, name: &str, content: &str) -> AppResult<()> {
        fs::create_dir_all(&self.root).map_err(|e| io_err("store_write_failed", "create dir", &self.root, e))?;
        let final_path = self.module_path(name);
        let next_path = self.root.join(format!("{}.{}.next", name, MODULE_EXT));
        // Write next file, then swap it into place
        {
            let mut f = File::create(&next_path).map_err(|e| io_err("store_write_failed", "create", &next_path, e))?;
            f.write_all(content.as_bytes()).map_err(|e| io_err("store_write_failed", "write", &next_path, e))?;
            f.flush().map_err(|e| io_err("store_write_failed", "flush", &next_path, e))?;
        }
        fs::rename(&next_path, &final_path).map_err(|e| io_err("store_write_failed", "rename", &final_path, e))?;
        debug!(target: "pgtypegen::store", "wrote '{}' ({} bytes)", final_path.display(), content.len());
        Ok(())
    }

    fn list(&self) -> AppResult<Vec<String>> {
        let rd = fs::read_dir(&self.root).map_err(|e| io_err("store_read_failed", "read dir", &self.root, e))?;
        let mut names: Vec<String> = Vec::new();
        for entry in rd.flatten() {
            let p = entry.path();
            if !p.is_file() { continue; }
            if p.extension().and_then(|s| s.to_str()) != Some(MODULE_EXT) { continue; }
            if let Some(stem) = p.file_stem().and_then(|s| s.to_str()) {
                if stem != INDEX_MODULE { names.push(stem.to_string()); }
            }
        }
        names.sort();
        Ok(names)
    }

    fn reset(&self) -> AppResult<()> { reset_codegen_directory(&self.root) }

    fn describe(&self) -> String { self.root.display().to_string() }
}

/// In-process artifact medium; the index module is stored under `index` like any other.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    modules: Mutex<BTreeMap<String, String>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        let s = Self::default();
        s.modules.lock().insert(INDEX_MODULE.to_string(), EMPTY_INDEX.to_string());
        s
    }

    pub fn get(&self, name: &str) -> Option<String> { self.modules.lock().get(name).cloned() }

    /// Seed raw content, bypassing rendering (e.g. a hand-damaged module).
    pub fn insert<S: Into<String>>(&self, name: &str, content: S) {
        self.modules.lock().insert(name.to_string(), content.into());
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn read(&self, name: &str) -> AppResult<Option<String>> { Ok(self.get(name)) }

    fn write(&self, name: &str, content: &str) -> AppResult<()> {
        self.modules.lock().insert(name.to_string(), content.to_string());
        Ok(())
    }

    fn list(&self) -> AppResult<Vec<String>> {
        Ok(self.modules.lock().keys().filter(|k| k.as_str() != INDEX_MODULE).cloned().collect())
    }

    fn reset(&self) -> AppResult<()> {
        let mut m = self.modules.lock();
        m.clear();
        m.insert(INDEX_MODULE.to_string(), EMPTY_INDEX.to_string());
        Ok(())
    }

    fn describe(&self) -> String { "memory".to_string() }
}
