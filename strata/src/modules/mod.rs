//! Modules: loader boundary, table, and lifecycle
//!
//! A module moves `Unloaded -> Loading -> Evaluated | Failed`. The table
//! memoizes results for `require_relative`, records failures without
//! discarding sibling modules, and keeps the scope/frame pair that other
//! modules merge from. All file I/O lives behind `ModuleLoader`; the
//! engine itself never touches the filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::eval::Environment;
use crate::scope::{FrameId, ScopeId};
use crate::syntax::Node;

/// Source language of a module, carried on declarations and diagnostics.
/// The engine is language-agnostic; front-ends register here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    Script,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Script => write!(f, "script"),
        }
    }
}

/// Produces parsed syntax for a module path. Loader failure for a missing
/// file is reported like any other unresolvable path (`LookupPath`).
pub trait ModuleLoader {
    fn load(&mut self, path: &Path) -> Result<Node>;
}

/// Loads `.sta` files from disk, lexing and parsing them
#[derive(Debug, Default)]
pub struct FsLoader;

impl FsLoader {
    pub fn new() -> Self {
        FsLoader
    }

    fn with_extension(path: &Path) -> PathBuf {
        if path.extension().is_some() {
            path.to_path_buf()
        } else {
            path.with_extension("sta")
        }
    }
}

impl ModuleLoader for FsLoader {
    fn load(&mut self, path: &Path) -> Result<Node> {
        let file = Self::with_extension(path);
        let source = std::fs::read_to_string(&file)
            .map_err(|e| EngineError::io_error(format!("failed to read {}: {e}", file.display())))?;
        let tokens = crate::lexer::tokenize(&source)?;
        crate::parser::parse(&file.display().to_string(), &source, tokens)
    }
}

/// In-memory loader for tests and embedders
#[derive(Debug, Default)]
pub struct MapLoader {
    sources: HashMap<PathBuf, String>,
}

impl MapLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, source: impl Into<String>) -> &mut Self {
        self.sources.insert(path.into(), source.into());
        self
    }
}

impl ModuleLoader for MapLoader {
    fn load(&mut self, path: &Path) -> Result<Node> {
        let source = self
            .sources
            .get(path)
            .ok_or_else(|| EngineError::io_error(format!("no module source for {}", path.display())))?
            .clone();
        let tokens = crate::lexer::tokenize(&source)?;
        crate::parser::parse(&path.display().to_string(), &source, tokens)
    }
}

/// A fully evaluated module: its scope/frame pair, resulting value, and
/// the environment snapshot other modules merge bindings from.
#[derive(Debug, Clone)]
pub struct ModuleInfo<V> {
    pub scope: ScopeId,
    pub frame: FrameId,
    pub value: V,
    pub env: Environment,
}

/// Lifecycle state of one module path
#[derive(Debug, Clone)]
pub enum ModuleState<V> {
    /// Evaluation in flight; scope and frame already exist so importers
    /// caught in a cycle can still merge declarations.
    Loading { scope: ScopeId, frame: FrameId },
    Evaluated(ModuleInfo<V>),
    Failed(EngineError),
}

/// Path-indexed module registry, in evaluation order
#[derive(Debug, Default)]
pub struct ModuleTable<V> {
    entries: HashMap<PathBuf, ModuleState<V>>,
    order: Vec<PathBuf>,
}

impl<V> ModuleTable<V> {
    pub fn new() -> Self {
        ModuleTable {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn state(&self, path: &Path) -> Option<&ModuleState<V>> {
        self.entries.get(path)
    }

    pub fn begin(&mut self, path: &Path, scope: ScopeId, frame: FrameId) {
        if !self.entries.contains_key(path) {
            self.order.push(path.to_path_buf());
        }
        self.entries
            .insert(path.to_path_buf(), ModuleState::Loading { scope, frame });
    }

    pub fn finish(&mut self, path: &Path, info: ModuleInfo<V>) {
        self.entries
            .insert(path.to_path_buf(), ModuleState::Evaluated(info));
    }

    pub fn fail(&mut self, path: &Path, error: EngineError) {
        self.entries
            .insert(path.to_path_buf(), ModuleState::Failed(error));
    }

    /// Forget a module so `load` can re-evaluate it from scratch
    pub fn evict(&mut self, path: &Path) {
        self.entries.remove(path);
        self.order.retain(|p| p != path);
    }

    pub fn evaluated(&self, path: &Path) -> Option<&ModuleInfo<V>> {
        match self.entries.get(path) {
            Some(ModuleState::Evaluated(info)) => Some(info),
            _ => None,
        }
    }

    pub fn failure(&self, path: &Path) -> Option<&EngineError> {
        match self.entries.get(path) {
            Some(ModuleState::Failed(err)) => Some(err),
            _ => None,
        }
    }

    /// First failed module in evaluation order, if any
    pub fn first_failure(&self) -> Option<(&Path, &EngineError)> {
        self.order.iter().find_map(|path| {
            self.failure(path).map(|err| (path.as_path(), err))
        })
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.order.iter().map(|p| p.as_path())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
