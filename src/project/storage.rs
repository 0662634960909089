//! Storage adapters turn corpus paths into document content.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::path;
use crate::error::{PathError, StorageError};
use crate::model::Import;

/// Parsed content of a stored document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentSource {
    pub imports: Vec<Import>,
    pub definitions: Vec<SmolStr>,
}

impl DocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_import(mut self, import: Import) -> Self {
        self.imports.push(import);
        self
    }

    pub fn with_definition(mut self, name: impl Into<SmolStr>) -> Self {
        self.definitions.push(name.into());
        self
    }
}

/// Loads documents by absolute corpus path.
///
/// Called without any corpus lock held; implementations may block on I/O.
pub trait StorageAdapter: Send + Sync {
    fn fetch(&self, path: &str) -> Result<DocumentSource, StorageError>;
}

/// An adapter with nothing in it, for corpora built entirely in memory.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullAdapter;

impl StorageAdapter for NullAdapter {
    fn fetch(&self, path: &str) -> Result<DocumentSource, StorageError> {
        Err(StorageError::NotFound(SmolStr::new(path)))
    }
}

/// A thread-safe in-memory document store.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    sources: RwLock<FxHashMap<SmolStr, DocumentSource>>,
    fetches: AtomicUsize,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `source` under `path`, replacing what was there.
    pub fn insert(&self, path: &str, source: DocumentSource) -> Result<(), PathError> {
        let path = path::resolve_relative(path::ROOT, path)?;
        self.sources.write().insert(path, source);
        Ok(())
    }

    pub fn remove(&self, path: &str) -> Option<DocumentSource> {
        let path = path::resolve_relative(path::ROOT, path).ok()?;
        self.sources.write().remove(&path)
    }

    /// Number of successful and failed fetches so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl StorageAdapter for MemoryAdapter {
    fn fetch(&self, path: &str) -> Result<DocumentSource, StorageError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.sources
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(SmolStr::new(path)))
    }
}
