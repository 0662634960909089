//! Documents.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::RwLock;
use smol_str::SmolStr;

use crate::base::DocumentId;
use crate::index::state::IndexEntry;
use crate::index::{ImportPriorityGroup, IndexState};
use crate::model::Import;

/// A document in a corpus: its imports, the names it defines, and its
/// indexing state.
///
/// Documents are owned by a [`Corpus`](crate::project::Corpus) and handed
/// out as `Arc<Document>`. Mutations go through the corpus, which knows
/// which other documents must be invalidated.
pub struct Document {
    id: DocumentId,
    path: SmolStr,
    folder_path: SmolStr,
    imports: RwLock<Arc<[Import]>>,
    definitions: RwLock<IndexSet<SmolStr>>,
    entry: IndexEntry,
}

impl Document {
    pub(crate) fn new(id: DocumentId, path: SmolStr, folder_path: SmolStr) -> Self {
        Self {
            id,
            path,
            folder_path,
            imports: RwLock::new(Arc::from(Vec::new())),
            definitions: RwLock::new(IndexSet::new()),
            entry: IndexEntry::new(),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Absolute corpus path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path of the containing folder, ending in `/`.
    pub fn folder_path(&self) -> &str {
        &self.folder_path
    }

    /// The declared imports, in declaration order.
    pub fn imports(&self) -> Arc<[Import]> {
        Arc::clone(&self.imports.read())
    }

    /// The top-level names this document defines, in declaration order.
    pub fn definitions(&self) -> Vec<SmolStr> {
        self.definitions.read().iter().cloned().collect()
    }

    pub fn defines(&self, name: &str) -> bool {
        self.definitions.read().contains(name)
    }

    /// Whether the import priorities must be (re)computed before use.
    pub fn needs_indexing(&self) -> bool {
        self.entry.needs_indexing()
    }

    /// The published import priorities. `None` while the document is dirty.
    pub fn import_priorities(&self) -> Option<Arc<ImportPriorityGroup>> {
        self.entry.cached_group()
    }

    pub fn index_state(&self) -> IndexState {
        self.entry.state()
    }

    pub(crate) fn entry(&self) -> &IndexEntry {
        &self.entry
    }

    pub(crate) fn push_import(&self, import: Import) {
        let mut imports = self.imports.write();
        let mut updated = imports.to_vec();
        updated.push(import);
        *imports = updated.into();
    }

    pub(crate) fn replace_imports(&self, imports: Vec<Import>) {
        *self.imports.write() = imports.into();
    }

    pub(crate) fn add_definition(&self, name: SmolStr) -> bool {
        self.definitions.write().insert(name)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("imports", &self.imports.read().len())
            .field("needs_indexing", &self.needs_indexing())
            .finish()
    }
}
