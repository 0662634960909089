//! Folders: ordered containers of documents.

use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;

use crate::base::{DocumentId, path};

/// A folder in a corpus.
///
/// Holds its documents by file name in insertion order, and the paths of
/// its child folders. Returned from the corpus as a snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Folder {
    path: SmolStr,
    documents: IndexMap<SmolStr, DocumentId>,
    children: IndexSet<SmolStr>,
}

impl Folder {
    /// Create an empty folder at `path` (ending in `/`).
    pub fn new(path: impl Into<SmolStr>) -> Self {
        Self {
            path: path.into(),
            documents: IndexMap::new(),
            children: IndexSet::new(),
        }
    }

    /// The folder path, ending in `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The last path segment, empty for a root folder.
    pub fn name(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(pos) => &trimmed[pos + 1..],
            None => "",
        }
    }

    /// Add a document, returning the one it displaced.
    pub(crate) fn insert(&mut self, name: impl Into<SmolStr>, document: DocumentId) -> Option<DocumentId> {
        self.documents.insert(name.into(), document)
    }

    /// Remove a document by file name, keeping the order of the rest.
    pub(crate) fn remove(&mut self, name: &str) -> Option<DocumentId> {
        self.documents.shift_remove(name)
    }

    pub(crate) fn add_child(&mut self, folder_path: impl Into<SmolStr>) {
        self.children.insert(folder_path.into());
    }

    /// Look up a document by file name.
    pub fn document(&self, name: &str) -> Option<DocumentId> {
        self.documents.get(name).copied()
    }

    pub fn contains(&self, document: DocumentId) -> bool {
        self.documents.values().any(|&d| d == document)
    }

    /// Documents in insertion order.
    pub fn documents(&self) -> impl Iterator<Item = (&str, DocumentId)> + '_ {
        self.documents.iter().map(|(name, &id)| (name.as_str(), id))
    }

    /// Child folder paths in creation order.
    pub fn children(&self) -> impl Iterator<Item = &str> + '_ {
        self.children.iter().map(|c| c.as_str())
    }

    /// Path of a document named `name` in this folder.
    pub fn document_path(&self, name: &str) -> String {
        format!("{}{}", self.path, name)
    }

    pub fn parent_path(&self) -> Option<&str> {
        path::parent_folder(&self.path)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
