//! The corpus: documents and folders over a storage adapter.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use crate::base::{DocumentId, IdAllocator, path};
use crate::error::{CorpusError, CorpusResult, PathError, StorageError};
use crate::events::{EventCallback, EventSink, StatusLevel};
use crate::model::{Document, Import, ImportsLoadStrategy, ResolveOptions};
use crate::project::{DocumentSource, Folder, NullAdapter, StorageAdapter};

#[derive(Debug)]
struct Registry {
    documents: FxHashMap<DocumentId, Arc<Document>>,
    by_path: FxHashMap<SmolStr, DocumentId>,
    folders: IndexMap<SmolStr, Folder>,
}

impl Registry {
    fn new() -> Self {
        let mut folders = IndexMap::new();
        folders.insert(SmolStr::new(path::ROOT), Folder::new(path::ROOT));
        Self {
            documents: FxHashMap::default(),
            by_path: FxHashMap::default(),
            folders,
        }
    }

    /// Create `folder_path` and any missing ancestors, linking each to its parent.
    fn ensure_folder(&mut self, folder_path: &SmolStr) {
        if self.folders.contains_key(folder_path) {
            return;
        }
        self.folders
            .insert(folder_path.clone(), Folder::new(folder_path.clone()));

        let mut child = folder_path.clone();
        while let Some(parent) = path::parent_folder(&child).map(SmolStr::new) {
            let existed = self.folders.contains_key(&parent);
            self.folders
                .entry(parent.clone())
                .or_insert_with(|| Folder::new(parent.clone()))
                .add_child(child);
            if existed {
                break;
            }
            child = parent;
        }
    }

    fn insert(&mut self, document: Arc<Document>) {
        let (folder_path, name) = path::split(document.path());
        let folder_path = SmolStr::new(folder_path);
        self.ensure_folder(&folder_path);
        if let Some(folder) = self.folders.get_mut(&folder_path) {
            folder.insert(name, document.id());
        }
        self.by_path.insert(SmolStr::new(document.path()), document.id());
        self.documents.insert(document.id(), document);
    }

    fn remove(&mut self, id: DocumentId) -> Option<Arc<Document>> {
        let document = self.documents.remove(&id)?;
        self.by_path.remove(document.path());
        let (folder_path, name) = path::split(document.path());
        if let Some(folder) = self.folders.get_mut(folder_path) {
            folder.remove(name);
        }
        Some(document)
    }
}

/// A collection of documents organized in folders, backed by a
/// [`StorageAdapter`].
///
/// A corpus is `Send + Sync`. Reads, mutations and indexing may run from
/// any number of threads; concurrent requests to index the same document
/// share one pass.
///
/// # Example
///
/// ```
/// use schemacorpus::{Corpus, Import, ResolveOptions};
///
/// let corpus = Corpus::in_memory();
/// let a = corpus.create_document("/A.cdm.json").unwrap();
/// let b = corpus.create_document("/B.cdm.json").unwrap();
/// corpus.add_import(a.id(), Import::new("B.cdm.json")).unwrap();
///
/// let group = corpus.index_if_needed(a.id(), &ResolveOptions::new()).unwrap();
/// assert_eq!(group.priority(a.id()), Some(0));
/// assert_eq!(group.priority(b.id()), Some(1));
/// ```
pub struct Corpus {
    registry: RwLock<Registry>,
    storage: Arc<dyn StorageAdapter>,
    events: RwLock<EventSink>,
    ids: IdAllocator,
}

impl Corpus {
    /// Create an empty corpus loading documents from `storage`.
    pub fn new(storage: impl StorageAdapter + 'static) -> Self {
        Self::with_storage(Arc::new(storage))
    }

    /// Create an empty corpus sharing a storage adapter.
    pub fn with_storage(storage: Arc<dyn StorageAdapter>) -> Self {
        Self {
            registry: RwLock::new(Registry::new()),
            storage,
            events: RwLock::new(EventSink::default()),
            ids: IdAllocator::new(),
        }
    }

    /// Create an empty corpus with no backing storage.
    pub fn in_memory() -> Self {
        Self::new(NullAdapter)
    }

    /// Register the callback that receives status events at `level` or
    /// more severe.
    pub fn set_event_callback(&self, callback: impl EventCallback + 'static, level: StatusLevel) {
        *self.events.write() = EventSink::new(Arc::new(callback), level);
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn document(&self, id: DocumentId) -> Option<Arc<Document>> {
        self.registry.read().documents.get(&id).cloned()
    }

    /// Look up a document by absolute path.
    pub fn document_by_path(&self, document_path: &str) -> Option<Arc<Document>> {
        let normalized = path::normalize(document_path).ok()?;
        self.lookup_path(&normalized)
    }

    /// Snapshot of the folder at `folder_path`.
    pub fn folder(&self, folder_path: &str) -> Option<Folder> {
        let mut normalized = path::normalize(folder_path).ok()?.to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        self.registry.read().folders.get(normalized.as_str()).cloned()
    }

    /// Snapshot of the root folder.
    pub fn root_folder(&self) -> Folder {
        self.registry
            .read()
            .folders
            .get(path::ROOT)
            .cloned()
            .unwrap_or_else(|| Folder::new(path::ROOT))
    }

    pub fn document_count(&self) -> usize {
        self.registry.read().documents.len()
    }

    /// All documents, in creation order.
    pub fn documents(&self) -> Vec<Arc<Document>> {
        let mut documents: Vec<_> = self.registry.read().documents.values().cloned().collect();
        documents.sort_by_key(|d| d.id());
        documents
    }

    pub(crate) fn lookup_path(&self, normalized: &str) -> Option<Arc<Document>> {
        let registry = self.registry.read();
        let id = registry.by_path.get(normalized)?;
        registry.documents.get(id).cloned()
    }

    pub(crate) fn require(&self, id: DocumentId) -> CorpusResult<Arc<Document>> {
        self.document(id).ok_or(CorpusError::UnknownDocument(id))
    }

    // ========================================================================
    // DOCUMENT LIFECYCLE
    // ========================================================================

    /// Create an empty document at `document_path`.
    ///
    /// Relative paths are taken from the root folder. Documents whose imports
    /// failed on this path will resolve to the new document when next indexed.
    pub fn create_document(&self, document_path: &str) -> CorpusResult<Arc<Document>> {
        self.create_document_from_source(document_path, DocumentSource::default())
    }

    /// Create a document with the given imports and definitions.
    pub fn create_document_from_source(
        &self,
        document_path: &str,
        source: DocumentSource,
    ) -> CorpusResult<Arc<Document>> {
        let normalized = document_path_of(document_path)?;
        self.insert(normalized, source, None)
            .map_err(|existing| CorpusError::DuplicatePath(SmolStr::new(existing.path())))
    }

    /// Fetch a document through the storage adapter unless it is already
    /// in the corpus.
    ///
    /// With [`ImportsLoadStrategy::Load`] the document is indexed before it
    /// is returned, loading its imports.
    pub fn fetch_document(&self, document_path: &str, options: &ResolveOptions) -> CorpusResult<Arc<Document>> {
        let normalized = document_path_of(document_path)?;
        let document = self.load(&normalized)?;
        if options.imports_load_strategy() == ImportsLoadStrategy::Load {
            self.index_if_needed(document.id(), options)?;
        }
        Ok(document)
    }

    /// Remove a document from the corpus.
    ///
    /// Dependents are invalidated. Their imports of the removed path stay
    /// unresolved until a document is created or loaded there again.
    pub fn remove_document(&self, id: DocumentId) -> CorpusResult<Arc<Document>> {
        let removed = self
            .registry
            .write()
            .remove(id)
            .ok_or(CorpusError::UnknownDocument(id))?;
        tracing::debug!(document = %removed.path(), "removed document");

        removed.entry().invalidate(true);
        self.retarget(Some(id), removed.path(), None);
        self.invalidate(id);
        Ok(removed)
    }

    /// Replace the document at `document_path` with a freshly fetched
    /// instance.
    ///
    /// The new instance gets a new [`DocumentId`]. Every document that
    /// imported the old instance re-resolves to the new one on its next
    /// indexing pass.
    pub fn reload_document(&self, document_path: &str) -> CorpusResult<Arc<Document>> {
        let normalized = document_path_of(document_path)?;
        let source = self.storage.fetch(&normalized)?;
        let document = self.build(normalized.clone(), source);

        let old = {
            let mut registry = self.registry.write();
            let old_id = registry.by_path.get(&normalized).copied();
            let old = old_id.and_then(|id| registry.remove(id));
            registry.insert(Arc::clone(&document));
            old
        };

        match old {
            Some(old) => {
                tracing::debug!(document = %normalized, old = %old.id(), new = %document.id(), "reloaded document");
                old.entry().invalidate(true);
                self.retarget(Some(old.id()), &normalized, None);
                self.invalidate(old.id());
            }
            None => self.retarget(None, &normalized, None),
        }
        Ok(document)
    }

    /// Get the document at `normalized`, fetching it from storage if absent.
    pub(crate) fn load(&self, normalized: &SmolStr) -> Result<Arc<Document>, StorageError> {
        self.load_for(normalized, None)
    }

    /// Like [`Corpus::load`], on behalf of the indexing pass of `requester`,
    /// which the load does not discard.
    pub(crate) fn load_for(
        &self,
        normalized: &SmolStr,
        requester: Option<DocumentId>,
    ) -> Result<Arc<Document>, StorageError> {
        if let Some(document) = self.lookup_path(normalized) {
            return Ok(document);
        }
        let source = self.storage.fetch(normalized)?;
        tracing::debug!(document = %normalized, "loaded document from storage");
        // A concurrent load of the same path may have won the race.
        Ok(self
            .insert(normalized.clone(), source, requester)
            .unwrap_or_else(|existing| existing))
    }

    fn build(&self, normalized: SmolStr, source: DocumentSource) -> Arc<Document> {
        let id = self.ids.issue();
        let (folder_path, _) = path::split(&normalized);
        let folder_path = SmolStr::new(folder_path);
        let document = Document::new(id, normalized, folder_path);
        document.replace_imports(source.imports);
        for name in source.definitions {
            document.add_definition(name);
        }
        Arc::new(document)
    }

    /// Register a new document, or return the one already at that path.
    fn insert(
        &self,
        normalized: SmolStr,
        source: DocumentSource,
        requester: Option<DocumentId>,
    ) -> Result<Arc<Document>, Arc<Document>> {
        if let Some(existing) = self.lookup_path(&normalized) {
            return Err(existing);
        }
        let document = self.build(normalized.clone(), source);
        {
            let mut registry = self.registry.write();
            if let Some(existing) = registry
                .by_path
                .get(&normalized)
                .and_then(|id| registry.documents.get(id))
            {
                return Err(Arc::clone(existing));
            }
            registry.insert(Arc::clone(&document));
        }
        self.retarget(None, &normalized, requester);
        Ok(document)
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Append an import to a document's import list.
    pub fn add_import(&self, id: DocumentId, import: Import) -> CorpusResult<()> {
        self.require(id)?.push_import(import);
        self.invalidate(id);
        Ok(())
    }

    /// Replace a document's import list.
    pub fn set_imports(&self, id: DocumentId, imports: Vec<Import>) -> CorpusResult<()> {
        self.require(id)?.replace_imports(imports);
        self.invalidate(id);
        Ok(())
    }

    /// Declare a top-level name in a document. Returns `false` if it was
    /// already declared.
    pub fn add_definition(&self, id: DocumentId, name: impl Into<SmolStr>) -> CorpusResult<bool> {
        Ok(self.require(id)?.add_definition(name.into()))
    }

    /// Force a document to be re-indexed on next use.
    pub fn mark_for_indexing(&self, id: DocumentId) -> CorpusResult<()> {
        self.require(id)?;
        self.invalidate(id);
        Ok(())
    }

    // ========================================================================
    // INVALIDATION
    // ========================================================================

    /// Invalidate `changed` and every document whose cached group reaches it.
    pub(crate) fn invalidate(&self, changed: DocumentId) {
        self.cascade(changed, None);
    }

    /// Invalidate `changed` and its dependents.
    ///
    /// An in-flight pass is discarded only if it may have read `changed`,
    /// unless it is the pass of `requester`.
    fn cascade(&self, changed: DocumentId, requester: Option<DocumentId>) {
        if let Some(document) = self.document(changed) {
            document.entry().invalidate(true);
        }

        let mut cascaded = 0usize;
        for document in self.documents() {
            if document.id() == changed {
                continue;
            }
            let entry = document.entry();
            let in_flight = entry.is_indexing()
                && requester != Some(document.id())
                && self.observes(&document, changed);
            if in_flight || entry.depends_on(changed) {
                entry.invalidate(false);
                cascaded += 1;
            }
        }
        tracing::trace!(document = %changed, cascaded, "invalidated");
    }

    /// Whether `changed` is reachable from `document` through localized
    /// targets or cached groups.
    fn observes(&self, document: &Document, changed: DocumentId) -> bool {
        let mut seen = FxHashSet::default();
        let mut stack = vec![document.id()];
        while let Some(id) = stack.pop() {
            if id == changed {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            let Some(current) = self.document(id) else {
                continue;
            };
            let entry = current.entry();
            if entry.depends_on(changed) {
                return true;
            }
            if let Some(targets) = entry.targets() {
                stack.extend(targets.edges.iter().map(|edge| edge.target));
            }
        }
        false
    }

    /// Invalidate every document whose localized imports point at `old` or
    /// failed to resolve `target_path`.
    fn retarget(&self, old: Option<DocumentId>, target_path: &str, requester: Option<DocumentId>) {
        let stale: Vec<DocumentId> = self
            .documents()
            .iter()
            .filter(|d| d.entry().targets_mention(old, target_path))
            .map(|d| d.id())
            .collect();
        for id in stale {
            self.cascade(id, requester);
        }
    }

    // ========================================================================
    // EVENTS
    // ========================================================================

    pub(crate) fn report(&self, level: StatusLevel, code: &str, document: &str, message: &str) {
        let sink = self.events.read().clone();
        sink.emit(level, code, document, message);
    }
}

impl Default for Corpus {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for Corpus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.read();
        f.debug_struct("Corpus")
            .field("documents", &registry.documents.len())
            .field("folders", &registry.folders.len())
            .field("events", &*self.events.read())
            .finish()
    }
}

/// Normalize a document path, rejecting folder paths.
fn document_path_of(document_path: &str) -> Result<SmolStr, PathError> {
    let normalized = path::resolve_relative(path::ROOT, document_path)?;
    if normalized.ends_with('/') {
        return Err(PathError::Empty);
    }
    Ok(normalized)
}
