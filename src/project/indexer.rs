//! Indexing orchestration for a corpus.
//!
//! `index_if_needed` claims the requested document, then:
//!
//! 1. walks every reachable document that still needs indexing, localizing
//!    its imports (resolving paths to documents, loading them if allowed);
//! 2. indexes those dependencies in post-order, so each pass can merge the
//!    groups of the documents below it;
//! 3. indexes the requested document itself.
//!
//! Only the top-level claim may wait for another caller. Dependency passes
//! use `try_claim` and skip documents someone else owns, walking them inline
//! instead, so two callers can never wait on each other.

use std::cell::Cell;
use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::base::{DocumentId, path};
use crate::error::CorpusResult;
use crate::events::codes;
use crate::index::priority::{ImportGraph, prioritize_imports};
use crate::index::state::{Claim, Edge, Targets};
use crate::index::ImportPriorityGroup;
use crate::model::{Document, Import, ResolveOptions};
use crate::project::Corpus;

impl Corpus {
    /// Return the import priorities of `id`, computing them if the document
    /// is dirty.
    ///
    /// Concurrent calls for the same document share one pass. Unresolved
    /// imports are reported through the event callback and dropped.
    #[tracing::instrument(level = "debug", skip_all, fields(document = %id))]
    pub fn index_if_needed(
        &self,
        id: DocumentId,
        options: &ResolveOptions,
    ) -> CorpusResult<Arc<ImportPriorityGroup>> {
        let document = self.require(id)?;
        let guard = match document.entry().claim() {
            Claim::Ready(group) => {
                tracing::trace!("import priorities cached");
                return Ok(group);
            }
            Claim::Owned(guard) => guard,
        };

        let graph = CorpusGraph {
            corpus: self,
            options,
            owner: Cell::new(id),
        };

        let pending = graph.collect_pending(id);
        for dependency in &pending {
            let Some(dependency_guard) = dependency.entry().try_claim() else {
                tracing::trace!(dependency = %dependency.path(), "dependency owned elsewhere");
                continue;
            };
            let group = graph.run_pass(dependency);
            dependency_guard.complete(group);
        }

        let group = graph.run_pass(&document);
        Ok(guard.complete(group))
    }

    /// Index every document in the corpus, in parallel.
    ///
    /// Returns the groups in document creation order. Documents removed
    /// while this runs are skipped.
    pub fn index_all(&self, options: &ResolveOptions) -> Vec<Arc<ImportPriorityGroup>> {
        let documents = self.documents();
        tracing::debug!(count = documents.len(), "indexing corpus");
        documents
            .par_iter()
            .filter_map(|document| self.index_if_needed(document.id(), options).ok())
            .collect()
    }

    /// The import targets of `document`, resolved against the corpus.
    ///
    /// Cached on the document until its imports change or a target is
    /// created, removed or reloaded. Targets localized without loading are
    /// localized again when `options` allow loading their unresolved paths.
    ///
    /// Documents loaded here do not discard the in-flight pass of `owner`.
    pub(crate) fn localize(
        &self,
        document: &Document,
        options: &ResolveOptions,
        owner: DocumentId,
    ) -> Targets {
        let entry = document.entry();
        if let Some(targets) = entry.targets() {
            if !targets.may_load_unresolved(options) {
                return targets;
            }
            tracing::trace!(document = %document.path(), "localizing again with loading enabled");
            entry.forget_targets();
        }

        let epoch = entry.targets_epoch();
        let imports = document.imports();
        let mut edges = Vec::with_capacity(imports.len());
        let mut unresolved = Vec::new();
        for import in imports.iter() {
            match self.resolve_import(document, import, options, owner) {
                Ok(target) => edges.push(Edge {
                    target,
                    moniker: import.moniker().cloned(),
                }),
                Err(target_path) => unresolved.push(target_path),
            }
        }

        entry.store_targets(
            epoch,
            Targets {
                edges: edges.into(),
                unresolved: unresolved.into(),
                loaded: options.loads_imports(),
            },
        )
    }

    /// Resolve one import to a document, or to the path that failed.
    fn resolve_import(
        &self,
        document: &Document,
        import: &Import,
        options: &ResolveOptions,
        owner: DocumentId,
    ) -> Result<DocumentId, SmolStr> {
        let target_path = match path::resolve_relative(document.folder_path(), import.target_path()) {
            Ok(target_path) => target_path,
            Err(err) => {
                self.report_unresolved(document, import, options, &err.to_string());
                return Err(SmolStr::new(import.target_path()));
            }
        };

        if let Some(target) = self.lookup_path(&target_path) {
            return Ok(target.id());
        }
        if !options.loads_imports() {
            self.report_unresolved(document, import, options, "not in corpus and loading is disabled");
            return Err(target_path);
        }
        match self.load_for(&target_path, Some(owner)) {
            Ok(target) => Ok(target.id()),
            Err(err) => {
                self.report_unresolved(document, import, options, &err.to_string());
                Err(target_path)
            }
        }
    }

    fn report_unresolved(&self, document: &Document, import: &Import, options: &ResolveOptions, reason: &str) {
        self.report(
            options.unresolved_level(),
            codes::UNRESOLVED_IMPORT,
            document.path(),
            &format!("Unable to resolve the import '{}': {reason}", import.target_path()),
        );
    }
}

/// The corpus seen as an import graph for one indexing request.
struct CorpusGraph<'a> {
    corpus: &'a Corpus,
    options: &'a ResolveOptions,
    /// Document whose pass is running.
    owner: Cell<DocumentId>,
}

struct PendingFrame {
    document: Arc<Document>,
    edges: Arc<[Edge]>,
    next: usize,
}

impl CorpusGraph<'_> {
    /// Documents reachable from `root` that need indexing, in post-order,
    /// excluding `root`.
    ///
    /// Indexed documents are not descended into; their groups already cover
    /// everything below them.
    fn collect_pending(&self, root: DocumentId) -> Vec<Arc<Document>> {
        let Some(root_document) = self.corpus.document(root) else {
            return Vec::new();
        };
        let mut pending = Vec::new();
        let mut seen = FxHashSet::default();
        seen.insert(root);

        let edges = self.corpus.localize(&root_document, self.options, root).edges;
        let mut stack = vec![PendingFrame {
            document: root_document,
            edges,
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(target) = frame.edges.get(frame.next).map(|edge| edge.target) else {
                if let Some(done) = stack.pop() {
                    if done.document.id() != root {
                        pending.push(done.document);
                    }
                }
                continue;
            };
            frame.next += 1;

            if !seen.insert(target) {
                continue;
            }
            let Some(document) = self.corpus.document(target) else {
                continue;
            };
            if !document.needs_indexing() {
                continue;
            }
            let edges = self.corpus.localize(&document, self.options, root).edges;
            stack.push(PendingFrame {
                document,
                edges,
                next: 0,
            });
        }

        tracing::debug!(dependencies = pending.len(), "collected dependencies to index");
        pending
    }

    fn run_pass(&self, document: &Document) -> ImportPriorityGroup {
        self.owner.set(document.id());
        let group = prioritize_imports(self, document.id());
        tracing::debug!(
            document = %document.path(),
            visible = group.len(),
            circular = group.has_circular_import(),
            "indexed document"
        );
        group
    }
}

impl ImportGraph for CorpusGraph<'_> {
    fn edges(&self, document: DocumentId) -> Arc<[Edge]> {
        match self.corpus.document(document) {
            Some(document) => self.corpus.localize(&document, self.options, self.owner.get()).edges,
            None => Arc::from(Vec::new()),
        }
    }

    fn cached_group(&self, document: DocumentId) -> Option<Arc<ImportPriorityGroup>> {
        self.corpus.document(document)?.import_priorities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventCollector, StatusLevel};
    use crate::model::ImportsLoadStrategy;
    use crate::project::{DocumentSource, MemoryAdapter};

    fn corpus_with(paths: &[&str]) -> (Corpus, Vec<DocumentId>) {
        let corpus = Corpus::in_memory();
        let ids = paths
            .iter()
            .map(|p| corpus.create_document(p).unwrap().id())
            .collect();
        (corpus, ids)
    }

    #[test]
    fn test_index_marks_dependencies_indexed() {
        let (corpus, ids) = corpus_with(&["/A.cdm.json", "/B.cdm.json", "/C.cdm.json"]);
        corpus.add_import(ids[0], Import::new("B.cdm.json")).unwrap();
        corpus.add_import(ids[1], Import::new("C.cdm.json")).unwrap();

        corpus.index_if_needed(ids[0], &ResolveOptions::new()).unwrap();
        for id in &ids {
            assert!(!corpus.document(*id).unwrap().needs_indexing());
        }
        let b = corpus.document(ids[1]).unwrap().import_priorities().unwrap();
        assert_eq!(b.priority(ids[2]), Some(1));
    }

    #[test]
    fn test_relative_imports_resolve_from_folder() {
        let (corpus, ids) = corpus_with(&["/core/A.cdm.json", "/core/B.cdm.json", "/base.cdm.json"]);
        corpus.add_import(ids[0], Import::new("B.cdm.json")).unwrap();
        corpus.add_import(ids[0], Import::new("../base.cdm.json")).unwrap();

        let group = corpus.index_if_needed(ids[0], &ResolveOptions::new()).unwrap();
        assert_eq!(group.priority(ids[1]), Some(1));
        assert_eq!(group.priority(ids[2]), Some(2));
    }

    #[test]
    fn test_lazy_load_fetches_missing_targets() {
        let storage = Arc::new(MemoryAdapter::new());
        storage
            .insert("/B.cdm.json", DocumentSource::new().with_import(Import::new("C.cdm.json")))
            .unwrap();
        storage.insert("/C.cdm.json", DocumentSource::new()).unwrap();
        let corpus = Corpus::with_storage(storage.clone());
        let a = corpus.create_document("/A.cdm.json").unwrap();
        corpus.add_import(a.id(), Import::new("B.cdm.json")).unwrap();

        let group = corpus.index_if_needed(a.id(), &ResolveOptions::new()).unwrap();
        assert_eq!(group.len(), 3);
        assert_eq!(storage.fetch_count(), 2);
        assert_eq!(corpus.document_count(), 3);
    }

    #[test]
    fn test_do_not_load_reports_unresolved() {
        let storage = Arc::new(MemoryAdapter::new());
        storage.insert("/B.cdm.json", DocumentSource::new()).unwrap();
        let corpus = Corpus::with_storage(storage.clone());
        let collector = EventCollector::new();
        corpus.set_event_callback(collector.clone(), StatusLevel::Warning);

        let a = corpus.create_document("/A.cdm.json").unwrap();
        corpus.add_import(a.id(), Import::new("B.cdm.json")).unwrap();
        let options = ResolveOptions::new().with_imports_load_strategy(ImportsLoadStrategy::DoNotLoad);

        let group = corpus.index_if_needed(a.id(), &options).unwrap();
        assert_eq!(group.len(), 1);
        assert_eq!(storage.fetch_count(), 0);
        assert_eq!(collector.error_count(), 1);
        assert_eq!(collector.messages_containing(codes::UNRESOLVED_IMPORT).len(), 1);
    }

    #[test]
    fn test_second_call_is_cached() {
        let (corpus, ids) = corpus_with(&["/A.cdm.json", "/B.cdm.json"]);
        corpus.add_import(ids[0], Import::new("B.cdm.json")).unwrap();

        let first = corpus.index_if_needed(ids[0], &ResolveOptions::new()).unwrap();
        let second = corpus.index_if_needed(ids[0], &ResolveOptions::new()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_created_target_resolves_after_failure() {
        let (corpus, ids) = corpus_with(&["/A.cdm.json"]);
        corpus.add_import(ids[0], Import::new("B.cdm.json")).unwrap();

        let before = corpus.index_if_needed(ids[0], &ResolveOptions::new()).unwrap();
        assert_eq!(before.len(), 1);

        let b = corpus.create_document("/B.cdm.json").unwrap();
        assert!(corpus.document(ids[0]).unwrap().needs_indexing());
        let after = corpus.index_if_needed(ids[0], &ResolveOptions::new()).unwrap();
        assert_eq!(after.priority(b.id()), Some(1));
    }

    #[test]
    fn test_changing_dependency_invalidates_dependents() {
        let (corpus, ids) = corpus_with(&["/A.cdm.json", "/B.cdm.json", "/C.cdm.json"]);
        corpus.add_import(ids[0], Import::new("B.cdm.json")).unwrap();
        corpus.index_if_needed(ids[0], &ResolveOptions::new()).unwrap();

        corpus.add_import(ids[1], Import::new("C.cdm.json")).unwrap();
        assert!(corpus.document(ids[0]).unwrap().needs_indexing());
        assert!(corpus.document(ids[1]).unwrap().needs_indexing());

        let group = corpus.index_if_needed(ids[0], &ResolveOptions::new()).unwrap();
        assert_eq!(group.priority(ids[2]), Some(2));
    }
}
