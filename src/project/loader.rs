//! Bulk loading of documents from storage.

use rayon::prelude::*;
use smol_str::SmolStr;

use crate::base::{DocumentId, path};
use crate::error::StorageError;
use crate::events::{StatusLevel, codes};
use crate::project::Corpus;

/// Outcome of [`Corpus::load_documents`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Documents now in the corpus, in request order.
    pub loaded: Vec<DocumentId>,
    /// Paths that failed to load, with the reason.
    pub failed: Vec<(SmolStr, StorageError)>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl Corpus {
    /// Load many documents from storage in parallel.
    ///
    /// Documents already in the corpus are not fetched again. A failed path
    /// is reported with [`codes::DOCUMENT_LOAD_FAILED`] and does not stop
    /// the others.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn load_documents<I, S>(&self, paths: I) -> LoadReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths: Vec<String> = paths.into_iter().map(|p| p.as_ref().to_string()).collect();

        let results: Vec<_> = paths
            .par_iter()
            .map(|requested| {
                let loaded = path::resolve_relative(path::ROOT, requested)
                    .map_err(|err| StorageError::Invalid {
                        path: SmolStr::new(requested),
                        message: err.to_string(),
                    })
                    .and_then(|normalized| self.load(&normalized));
                (requested, loaded)
            })
            .collect();

        let mut report = LoadReport::default();
        for (requested, loaded) in results {
            match loaded {
                Ok(document) => report.loaded.push(document.id()),
                Err(err) => {
                    self.report(StatusLevel::Error, codes::DOCUMENT_LOAD_FAILED, requested, &err.to_string());
                    report.failed.push((SmolStr::new(requested), err));
                }
            }
        }
        tracing::debug!(loaded = report.loaded.len(), failed = report.failed.len(), "loaded documents");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::events::EventCollector;
    use crate::project::{DocumentSource, MemoryAdapter};

    #[test]
    fn test_load_documents_keeps_request_order() {
        let storage = Arc::new(MemoryAdapter::new());
        for name in ["A", "B", "C", "D"] {
            storage
                .insert(&format!("/{name}.cdm.json"), DocumentSource::new().with_definition(name))
                .unwrap();
        }
        let corpus = Corpus::with_storage(storage.clone());

        let report = corpus.load_documents(["/D.cdm.json", "/A.cdm.json", "B.cdm.json", "/C.cdm.json"]);
        assert!(report.is_complete());
        let paths: Vec<_> = report
            .loaded
            .iter()
            .map(|id| corpus.document(*id).unwrap().path().to_string())
            .collect();
        assert_eq!(paths, vec!["/D.cdm.json", "/A.cdm.json", "/B.cdm.json", "/C.cdm.json"]);
    }

    #[test]
    fn test_load_documents_reports_failures() {
        let storage = Arc::new(MemoryAdapter::new());
        storage.insert("/A.cdm.json", DocumentSource::new()).unwrap();
        let corpus = Corpus::with_storage(storage.clone());
        let collector = EventCollector::new();
        corpus.set_event_callback(collector.clone(), StatusLevel::Error);

        let report = corpus.load_documents(["/A.cdm.json", "/missing.cdm.json", "/../escape.cdm.json"]);
        assert_eq!(report.loaded.len(), 1);
        assert_eq!(report.failed.len(), 2);
        assert!(matches!(report.failed[0].1, StorageError::NotFound(_)));
        assert!(matches!(report.failed[1].1, StorageError::Invalid { .. }));
        assert_eq!(collector.messages_containing(codes::DOCUMENT_LOAD_FAILED).len(), 2);
    }

    #[test]
    fn test_load_documents_skips_known_documents() {
        let storage = Arc::new(MemoryAdapter::new());
        storage.insert("/A.cdm.json", DocumentSource::new()).unwrap();
        let corpus = Corpus::with_storage(storage.clone());

        let first = corpus.load_documents(["/A.cdm.json"]);
        let second = corpus.load_documents(["/A.cdm.json", "/A.cdm.json"]);
        assert_eq!(second.loaded, vec![first.loaded[0], first.loaded[0]]);
        assert_eq!(storage.fetch_count(), 1);
    }
}
