//! Resolution options threaded through indexing and lookup.

use crate::base::DocumentId;
use crate::events::StatusLevel;

/// How import targets missing from the corpus are handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImportsLoadStrategy {
    /// Fetch missing targets through the storage adapter while indexing.
    #[default]
    LazyLoad,
    /// Only resolve targets already present in the corpus.
    DoNotLoad,
    /// Like `LazyLoad`, and fetching a document indexes it immediately.
    Load,
}

/// Immutable context for indexing and symbol lookup.
///
/// The priority engine only consults these to pick the severity of
/// unresolved-import reports; the validation flags are for lookup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ResolveOptions {
    wrt_document: Option<DocumentId>,
    strict_validation: bool,
    shallow_validation: bool,
    imports_load_strategy: ImportsLoadStrategy,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for work performed with respect to `document`.
    pub fn for_document(document: DocumentId) -> Self {
        Self {
            wrt_document: Some(document),
            ..Self::default()
        }
    }

    pub fn with_strict_validation(mut self, strict: bool) -> Self {
        self.strict_validation = strict;
        self
    }

    pub fn with_shallow_validation(mut self, shallow: bool) -> Self {
        self.shallow_validation = shallow;
        self
    }

    pub fn with_imports_load_strategy(mut self, strategy: ImportsLoadStrategy) -> Self {
        self.imports_load_strategy = strategy;
        self
    }

    pub fn wrt_document(&self) -> Option<DocumentId> {
        self.wrt_document
    }

    pub fn strict_validation(&self) -> bool {
        self.strict_validation
    }

    pub fn shallow_validation(&self) -> bool {
        self.shallow_validation
    }

    pub fn imports_load_strategy(&self) -> ImportsLoadStrategy {
        self.imports_load_strategy
    }

    /// Whether missing import targets may be fetched from storage.
    pub fn loads_imports(&self) -> bool {
        self.imports_load_strategy != ImportsLoadStrategy::DoNotLoad
    }

    /// Severity for unresolved imports and references.
    pub fn unresolved_level(&self) -> StatusLevel {
        if self.shallow_validation {
            StatusLevel::Warning
        } else {
            StatusLevel::Error
        }
    }
}
