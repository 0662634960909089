//! Per-document index state.
//!
//! Each document owns one [`IndexEntry`]. Together, the entries of a corpus
//! form its memoization table, keyed by document identity:
//!
//! ```text
//!            claim / try_claim           complete
//!   Dirty ─────────────────────▶ Indexing ─────────▶ Indexed(group)
//!     ▲                              │                     │
//!     └──────── guard dropped ───────┘                     │
//!     └────────────────────── invalidate ──────────────────┘
//! ```
//!
//! A caller that finds the entry `Indexing` waits on the entry's condition
//! variable instead of starting a second pass.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use smol_str::SmolStr;

use crate::base::DocumentId;
use crate::index::ImportPriorityGroup;
use crate::model::ResolveOptions;

/// Indexing state of a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexState {
    Dirty,
    Indexing,
    Indexed(Arc<ImportPriorityGroup>),
}

/// A resolved import edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Edge {
    pub target: DocumentId,
    pub moniker: Option<SmolStr>,
}

/// Import targets localized for one document, in declaration order.
#[derive(Clone, Debug)]
pub(crate) struct Targets {
    /// Resolved edges. Unresolved imports are dropped.
    pub edges: Arc<[Edge]>,
    /// Absolute paths that failed to resolve.
    pub unresolved: Arc<[SmolStr]>,
    /// Whether missing targets were fetched from storage.
    pub loaded: bool,
}

impl Targets {
    /// Whether `options` may resolve paths these targets left unresolved.
    pub(crate) fn may_load_unresolved(&self, options: &ResolveOptions) -> bool {
        !self.loaded && options.loads_imports() && !self.unresolved.is_empty()
    }
}

#[derive(Debug)]
struct EntryInner {
    state: IndexState,
    /// Bumped on every invalidation. A pass only publishes its group if
    /// the generation it started under is still current.
    generation: u64,
    targets: Option<Targets>,
    /// Bumped when targets are forgotten.
    targets_epoch: u64,
}

#[derive(Debug)]
pub(crate) struct IndexEntry {
    inner: Mutex<EntryInner>,
    ready: Condvar,
}

/// Outcome of [`IndexEntry::claim`].
pub(crate) enum Claim<'a> {
    Ready(Arc<ImportPriorityGroup>),
    Owned(IndexGuard<'a>),
}

impl IndexEntry {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(EntryInner {
                state: IndexState::Dirty,
                generation: 0,
                targets: None,
                targets_epoch: 0,
            }),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn state(&self) -> IndexState {
        self.inner.lock().state.clone()
    }

    pub(crate) fn cached_group(&self) -> Option<Arc<ImportPriorityGroup>> {
        match &self.inner.lock().state {
            IndexState::Indexed(group) => Some(Arc::clone(group)),
            _ => None,
        }
    }

    pub(crate) fn needs_indexing(&self) -> bool {
        !matches!(self.inner.lock().state, IndexState::Indexed(_))
    }

    /// Get the cached group, wait for an in-flight pass, or take ownership
    /// of a new pass.
    pub(crate) fn claim(&self) -> Claim<'_> {
        let mut inner = self.inner.lock();
        loop {
            if let IndexState::Indexed(group) = &inner.state {
                return Claim::Ready(Arc::clone(group));
            }
            if inner.state == IndexState::Indexing {
                self.ready.wait(&mut inner);
                continue;
            }
            inner.state = IndexState::Indexing;
            return Claim::Owned(IndexGuard {
                entry: self,
                generation: inner.generation,
                finished: false,
            });
        }
    }

    /// Take ownership of a pass only if the entry is dirty. Never waits.
    pub(crate) fn try_claim(&self) -> Option<IndexGuard<'_>> {
        let mut inner = self.inner.lock();
        if inner.state != IndexState::Dirty {
            return None;
        }
        inner.state = IndexState::Indexing;
        Some(IndexGuard {
            entry: self,
            generation: inner.generation,
            finished: false,
        })
    }

    /// Drop the cached group. An in-flight pass will not publish.
    pub(crate) fn invalidate(&self, forget_targets: bool) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        if matches!(inner.state, IndexState::Indexed(_)) {
            inner.state = IndexState::Dirty;
        }
        if forget_targets {
            inner.targets = None;
            inner.targets_epoch += 1;
        }
    }

    pub(crate) fn is_indexing(&self) -> bool {
        self.inner.lock().state == IndexState::Indexing
    }

    /// Whether the cached group reaches `document`.
    pub(crate) fn depends_on(&self, document: DocumentId) -> bool {
        match &self.inner.lock().state {
            IndexState::Indexed(group) => group.reaches(document),
            _ => false,
        }
    }

    /// Whether the localized targets point at `document` or failed on `path`.
    pub(crate) fn targets_mention(&self, document: Option<DocumentId>, path: &str) -> bool {
        let inner = self.inner.lock();
        let Some(targets) = &inner.targets else {
            return false;
        };
        targets.edges.iter().any(|e| Some(e.target) == document)
            || targets.unresolved.iter().any(|p| p == path)
    }

    pub(crate) fn targets(&self) -> Option<Targets> {
        self.inner.lock().targets.clone()
    }

    /// Drop the localized targets without touching the index state.
    pub(crate) fn forget_targets(&self) {
        let mut inner = self.inner.lock();
        inner.targets = None;
        inner.targets_epoch += 1;
    }

    pub(crate) fn targets_epoch(&self) -> u64 {
        self.inner.lock().targets_epoch
    }

    /// Cache localized targets computed under `epoch`.
    ///
    /// Returns the targets now cached, which are another caller's if that
    /// caller stored first.
    pub(crate) fn store_targets(&self, epoch: u64, targets: Targets) -> Targets {
        let mut inner = self.inner.lock();
        if inner.targets_epoch != epoch {
            return targets;
        }
        inner.targets.get_or_insert(targets).clone()
    }
}

impl Default for IndexEntry {
    fn default() -> Self {
        Self::new()
    }
}

/// Ownership of one indexing pass.
///
/// Dropping the guard without completing it puts the entry back to `Dirty`.
pub(crate) struct IndexGuard<'a> {
    entry: &'a IndexEntry,
    generation: u64,
    finished: bool,
}

impl IndexGuard<'_> {
    /// Publish the group computed by this pass and wake waiters.
    ///
    /// If the entry was invalidated meanwhile the group is returned to the
    /// caller but not cached.
    pub(crate) fn complete(mut self, group: ImportPriorityGroup) -> Arc<ImportPriorityGroup> {
        let group = Arc::new(group);
        let mut inner = self.entry.inner.lock();
        inner.state = if inner.generation == self.generation {
            IndexState::Indexed(Arc::clone(&group))
        } else {
            tracing::debug!(owner = %group.owner(), "document changed while indexing, result not cached");
            IndexState::Dirty
        };
        self.finished = true;
        drop(inner);
        self.entry.ready.notify_all();
        group
    }
}

impl Drop for IndexGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut inner = self.entry.inner.lock();
        if inner.state == IndexState::Indexing {
            inner.state = IndexState::Dirty;
        }
        drop(inner);
        self.entry.ready.notify_all();
    }
}
