//! Document instance identifiers.
//!
//! A [`DocumentId`] names one loaded *instance* of a document, not its path.
//! Every create, load or reload issues a fresh id from the corpus'
//! [`IdAllocator`], and ids are never reused. A group that still holds the id
//! of a replaced instance therefore cannot be mistaken for one that ranks the
//! new instance.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Handle to one document instance in a corpus.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct DocumentId(u32);

impl DocumentId {
    /// Wrap a raw index. Ids handed out by a corpus come from its allocator;
    /// this is for tables and tests that need a known id.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// Issues increasing document ids, safe to share between indexing threads.
#[derive(Debug, Default)]
pub(crate) struct IdAllocator {
    next: AtomicU32,
}

impl IdAllocator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A fresh id, distinct from every id issued before.
    pub(crate) fn issue(&self) -> DocumentId {
        DocumentId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
