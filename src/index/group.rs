//! Import priority groups, the result of indexing a document.

use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;

use crate::base::DocumentId;

/// The computed import priorities of one document.
///
/// An immutable snapshot: re-indexing builds a new group rather than
/// mutating a published one, so readers holding an `Arc` never see it change.
///
/// - `priority_order` maps every document visible by unqualified name to its
///   rank. Rank 0 is the owner itself; lower ranks win symbol conflicts.
/// - `moniker_priorities` maps each moniker to the document it denotes.
/// - `moniker_only` lists documents reached only through moniker-qualified
///   imports. They are reachable but not visible by unqualified name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportPriorityGroup {
    owner: DocumentId,
    priority_order: IndexMap<DocumentId, u32>,
    moniker_priorities: IndexMap<SmolStr, DocumentId>,
    moniker_only: IndexSet<DocumentId>,
    has_circular_import: bool,
}

impl ImportPriorityGroup {
    /// Build a group. `priority_order` must be in ascending rank order with
    /// the owner first.
    pub(crate) fn new(
        owner: DocumentId,
        priority_order: IndexMap<DocumentId, u32>,
        moniker_priorities: IndexMap<SmolStr, DocumentId>,
        moniker_only: IndexSet<DocumentId>,
        has_circular_import: bool,
    ) -> Self {
        debug_assert_eq!(priority_order.get_index(0), Some((&owner, &0)));
        Self {
            owner,
            priority_order,
            moniker_priorities,
            moniker_only,
            has_circular_import,
        }
    }

    /// The document these priorities belong to.
    pub fn owner(&self) -> DocumentId {
        self.owner
    }

    /// Rank of a document in the unqualified lookup order.
    pub fn priority(&self, document: DocumentId) -> Option<u32> {
        self.priority_order.get(&document).copied()
    }

    /// Documents visible by unqualified name, by ascending rank.
    pub fn priority_order(&self) -> impl Iterator<Item = (DocumentId, u32)> + '_ {
        self.priority_order.iter().map(|(&doc, &rank)| (doc, rank))
    }

    /// Number of documents in the priority order, the owner included.
    pub fn len(&self) -> usize {
        self.priority_order.len()
    }

    /// Always false: the owner is always present.
    pub fn is_empty(&self) -> bool {
        self.priority_order.is_empty()
    }

    /// Whether `document` is visible by unqualified name.
    pub fn contains(&self, document: DocumentId) -> bool {
        self.priority_order.contains_key(&document)
    }

    /// The document a moniker denotes.
    pub fn moniker(&self, moniker: &str) -> Option<DocumentId> {
        self.moniker_priorities.get(moniker).copied()
    }

    pub fn monikers(&self) -> impl Iterator<Item = (&SmolStr, DocumentId)> + '_ {
        self.moniker_priorities.iter().map(|(m, &doc)| (m, doc))
    }

    pub fn moniker_only(&self) -> impl Iterator<Item = DocumentId> + '_ {
        self.moniker_only.iter().copied()
    }

    /// Whether `document` is reachable from the owner at all.
    pub fn reaches(&self, document: DocumentId) -> bool {
        self.contains(document) || self.moniker_only.contains(&document)
    }

    /// Whether the owner takes part in an import cycle.
    pub fn has_circular_import(&self) -> bool {
        self.has_circular_import
    }
}
