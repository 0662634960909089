//! Import priority resolution.
//!
//! Computes a document's [`ImportPriorityGroup`] by a depth-first walk of
//! the import graph in declaration order, using an explicit frame stack.
//!
//! # Rules
//!
//! - A document gets its rank when first discovered (pre-order). Later
//!   encounters never renumber it.
//! - A document is visible by unqualified name iff at least one edge into it
//!   carries no moniker. Reached-only-by-moniker documents are dropped from
//!   the priority order at the end of the walk and kept in `moniker_only`.
//! - Moniker bindings are registered when a document's frame is left
//!   (post-order) and overwrite earlier ones. The declaration closest to the
//!   root wins; within one document the last declared import wins.
//! - Reaching an already covered document replays the bindings its subtree
//!   produced, so a binding never depends on which route saw it first, nor
//!   on whether that route was walked or merged from a cache.
//! - A non-circular cached group is merged instead of walked. Its members are
//!   considered covered and are not expanded again. A circular cached group
//!   is ordered from its own owner, so its owner is walked inline instead.
//! - The root is circular iff some edge leads back to it while it is on the
//!   stack. The visiting set belongs to this walk only.

use std::sync::Arc;

use indexmap::map::Entry;
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use crate::base::DocumentId;
use crate::index::state::Edge;
use crate::index::ImportPriorityGroup;

/// The view of the corpus the walk needs.
pub(crate) trait ImportGraph {
    /// Resolved imports of `document`, in declaration order.
    fn edges(&self, document: DocumentId) -> Arc<[Edge]>;

    /// The published group of `document`, if it is indexed.
    fn cached_group(&self, document: DocumentId) -> Option<Arc<ImportPriorityGroup>>;
}

/// Compute the import priorities of `root`.
pub(crate) fn prioritize_imports<G>(graph: &G, root: DocumentId) -> ImportPriorityGroup
where
    G: ImportGraph + ?Sized,
{
    PriorityWalk::new(graph, root).run()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reach {
    MonikerOnly,
    Included,
}

struct Frame {
    document: DocumentId,
    edges: Arc<[Edge]>,
    next: usize,
    /// Start of this document's bindings in the moniker log.
    log_start: usize,
}

struct PriorityWalk<'g, G: ?Sized> {
    graph: &'g G,
    root: DocumentId,
    /// Discovery order doubles as provisional rank order.
    reach: IndexMap<DocumentId, Reach>,
    monikers: IndexMap<SmolStr, DocumentId>,
    /// Every binding in registration order, replays included.
    moniker_log: Vec<(SmolStr, DocumentId)>,
    /// The bindings each finished document produced, deduplicated.
    produced: FxHashMap<DocumentId, Arc<[(SmolStr, DocumentId)]>>,
    stack: Vec<Frame>,
    visiting: FxHashSet<DocumentId>,
    /// Documents whose imports are walked or summarized by a merge.
    covered: FxHashSet<DocumentId>,
    circular: bool,
}

impl<'g, G> PriorityWalk<'g, G>
where
    G: ImportGraph + ?Sized,
{
    fn new(graph: &'g G, root: DocumentId) -> Self {
        Self {
            graph,
            root,
            reach: IndexMap::new(),
            monikers: IndexMap::new(),
            moniker_log: Vec::new(),
            produced: FxHashMap::default(),
            stack: Vec::new(),
            visiting: FxHashSet::default(),
            covered: FxHashSet::default(),
            circular: false,
        }
    }

    fn run(mut self) -> ImportPriorityGroup {
        self.reach.insert(self.root, Reach::Included);
        self.covered.insert(self.root);
        self.enter(self.root);

        loop {
            let Some(frame) = self.stack.last_mut() else {
                break;
            };
            match frame.edges.get(frame.next).cloned() {
                Some(edge) => {
                    frame.next += 1;
                    self.visit(edge);
                }
                None => {
                    if let Some(frame) = self.stack.pop() {
                        self.leave(frame);
                    }
                }
            }
        }

        self.finish()
    }

    fn visit(&mut self, edge: Edge) {
        let target = edge.target;
        self.mark_reached(target, edge.moniker.is_none());

        if self.visiting.contains(&target) {
            if target == self.root && !self.circular {
                tracing::debug!(root = %self.root, from = ?self.stack.last().map(|f| f.document), "import cycle through root");
                self.circular = true;
            }
            return;
        }
        if !self.covered.insert(target) {
            self.replay(target);
            return;
        }

        match self.graph.cached_group(target) {
            Some(group) if !group.has_circular_import() => self.merge(&group),
            _ => self.enter(target),
        }
    }

    fn enter(&mut self, document: DocumentId) {
        let edges = self.graph.edges(document);
        self.visiting.insert(document);
        self.stack.push(Frame {
            document,
            edges,
            next: 0,
            log_start: self.moniker_log.len(),
        });
    }

    fn leave(&mut self, frame: Frame) {
        self.visiting.remove(&frame.document);
        for edge in frame.edges.iter() {
            if let Some(moniker) = &edge.moniker {
                self.bind(moniker.clone(), edge.target);
            }
        }
        let produced = self.compact_log(frame.log_start);
        self.produced.insert(frame.document, produced);
    }

    /// Fold the log from `start` to one entry per moniker, keeping first
    /// appearance order and the last bound document.
    fn compact_log(&mut self, start: usize) -> Arc<[(SmolStr, DocumentId)]> {
        let mut folded: IndexMap<SmolStr, DocumentId> = IndexMap::new();
        for (moniker, document) in self.moniker_log.drain(start..) {
            folded.insert(moniker, document);
        }
        let folded: Arc<[(SmolStr, DocumentId)]> = folded.into_iter().collect();
        self.moniker_log.extend(folded.iter().cloned());
        folded
    }

    fn bind(&mut self, moniker: SmolStr, document: DocumentId) {
        self.monikers.insert(moniker.clone(), document);
        self.moniker_log.push((moniker, document));
    }

    /// Re-apply the bindings produced below a covered document.
    fn replay(&mut self, document: DocumentId) {
        let bindings: Arc<[(SmolStr, DocumentId)]> = match self.produced.get(&document) {
            Some(bindings) => Arc::clone(bindings),
            // Covered by a merge: its own cached group holds the bindings.
            None => match self.graph.cached_group(document) {
                Some(group) if !group.has_circular_import() => {
                    group.monikers().map(|(m, d)| (m.clone(), d)).collect()
                }
                _ => return,
            },
        };
        for (moniker, target) in bindings.iter() {
            self.bind(moniker.clone(), *target);
        }
    }

    /// Fold a cached, non-circular group in place of walking its owner.
    fn merge(&mut self, group: &ImportPriorityGroup) {
        tracing::trace!(root = %self.root, owner = %group.owner(), "merging cached import priorities");
        for (document, _) in group.priority_order().skip(1) {
            self.mark_reached(document, true);
            self.covered.insert(document);
        }
        for document in group.moniker_only() {
            self.mark_reached(document, false);
            self.covered.insert(document);
        }
        for (moniker, document) in group.monikers() {
            self.bind(moniker.clone(), document);
        }
        let produced = group.monikers().map(|(m, d)| (m.clone(), d)).collect();
        self.produced.insert(group.owner(), produced);
    }

    /// Record an edge into `document`. Inclusion only ever upgrades.
    fn mark_reached(&mut self, document: DocumentId, unqualified: bool) {
        let reach = if unqualified {
            Reach::Included
        } else {
            Reach::MonikerOnly
        };
        match self.reach.entry(document) {
            Entry::Occupied(mut entry) => {
                if reach == Reach::Included {
                    *entry.get_mut() = Reach::Included;
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(reach);
            }
        }
    }

    fn finish(self) -> ImportPriorityGroup {
        let mut priority_order = IndexMap::with_capacity(self.reach.len());
        let mut moniker_only = IndexSet::new();
        for (document, reach) in self.reach {
            match reach {
                Reach::Included => {
                    let rank = priority_order.len() as u32;
                    priority_order.insert(document, rank);
                }
                Reach::MonikerOnly => {
                    moniker_only.insert(document);
                }
            }
        }

        ImportPriorityGroup::new(
            self.root,
            priority_order,
            self.monikers,
            moniker_only,
            self.circular,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An in-memory import graph with an optional set of cached groups.
    #[derive(Default)]
    struct TestGraph {
        edges: FxHashMap<DocumentId, Vec<Edge>>,
        cached: FxHashMap<DocumentId, Arc<ImportPriorityGroup>>,
    }

    impl TestGraph {
        fn import(&mut self, from: u32, to: u32) -> &mut Self {
            self.add(from, to, None)
        }

        fn import_as(&mut self, from: u32, to: u32, moniker: &str) -> &mut Self {
            self.add(from, to, Some(SmolStr::new(moniker)))
        }

        fn add(&mut self, from: u32, to: u32, moniker: Option<SmolStr>) -> &mut Self {
            self.edges.entry(doc(from)).or_default().push(Edge {
                target: doc(to),
                moniker,
            });
            self
        }

        /// Index `document` and cache its group, as a corpus would.
        fn index(&mut self, document: u32) -> Arc<ImportPriorityGroup> {
            let group = Arc::new(prioritize_imports(&*self, doc(document)));
            self.cached.insert(doc(document), Arc::clone(&group));
            group
        }

        fn invalidate_all(&mut self) {
            self.cached.clear();
        }
    }

    impl ImportGraph for TestGraph {
        fn edges(&self, document: DocumentId) -> Arc<[Edge]> {
            self.edges.get(&document).cloned().unwrap_or_default().into()
        }

        fn cached_group(&self, document: DocumentId) -> Option<Arc<ImportPriorityGroup>> {
            self.cached.get(&document).cloned()
        }
    }

    fn doc(id: u32) -> DocumentId {
        DocumentId::new(id)
    }

    fn order(group: &ImportPriorityGroup) -> Vec<u32> {
        group.priority_order().map(|(d, _)| d.index()).collect()
    }

    #[test]
    fn test_no_imports() {
        let graph = TestGraph::default();
        let group = prioritize_imports(&graph, doc(0));

        assert_eq!(order(&group), vec![0]);
        assert_eq!(group.priority(doc(0)), Some(0));
        assert_eq!(group.monikers().count(), 0);
        assert!(!group.has_circular_import());
    }

    #[test]
    fn test_depth_first_declaration_order() {
        // 0 -> 1 -> 3, 0 -> 2
        let mut graph = TestGraph::default();
        graph.import(0, 1).import(0, 2).import(1, 3);

        let group = prioritize_imports(&graph, doc(0));
        assert_eq!(order(&group), vec![0, 1, 3, 2]);
        assert_eq!(group.priority(doc(2)), Some(3));
    }

    #[test]
    fn test_first_discovery_keeps_rank() {
        // 0 -> 1 -> 2, 0 -> 2
        let mut graph = TestGraph::default();
        graph.import(0, 1).import(1, 2).import(0, 2);

        let group = prioritize_imports(&graph, doc(0));
        assert_eq!(order(&group), vec![0, 1, 2]);
    }

    #[test]
    fn test_monikered_only_target_is_excluded() {
        let mut graph = TestGraph::default();
        graph.import_as(0, 1, "m");

        let group = prioritize_imports(&graph, doc(0));
        assert_eq!(order(&group), vec![0]);
        assert_eq!(group.moniker("m"), Some(doc(1)));
        assert_eq!(group.moniker_only().collect::<Vec<_>>(), vec![doc(1)]);
    }

    #[test]
    fn test_unqualified_path_wins_over_moniker() {
        // 0 -(m)-> 1, 0 -> 2 -> 1
        let mut graph = TestGraph::default();
        graph.import_as(0, 1, "m").import(0, 2).import(2, 1);

        let group = prioritize_imports(&graph, doc(0));
        // 1 keeps the rank from its first (monikered) discovery.
        assert_eq!(order(&group), vec![0, 1, 2]);
        assert_eq!(group.moniker("m"), Some(doc(1)));
        assert_eq!(group.moniker_only().count(), 0);
    }

    #[test]
    fn test_self_import_is_circular() {
        let mut graph = TestGraph::default();
        graph.import(0, 0);

        let group = prioritize_imports(&graph, doc(0));
        assert_eq!(order(&group), vec![0]);
        assert!(group.has_circular_import());
    }

    #[test]
    fn test_cycle_below_root_does_not_flag_root() {
        // 0 -> 1 -> 2 -> 1
        let mut graph = TestGraph::default();
        graph.import(0, 1).import(1, 2).import(2, 1);

        assert!(!prioritize_imports(&graph, doc(0)).has_circular_import());
        assert!(prioritize_imports(&graph, doc(1)).has_circular_import());
        assert!(prioritize_imports(&graph, doc(2)).has_circular_import());
    }

    #[test]
    fn test_moniker_closest_to_root_wins() {
        // 0 -(m)-> 1 -(m)-> 2
        let mut graph = TestGraph::default();
        graph.import_as(0, 1, "m").import_as(1, 2, "m");

        let group = prioritize_imports(&graph, doc(0));
        assert_eq!(group.moniker("m"), Some(doc(1)));
        assert!(group.reaches(doc(2)));
    }

    #[test]
    fn test_last_declared_moniker_wins() {
        let mut graph = TestGraph::default();
        graph.import_as(0, 1, "m").import_as(0, 2, "m");

        let group = prioritize_imports(&graph, doc(0));
        assert_eq!(group.moniker("m"), Some(doc(2)));
    }

    #[test]
    fn test_merge_matches_cold_walk() {
        // 0 -> 1 -> 2, 1 -(m)-> 3, 0 -> 4 -> 2
        let mut graph = TestGraph::default();
        graph
            .import(0, 1)
            .import(1, 2)
            .import_as(1, 3, "m")
            .import(0, 4)
            .import(4, 2);

        let cold = prioritize_imports(&graph, doc(0));

        graph.index(2);
        graph.index(3);
        graph.index(4);
        graph.index(1);
        let warm = graph.index(0);

        assert_eq!(*warm, cold);
        assert_eq!(order(&warm), vec![0, 1, 2, 4]);
        assert_eq!(warm.moniker("m"), Some(doc(3)));
    }

    #[test]
    fn test_covered_document_replays_its_bindings() {
        // 0 -> 1 -(m)-> 3, 0 -> 2 -(m)-> 4, 0 -> 5 -> 1
        let mut graph = TestGraph::default();
        graph
            .import(0, 1)
            .import_as(1, 3, "m")
            .import(0, 2)
            .import_as(2, 4, "m")
            .import(0, 5)
            .import(5, 1);

        let cold = prioritize_imports(&graph, doc(0));
        assert_eq!(cold.moniker("m"), Some(doc(3)));

        for document in [3, 4, 1, 2, 5] {
            graph.index(document);
        }
        let warm = graph.index(0);
        assert_eq!(*warm, cold);
    }

    #[test]
    fn test_scenario_monikered_cycle_entry() {
        // A(0) -(m)-> B(1) -> C(2) -> B
        let mut graph = TestGraph::default();
        graph.import_as(0, 1, "moniker").import(1, 2).import(2, 1);

        graph.index(2);
        let b = graph.index(1);
        let a = graph.index(0);

        assert_eq!(a.len(), 3);
        assert!(!a.has_circular_import());
        assert!(b.has_circular_import());
        assert!(graph.cached[&doc(2)].has_circular_import());
    }

    #[test]
    fn test_scenario_monikered_without_cycle() {
        // A(0) -(m)-> B(1) -> C(2)
        let mut graph = TestGraph::default();
        graph.import_as(0, 1, "moniker").import(1, 2);

        graph.index(2);
        graph.index(1);
        let a = graph.index(0);

        assert_eq!(order(&a), vec![0, 2]);
        assert_eq!(a.moniker("moniker"), Some(doc(1)));
    }

    #[test]
    fn test_scenario_deeper_cycle_cold_and_cached() {
        // A(0) -> B(1) -(m)-> C(2) -> D(3) -> C
        let mut graph = TestGraph::default();
        graph.import(0, 1).import_as(1, 2, "moniker").import(2, 3).import(3, 2);

        let cold = prioritize_imports(&graph, doc(0));
        assert_eq!(cold.len(), 4);

        graph.invalidate_all();
        graph.index(3);
        graph.index(2);
        let a = graph.index(0);
        assert_eq!(a.len(), 4);

        assert!(!a.has_circular_import());
        assert!(!graph.index(1).has_circular_import());
        assert!(graph.index(2).has_circular_import());
        assert!(graph.index(3).has_circular_import());
    }
}
