//! Property-based tests for import priorities.
//!
//! Generates random import graphs (with and without cycles, with a few
//! monikers) and checks the priority rules against a plain reachability
//! computation, and that the order in which documents are indexed does
//! not change the result.
#![cfg(feature = "proptest")]

use std::collections::{BTreeSet, VecDeque};

use proptest::prelude::*;
use schemacorpus::{Corpus, DocumentId, Import, ImportPriorityGroup, ResolveOptions};

// ============================================================================
// PROPTEST STRATEGIES
// ============================================================================

#[derive(Clone, Debug)]
struct GraphPlan {
    size: usize,
    edges: Vec<(usize, usize, Option<&'static str>)>,
}

/// Mostly plain imports, sometimes one of two monikers.
fn arb_moniker() -> impl Strategy<Value = Option<&'static str>> {
    prop_oneof![
        3 => Just(None),
        1 => Just(Some("m")),
        1 => Just(Some("n")),
    ]
}

/// A graph of up to 8 documents. Acyclic graphs only import "forward".
fn arb_graph(acyclic: bool) -> impl Strategy<Value = GraphPlan> {
    (1usize..8).prop_flat_map(move |size| {
        prop::collection::vec((0..size, 0..size, arb_moniker()), 0..size * 3).prop_map(
            move |edges| GraphPlan {
                size,
                edges: edges
                    .into_iter()
                    .filter(|(from, to, _)| !acyclic || from < to)
                    .collect(),
            },
        )
    })
}

/// A graph plus an order to index its documents in.
fn arb_graph_and_order(acyclic: bool) -> impl Strategy<Value = (GraphPlan, Vec<usize>)> {
    arb_graph(acyclic).prop_flat_map(|plan| {
        let order: Vec<usize> = (0..plan.size).collect();
        (Just(plan), Just(order).prop_shuffle())
    })
}

// ============================================================================
// HELPERS
// ============================================================================

fn build(plan: &GraphPlan) -> (Corpus, Vec<DocumentId>) {
    let corpus = Corpus::in_memory();
    let ids: Vec<_> = (0..plan.size)
        .map(|i| corpus.create_document(&format!("/d{i}.cdm.json")).unwrap().id())
        .collect();
    for &(from, to, moniker) in &plan.edges {
        let target = format!("d{to}.cdm.json");
        let import = match moniker {
            Some(m) => Import::with_moniker(target, m),
            None => Import::new(target),
        };
        corpus.add_import(ids[from], import).unwrap();
    }
    (corpus, ids)
}

/// Documents reachable from `root` by one or more edges.
fn reachable_from(plan: &GraphPlan, root: usize) -> BTreeSet<usize> {
    let mut seen = BTreeSet::new();
    let mut queue = VecDeque::from([root]);
    while let Some(doc) = queue.pop_front() {
        for &(from, to, _) in &plan.edges {
            if from == doc && seen.insert(to) {
                queue.push_back(to);
            }
        }
    }
    seen
}

fn visible_set(group: &ImportPriorityGroup, ids: &[DocumentId]) -> BTreeSet<usize> {
    group
        .priority_order()
        .map(|(d, _)| ids.iter().position(|&id| id == d).unwrap())
        .collect()
}

fn shape(group: &ImportPriorityGroup) -> (Vec<DocumentId>, Vec<DocumentId>, bool) {
    (
        group.priority_order().map(|(d, _)| d).collect(),
        group.moniker_only().collect(),
        group.has_circular_import(),
    )
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #[test]
    fn prop_owner_first_and_ranks_dense(plan in arb_graph(false)) {
        let (corpus, ids) = build(&plan);
        for &id in &ids {
            let group = corpus.index_if_needed(id, &ResolveOptions::new()).unwrap();
            prop_assert_eq!(group.owner(), id);
            let ranks: Vec<u32> = group.priority_order().map(|(_, r)| r).collect();
            let expected: Vec<u32> = (0..group.len() as u32).collect();
            prop_assert_eq!(ranks, expected);
            prop_assert_eq!(group.priority(id), Some(0));
        }
    }

    #[test]
    fn prop_visibility_follows_unqualified_edges(plan in arb_graph(false)) {
        let (corpus, ids) = build(&plan);
        for root in 0..plan.size {
            let reachable = reachable_from(&plan, root);
            let mut visible: BTreeSet<usize> = plan
                .edges
                .iter()
                .filter(|(from, _, moniker)| moniker.is_none() && (*from == root || reachable.contains(from)))
                .map(|&(_, to, _)| to)
                .collect();
            visible.insert(root);

            let group = corpus.index_if_needed(ids[root], &ResolveOptions::new()).unwrap();
            prop_assert_eq!(visible_set(&group, &ids), visible.clone());

            let moniker_only: BTreeSet<usize> =
                reachable.difference(&visible).copied().collect();
            let actual: BTreeSet<usize> = group
                .moniker_only()
                .map(|d| ids.iter().position(|&id| id == d).unwrap())
                .collect();
            prop_assert_eq!(actual, moniker_only);
        }
    }

    #[test]
    fn prop_circular_iff_root_reaches_itself(plan in arb_graph(false)) {
        let (corpus, ids) = build(&plan);
        for root in 0..plan.size {
            let group = corpus.index_if_needed(ids[root], &ResolveOptions::new()).unwrap();
            prop_assert_eq!(
                group.has_circular_import(),
                reachable_from(&plan, root).contains(&root)
            );
        }
    }

    #[test]
    fn prop_index_order_does_not_matter((plan, order) in arb_graph_and_order(false)) {
        let (warm, warm_ids) = build(&plan);
        for &i in &order {
            warm.index_if_needed(warm_ids[i], &ResolveOptions::new()).unwrap();
        }

        for root in 0..plan.size {
            let (cold, cold_ids) = build(&plan);
            let cold_group = cold.index_if_needed(cold_ids[root], &ResolveOptions::new()).unwrap();
            let warm_group = warm.document(warm_ids[root]).unwrap().import_priorities().unwrap();
            // Both corpora issue ids in the same order, so ids are comparable.
            prop_assert_eq!(shape(&warm_group), shape(&cold_group));
        }
    }

    #[test]
    fn prop_acyclic_cached_equals_cold((plan, order) in arb_graph_and_order(true)) {
        let (warm, warm_ids) = build(&plan);
        for &i in &order {
            warm.index_if_needed(warm_ids[i], &ResolveOptions::new()).unwrap();
        }

        for root in 0..plan.size {
            let (cold, cold_ids) = build(&plan);
            let cold_group = cold.index_if_needed(cold_ids[root], &ResolveOptions::new()).unwrap();
            let warm_group = warm.document(warm_ids[root]).unwrap().import_priorities().unwrap();
            prop_assert_eq!(&*warm_group, &*cold_group);
        }
    }
}
