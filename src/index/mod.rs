//! Import priority indexing.
//!
//! - [`ImportPriorityGroup`] - the computed, immutable result for a document
//! - [`IndexState`] - the per-document `Dirty → Indexing → Indexed` machine
//! - `priority` - the depth-first priority walk over an import graph
//!
//! Orchestration (localizing imports, ordering dependency passes) lives with
//! the corpus in [`crate::project`].

mod group;
pub(crate) mod priority;
pub(crate) mod state;

pub use group::ImportPriorityGroup;
pub use state::IndexState;
