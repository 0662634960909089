//! # schemacorpus-base
//!
//! Core library for schema document corpora: the document import graph,
//! per-document import priorities, and symbol lookup over them.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! project → Corpus, folders, storage adapters, indexing, symbol lookup
//!   ↓
//! index   → Import priority groups, index state, the priority walk
//!   ↓
//! model   → Import, Document, ResolveOptions
//!   ↓
//! events  → Status levels, event callbacks and codes
//!   ↓
//! base    → Primitives (DocumentId, corpus paths)
//! ```

// ============================================================================
// FOUNDATION
// ============================================================================

/// Foundation types: DocumentId, corpus path handling
pub mod base;

/// Error types
pub mod error;

/// Status events and callbacks
pub mod events;

// ============================================================================
// DOCUMENT MODEL AND INDEXING
// ============================================================================

pub mod model;

/// Import priority groups and the priority walk
pub mod index;

/// Corpus management
pub mod project;

// Re-export commonly needed items
pub use base::DocumentId;
pub use error::{CorpusError, CorpusResult, PathError, StorageError};
pub use events::{Event, EventCallback, EventCollector, StatusLevel};
pub use index::{ImportPriorityGroup, IndexState};
pub use model::{Document, Import, ImportsLoadStrategy, ResolveOptions};
pub use project::{
    Corpus, DocumentSource, Folder, LoadReport, MemoryAdapter, NullAdapter, StorageAdapter,
    SymbolLocation,
};
