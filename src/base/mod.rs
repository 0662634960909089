//! Foundation types for the corpus.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`DocumentId`] - Document instance identifiers
//! - [`path`] - Corpus path normalization and joining
//!
//! This module has NO dependencies on other modules except the error types.

mod document_id;
pub mod path;

pub use document_id::DocumentId;
pub(crate) use document_id::IdAllocator;
