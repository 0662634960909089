//! Error types for corpus operations.
//!
//! Unresolved imports and circular imports are not errors. They are reported
//! through the event sink and recorded on the import priority group.

use smol_str::SmolStr;
use thiserror::Error;

use crate::base::DocumentId;

/// Errors from corpus path handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty corpus path")]
    Empty,

    #[error("path escapes the corpus root: {0}")]
    EscapesRoot(String),
}

/// Errors raised by a [`StorageAdapter`](crate::project::StorageAdapter).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("document not found: {0}")]
    NotFound(SmolStr),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: SmolStr,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid document {path}: {message}")]
    Invalid { path: SmolStr, message: String },
}

impl StorageError {
    /// The path the failed fetch was for.
    pub fn path(&self) -> &str {
        match self {
            StorageError::NotFound(path) => path.as_str(),
            StorageError::Io { path, .. } | StorageError::Invalid { path, .. } => path.as_str(),
        }
    }
}

/// Errors from corpus operations.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("unknown document {0}")]
    UnknownDocument(DocumentId),

    #[error("a document already exists at {0}")]
    DuplicatePath(SmolStr),

    #[error(transparent)]
    InvalidPath(#[from] PathError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type CorpusResult<T> = Result<T, CorpusError>;
