//! Corpus management: folders, storage, indexing and symbol lookup.

mod corpus;
mod folder;
mod indexer;
mod loader;
mod lookup;
mod storage;

pub use corpus::Corpus;
pub use folder::Folder;
pub use loader::LoadReport;
pub use lookup::SymbolLocation;
pub use storage::{DocumentSource, MemoryAdapter, NullAdapter, StorageAdapter};
