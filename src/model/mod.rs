//! The document model: imports, documents and resolution options.

mod document;
mod import;
mod options;

pub use document::Document;
pub use import::Import;
pub use options::{ImportsLoadStrategy, ResolveOptions};
