//! Import declarations.

use std::fmt;

use smol_str::SmolStr;

/// One declared reference from a document to another.
///
/// The target path is relative to the importing document's folder unless
/// it is absolute. A moniker makes the import qualified: the target's
/// definitions are reachable as `moniker/name` instead of by bare name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Import {
    target_path: SmolStr,
    moniker: Option<SmolStr>,
}

impl Import {
    /// An unqualified import.
    pub fn new(target_path: impl Into<SmolStr>) -> Self {
        Self {
            target_path: target_path.into(),
            moniker: None,
        }
    }

    /// A moniker-qualified import. An empty moniker means no moniker.
    pub fn with_moniker(target_path: impl Into<SmolStr>, moniker: impl Into<SmolStr>) -> Self {
        let moniker = moniker.into();
        Self {
            target_path: target_path.into(),
            moniker: (!moniker.is_empty()).then_some(moniker),
        }
    }

    /// The path as declared.
    pub fn target_path(&self) -> &str {
        &self.target_path
    }

    pub fn moniker(&self) -> Option<&SmolStr> {
        self.moniker.as_ref()
    }

    pub fn is_monikered(&self) -> bool {
        self.moniker.is_some()
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.moniker {
            Some(moniker) => write!(f, "{} as {}", self.target_path, moniker),
            None => f.write_str(&self.target_path),
        }
    }
}
