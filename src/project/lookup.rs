//! Symbol lookup over import priorities.
//!
//! A reference is either unqualified (`Customer`) or moniker-qualified
//! (`base/Customer`, `base/inner/Customer`). Unqualified names resolve to
//! the visible document with the lowest rank that defines them. As a last
//! resort, documents bound to monikers are searched in moniker order.

use smol_str::SmolStr;

use crate::base::DocumentId;
use crate::error::CorpusResult;
use crate::events::codes;
use crate::index::ImportPriorityGroup;
use crate::model::ResolveOptions;
use crate::project::Corpus;

/// Where a reference resolved to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SymbolLocation {
    /// The document defining the symbol.
    pub document: DocumentId,
    /// The unqualified name the symbol is defined under.
    pub name: SmolStr,
}

impl Corpus {
    /// Resolve `reference` as seen from the document `from`.
    ///
    /// Indexes the documents involved if needed. Returns `Ok(None)` when the
    /// reference does not resolve; with strict validation that is also
    /// reported, as an error or, under shallow validation, a warning.
    pub fn resolve_symbol(
        &self,
        from: DocumentId,
        reference: &str,
        options: &ResolveOptions,
    ) -> CorpusResult<Option<SymbolLocation>> {
        let found = self.lookup_symbol(from, reference, options)?;
        if found.is_none() && options.strict_validation() {
            let document = self.require(from)?;
            self.report(
                options.unresolved_level(),
                codes::UNRESOLVED_REFERENCE,
                document.path(),
                &format!("Unable to resolve the reference '{reference}'"),
            );
        }
        Ok(found)
    }

    fn lookup_symbol(
        &self,
        from: DocumentId,
        reference: &str,
        options: &ResolveOptions,
    ) -> CorpusResult<Option<SymbolLocation>> {
        let mut current = from;
        let mut rest = reference;
        loop {
            let group = self.index_if_needed(current, options)?;
            if let Some((moniker, tail)) = rest.split_once('/') {
                if let Some(target) = group.moniker(moniker) {
                    tracing::trace!(moniker, target = %target, "following moniker");
                    current = target;
                    rest = tail;
                    continue;
                }
            }
            return Ok(self.find_definition(&group, rest));
        }
    }

    fn find_definition(&self, group: &ImportPriorityGroup, name: &str) -> Option<SymbolLocation> {
        let visible = group.priority_order().map(|(document, _)| document);
        // Moniker documents not already visible, as a last resort.
        let monikered = group
            .monikers()
            .map(|(_, document)| document)
            .filter(|document| !group.contains(*document));
        visible.chain(monikered).find_map(|id| {
            let document = self.document(id)?;
            document.defines(name).then(|| SymbolLocation {
                document: id,
                name: SmolStr::new(name),
            })
        })
    }
}
