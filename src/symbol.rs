//! Symbols: the atomic unknowns a constraint set reasons about.

use std::fmt;
use std::sync::Arc;

use crate::expr::num::NumExpr;
use crate::id::IdManager;
use crate::loc::SourceLoc;

/// The five symbol kinds from spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum SymbolKind {
    /// Exact integer.
    Int,
    /// Finite float.
    Float,
    /// Boolean (ranges over `{0,1}`).
    Bool,
    /// String.
    String,
    /// Tensor shape, carrying a rank expression.
    Shape,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Shape => "shape",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug)]
struct SymbolInner {
    id: u64,
    kind: SymbolKind,
    display_name: Arc<str>,
    source: Option<SourceLoc>,
    /// Only present for `Shape` symbols: an expression for the rank.
    rank: Option<Arc<NumExpr>>,
}

/// `(id: nat, kind, display-name, optional source-location, and for Shape an
/// expression for rank)` — spec.md §3.
///
/// Cheap to clone: it is a thin `Arc` handle, mirroring the teacher's
/// `InternedSymbol` (`core::symbol::interned::InternedSymbol`).
#[derive(Debug, Clone)]
pub struct Symbol {
    inner: Arc<SymbolInner>,
}

impl Symbol {
    /// Mint a fresh symbol of the given kind, using `mgr` for the ID.
    pub(crate) fn new(
        mgr: &IdManager,
        kind: SymbolKind,
        display_name: impl Into<Arc<str>>,
        source: Option<SourceLoc>,
    ) -> Self {
        Self {
            inner: Arc::new(SymbolInner {
                id: mgr.next_sym_id(),
                kind,
                display_name: display_name.into(),
                source,
                rank: None,
            }),
        }
    }

    /// Mint a fresh `Shape` symbol carrying a rank expression.
    pub(crate) fn new_shape(
        mgr: &IdManager,
        display_name: impl Into<Arc<str>>,
        source: Option<SourceLoc>,
        rank: Arc<NumExpr>,
    ) -> Self {
        Self {
            inner: Arc::new(SymbolInner {
                id: mgr.next_sym_id(),
                kind: SymbolKind::Shape,
                display_name: display_name.into(),
                source,
                rank: Some(rank),
            }),
        }
    }

    /// The globally-unique symbol ID.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The symbol's kind.
    #[must_use]
    pub const fn kind(&self) -> SymbolKind {
        self.inner.kind
    }

    /// The human-readable display name (not guaranteed unique).
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.inner.display_name
    }

    /// The source location this symbol was minted at, if any.
    #[must_use]
    pub fn source(&self) -> Option<&SourceLoc> {
        self.inner.source.as_ref()
    }

    /// For `Shape` symbols, the expression giving the rank. `None` for every
    /// other kind.
    #[must_use]
    pub fn rank(&self) -> Option<&Arc<NumExpr>> {
        self.inner.rank.as_ref()
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Symbol {}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::{IdManager, Symbol, SymbolKind};

    #[test]
    fn distinct_mints_get_distinct_ids() {
        let mgr = IdManager::new();
        let a = Symbol::new(&mgr, SymbolKind::Int, "x", None);
        let b = Symbol::new(&mgr, SymbolKind::Int, "x", None);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.display_name(), b.display_name());
        assert_ne!(a, b);
    }
}
