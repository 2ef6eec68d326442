//! The shared id-manager.
//!
//! Symbol IDs and constraint IDs are globally monotone across every snapshot
//! descended from a common root, so that forked paths never collide. This is
//! the only mutable state in the engine (see Design Note 9): it is not truly
//! global, it is an explicit handle cloned (cheaply, via `Arc`) into every
//! descendant snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct IdManagerInner {
    next_sym_id: AtomicU64,
    next_ctr_id: AtomicU64,
}

/// A handle to the counters that mint fresh symbol and constraint IDs.
///
/// Clone is cheap (an `Arc` bump). Every snapshot forked from a common root
/// must share the same `IdManager` — mixing managers across a fork is a
/// caller bug (see [`crate::error::ShapeCtrError::ForeignIdManager`], checked
/// where snapshots are combined).
#[derive(Debug, Clone)]
pub struct IdManager {
    inner: Arc<IdManagerInner>,
}

impl Default for IdManager {
    fn default() -> Self {
        Self::new()
    }
}

impl IdManager {
    /// Create a fresh id-manager for a new root snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(IdManagerInner::default()),
        }
    }

    /// Mint the next globally-unique symbol ID.
    pub fn next_sym_id(&self) -> u64 {
        self.inner.next_sym_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Mint the next globally-unique constraint ID.
    pub fn next_ctr_id(&self) -> u64 {
        self.inner.next_ctr_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Whether two handles refer to the same underlying counters.
    ///
    /// Used as a debug-time check that a fork never mixes id-managers; not a
    /// behavior branch.
    #[must_use]
    pub fn same_manager_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::IdManager;

    #[test]
    fn ids_are_monotone_and_disjoint_across_kinds() {
        let mgr = IdManager::new();
        let a = mgr.next_sym_id();
        let b = mgr.next_sym_id();
        let c = mgr.next_ctr_id();
        let d = mgr.next_ctr_id();
        assert!(b > a);
        assert!(d > c);
    }

    #[test]
    fn clones_share_the_same_counters() {
        let mgr = IdManager::new();
        let clone = mgr.clone();
        assert!(mgr.same_manager_as(&clone));
        let a = mgr.next_sym_id();
        let b = clone.next_sym_id();
        assert_ne!(a, b);
    }

    #[test]
    fn fresh_managers_are_independent() {
        let a = IdManager::new();
        let b = IdManager::new();
        assert!(!a.same_manager_as(&b));
    }
}
