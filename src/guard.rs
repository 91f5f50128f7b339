//! Reclamation guard bound to one structure.
//!
//! Wraps a `seize::LocalGuard` together with the identity of the collector
//! that issued it. Retired nodes go to the guard's collector, so a guard from
//! one set must never be used with another; the `*_with_guard` methods check
//! this.

use std::fmt as StdFmt;
use std::ops::Deref;

use seize::{Collector, LocalGuard};

/// A protected region for one set, from `LazyTree::guard` or `LazyList::guard`.
///
/// Nodes loaded while the guard lives are not reclaimed before it drops.
/// Holding a guard for a long time delays reclamation of removed nodes.
pub struct SetGuard<'a> {
    inner: LocalGuard<'a>,
    owner: usize,
}

impl<'a> SetGuard<'a> {
    pub(crate) fn enter(collector: &'a Collector) -> Self {
        Self {
            inner: collector.enter(),
            owner: owner_id(collector),
        }
    }

    /// Panic unless this guard was issued by `collector`.
    #[inline]
    pub(crate) fn assert_owned_by(&self, collector: &Collector) {
        assert_eq!(
            self.owner,
            owner_id(collector),
            "guard used with a set that did not issue it"
        );
    }
}

impl<'a> Deref for SetGuard<'a> {
    type Target = LocalGuard<'a>;

    #[inline]
    fn deref(&self) -> &LocalGuard<'a> {
        &self.inner
    }
}

impl StdFmt::Debug for SetGuard<'_> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("SetGuard").finish_non_exhaustive()
    }
}

#[inline]
fn owner_id(collector: &Collector) -> usize {
    std::ptr::from_ref(collector).addr()
}
