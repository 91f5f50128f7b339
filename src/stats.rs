//! Per-structure debug counters.
//!
//! Counters are relaxed atomics bumped on the slow paths only (retries and
//! relocations), so the fast paths pay nothing. A [`DebugCounters`] snapshot
//! is not atomic across fields.

use std::sync::atomic::AtomicU64;

use crate::ordering::RELAXED;

/// Snapshot of a structure's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugCounters {
    /// Attempts abandoned because validation failed after locking.
    pub validation_retries: u64,
    /// Attempts abandoned because a `try_lock` on a second node failed.
    pub lock_retries: u64,
    /// Absence certificates that needed more than one extra traversal.
    pub traversal_repeats: u64,
    /// Two-child removals whose successor was a leaf.
    pub leaf_relocations: u64,
    /// Two-child removals whose successor had a right subtree.
    pub subtree_relocations: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    validation_retries: AtomicU64,
    lock_retries: AtomicU64,
    traversal_repeats: AtomicU64,
    leaf_relocations: AtomicU64,
    subtree_relocations: AtomicU64,
}

impl Counters {
    #[inline]
    pub(crate) fn validation_retry(&self) {
        self.validation_retries.fetch_add(1, RELAXED);
    }

    #[inline]
    pub(crate) fn lock_retry(&self) {
        self.lock_retries.fetch_add(1, RELAXED);
    }

    #[inline]
    pub(crate) fn traversal_repeat(&self) {
        self.traversal_repeats.fetch_add(1, RELAXED);
    }

    #[inline]
    pub(crate) fn leaf_relocation(&self) {
        self.leaf_relocations.fetch_add(1, RELAXED);
    }

    #[inline]
    pub(crate) fn subtree_relocation(&self) {
        self.subtree_relocations.fetch_add(1, RELAXED);
    }

    pub(crate) fn snapshot(&self) -> DebugCounters {
        DebugCounters {
            validation_retries: self.validation_retries.load(RELAXED),
            lock_retries: self.lock_retries.load(RELAXED),
            traversal_repeats: self.traversal_repeats.load(RELAXED),
            leaf_relocations: self.leaf_relocations.load(RELAXED),
            subtree_relocations: self.subtree_relocations.load(RELAXED),
        }
    }

    pub(crate) fn reset(&self) {
        self.validation_retries.store(0, RELAXED);
        self.lock_retries.store(0, RELAXED);
        self.traversal_repeats.store(0, RELAXED);
        self.leaf_relocations.store(0, RELAXED);
        self.subtree_relocations.store(0, RELAXED);
    }
}

impl DebugCounters {
    /// Total abandoned attempts of any kind.
    #[must_use]
    pub const fn total_retries(&self) -> u64 {
        self.validation_retries + self.lock_retries
    }
}
