//! `LazyTree` - a concurrent unbalanced binary search tree of `i32` keys.
//!
//! # Protocol
//!
//! ```text
//! 1. guard = tree.guard()                  // seize protected region
//! 2. find_key(key)                         // lock-free, repeated until certain
//! 3. lock parent (blocking), try_lock current
//! 4. validate: neither marked, parent still links to current
//! 5. commit the splice, or drop the locks and go back to 2
//! ```
//!
//! Removing a node with two children moves its in-order successor into its
//! place (see `relocate`). Removed nodes are marked before they are unlinked
//! and retired through the guard, never freed eagerly.
//!
//! The tree is not balanced; sorted insertion produces a linear spine.

use std::fmt as StdFmt;

use seize::{Collector, LocalGuard};

use crate::config::Config;
use crate::error::InvariantError;
use crate::guard::SetGuard;
use crate::node::{Node, NodeRef, Side};
use crate::retry::run_until_done;
use crate::set::ConcurrentSet;
use crate::stats::{Counters, DebugCounters};

mod aggregate;
mod locked;
mod relocate;
mod traverse;
mod validate;

use traverse::Position;

// ============================================================================
//  LazyTree
// ============================================================================

/// A concurrent ordered set of `i32` keys backed by an unbalanced BST.
///
/// `contains` never locks. `insert` and `remove` lock at most a handful of
/// adjacent nodes for a short validate-and-splice step. All three are
/// linearizable.
///
/// [`size`](Self::size), [`keysum`](Self::keysum), [`keys`](Self::keys) and
/// [`check_invariants`](Self::check_invariants) must not run concurrently with
/// mutators: they are memory-safe but would report an unspecified mix.
///
/// ```rust
/// use lazyset::LazyTree;
///
/// let tree = LazyTree::new();
/// assert!(tree.insert(5));
/// assert!(!tree.insert(5));
/// assert!(tree.contains(5));
/// assert!(tree.remove(5));
/// assert!(!tree.contains(5));
/// ```
pub struct LazyTree {
    /// Memory reclamation collector for removed nodes.
    collector: Collector,

    /// Head sentinel. Its key is never compared; `head.right` is the root.
    head: Box<Node>,

    /// Slow-path counters.
    counters: Counters,

    /// Retry and backoff tuning.
    config: &'static Config,
}

impl LazyTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::global())
    }

    /// Create an empty tree with explicit tuning.
    #[must_use]
    pub fn with_config(config: &'static Config) -> Self {
        Self {
            collector: Collector::new(),
            head: Box::new(Node::new(i32::MIN)),
            counters: Counters::default(),
            config,
        }
    }

    /// Enter a protected region for a batch of operations.
    #[must_use]
    #[inline]
    pub fn guard(&self) -> SetGuard<'_> {
        SetGuard::enter(&self.collector)
    }

    /// Whether `key` is in the set.
    #[must_use]
    pub fn contains(&self, key: i32) -> bool {
        let guard = self.guard();
        self.contains_with_guard(key, &guard)
    }

    /// Add `key`. Returns `false` if it was already present.
    pub fn insert(&self, key: i32) -> bool {
        let guard = self.guard();
        self.insert_with_guard(key, &guard)
    }

    /// Remove `key`. Returns `false` if it was not present.
    pub fn remove(&self, key: i32) -> bool {
        let guard = self.guard();
        self.remove_with_guard(key, &guard)
    }

    /// [`contains`](Self::contains) under a caller-held guard.
    ///
    /// # Panics
    /// If `guard` was not issued by this tree.
    #[must_use]
    pub fn contains_with_guard(&self, key: i32, guard: &SetGuard<'_>) -> bool {
        guard.assert_owned_by(&self.collector);
        let position: Position<'_> = self.find_key(key, guard);
        position.current.is_some_and(|node| !node.is_marked())
    }

    /// [`insert`](Self::insert) under a caller-held guard.
    ///
    /// # Panics
    /// If `guard` was not issued by this tree.
    pub fn insert_with_guard(&self, key: i32, guard: &SetGuard<'_>) -> bool {
        guard.assert_owned_by(&self.collector);
        run_until_done("insert", key, self.config, &self.counters, || {
            self.try_insert(key, guard)
        })
    }

    /// [`remove`](Self::remove) under a caller-held guard.
    ///
    /// # Panics
    /// If `guard` was not issued by this tree.
    pub fn remove_with_guard(&self, key: i32, guard: &SetGuard<'_>) -> bool {
        guard.assert_owned_by(&self.collector);
        run_until_done("remove", key, self.config, &self.counters, || {
            self.try_remove(key, guard)
        })
    }

    /// Snapshot of the slow-path counters.
    #[must_use]
    pub fn debug_counters(&self) -> DebugCounters {
        self.counters.snapshot()
    }

    /// Zero the slow-path counters.
    pub fn reset_debug_counters(&self) {
        self.counters.reset();
    }

    // ========================================================================
    //  Internal Helpers
    // ========================================================================

    /// The head sentinel.
    #[inline]
    pub(crate) fn head(&self) -> NodeRef<'_> {
        NodeRef::from_owned(&self.head)
    }

    /// The current root, if any.
    #[inline]
    pub(crate) fn root<'g>(&'g self, guard: &'g LocalGuard<'_>) -> Option<NodeRef<'g>> {
        self.head.child(Side::Right, guard)
    }
}

impl Default for LazyTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LazyTree {
    fn drop(&mut self) {
        // Exclusive access: no guard can be alive. Retired nodes belong to
        // the collector, which frees them when it drops after this.
        let root: *mut Node = self.head.child_ptr(Side::Right);

        // SAFETY: every reachable node came from Node::alloc_leaf, and retired
        // nodes are never reachable.
        unsafe { crate::reclaim::reclaim_subtree(root) };
    }
}

impl StdFmt::Debug for LazyTree {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("LazyTree")
            .field("counters", &self.counters.snapshot())
            .finish_non_exhaustive()
    }
}

impl Extend<i32> for LazyTree {
    fn extend<I: IntoIterator<Item = i32>>(&mut self, iter: I) {
        let guard = self.guard();
        for key in iter {
            self.insert_with_guard(key, &guard);
        }
    }
}

impl FromIterator<i32> for LazyTree {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl ConcurrentSet for LazyTree {
    fn contains(&self, key: i32) -> bool {
        Self::contains(self, key)
    }

    fn insert(&self, key: i32) -> bool {
        Self::insert(self, key)
    }

    fn remove(&self, key: i32) -> bool {
        Self::remove(self, key)
    }

    fn size(&self) -> usize {
        Self::size(self)
    }

    fn keysum(&self) -> i64 {
        Self::keysum(self)
    }

    fn keys(&self) -> Vec<i32> {
        Self::keys(self)
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        Self::check_invariants(self)
    }
}

// ============================================================================
//  Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_send_sync()
    where
        LazyTree: Send + Sync,
    {
    }

    #[test]
    fn test_empty_tree() {
        let tree = LazyTree::new();
        assert!(!tree.contains(0));
        assert!(!tree.remove(0));
        assert_eq!(tree.size(), 0);
        assert_eq!(tree.keysum(), 0);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_insert_contains_remove() {
        let tree = LazyTree::new();
        assert!(tree.insert(10));
        assert!(tree.contains(10));
        assert!(!tree.insert(10), "duplicate insert must fail");
        assert!(tree.remove(10));
        assert!(!tree.contains(10));
        assert!(!tree.remove(10), "second remove must fail");
        assert!(tree.insert(10), "key can come back after removal");
    }

    #[test]
    fn test_extreme_keys_are_ordinary() {
        let tree = LazyTree::new();
        assert!(!tree.contains(i32::MIN));
        assert!(!tree.contains(i32::MAX));

        assert!(tree.insert(i32::MIN));
        assert!(tree.insert(i32::MAX));
        assert!(tree.insert(0));
        assert!(!tree.insert(i32::MIN));

        assert_eq!(tree.keys(), vec![i32::MIN, 0, i32::MAX]);
        assert_eq!(tree.keysum(), i64::from(i32::MIN) + i64::from(i32::MAX));

        assert!(tree.remove(i32::MIN));
        assert!(!tree.contains(i32::MIN));
        assert!(tree.contains(i32::MAX));
        assert!(tree.remove(i32::MAX));
        assert_eq!(tree.keys(), vec![0]);
    }

    #[test]
    fn test_remove_leaf_and_single_child() {
        let tree: LazyTree = [50, 30, 70, 20].into_iter().collect();

        // 20 is a leaf
        assert!(tree.remove(20));
        assert_eq!(tree.keys(), vec![30, 50, 70]);

        // 30 now a leaf again, give it a single right child
        assert!(tree.insert(40));
        assert!(tree.remove(30));
        assert_eq!(tree.keys(), vec![40, 50, 70]);
        tree.check_invariants().unwrap_or_else(|e| panic!("{e}"));
    }

    #[test]
    fn test_remove_root_with_two_children() {
        let tree: LazyTree = [50, 30, 70].into_iter().collect();
        assert!(tree.remove(50));
        assert_eq!(tree.keys(), vec![30, 70]);
        assert!(!tree.contains(50));
        assert_eq!(tree.debug_counters().leaf_relocations, 1);
        tree.check_invariants().unwrap_or_else(|e| panic!("{e}"));
    }

    #[test]
    fn test_remove_with_successor_subtree() {
        //        50
        //      /    \
        //    30      70
        //           /  \
        //         60    80
        //           \
        //           65
        //          /
        //        63
        let tree: LazyTree = [50, 30, 70, 60, 80, 65, 63].into_iter().collect();
        assert!(tree.remove(50));
        assert_eq!(tree.keys(), vec![30, 60, 63, 65, 70, 80]);
        assert_eq!(tree.debug_counters().subtree_relocations, 1);
        tree.check_invariants().unwrap_or_else(|e| panic!("{e}"));

        for key in [30, 60, 63, 65, 70, 80] {
            assert!(tree.contains(key), "lost {key}");
        }
    }

    #[test]
    fn test_with_guard_batch() {
        let tree = LazyTree::new();
        let guard = tree.guard();
        for key in 0..100 {
            assert!(tree.insert_with_guard(key, &guard));
        }
        for key in (0..100).step_by(2) {
            assert!(tree.remove_with_guard(key, &guard));
        }
        for key in 0..100 {
            assert_eq!(tree.contains_with_guard(key, &guard), key % 2 == 1);
        }
        drop(guard);
        assert_eq!(tree.size(), 50);
    }

    #[test]
    #[should_panic(expected = "did not issue it")]
    fn test_foreign_guard_rejected() {
        let a = LazyTree::new();
        let b = LazyTree::new();
        let guard = a.guard();
        let _ = b.insert_with_guard(1, &guard);
    }

    #[test]
    fn test_sorted_insert_builds_deep_spine() {
        // Linear depth must not overflow any recursion.
        let tree: LazyTree = (0..20_000).collect();
        assert_eq!(tree.size(), 20_000);
        assert_eq!(tree.keysum(), (0..20_000_i64).sum::<i64>());
        for key in (0..20_000).rev().step_by(3) {
            assert!(tree.remove(key));
        }
        tree.check_invariants().unwrap_or_else(|e| panic!("{e}"));
    }
}
