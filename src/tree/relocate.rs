//! Two-child removal by successor relocation.
//!
//! The removed node `T` is replaced by its in-order successor `S` (the
//! leftmost node of `T`'s right subtree). `S` has no left child.
//!
//! ```text
//! leaf successor:                 successor with a right subtree:
//!
//!      P            P                  P                 P
//!      |            |                  |                 |
//!      T     =>     S                  T                 S
//!     / \          / \                / \               / \
//!    A   ..       A   ..             A   ..            A   ..
//!        /                               /                 /
//!       S                               S                 R..
//!                                        \               /
//!                                         R..           N
//!                                        /
//!                                       N
//! ```
//!
//! With a right subtree, `S` is first parked as the left leaf of its own
//! successor `N`, so it is reachable at every step, and is then moved like a
//! leaf. `T` is marked in the same critical section that unlinks it.
//!
//! # Locking
//!
//! On entry the caller holds `P` and `T`. Every further lock is a
//! `try_lock`; on failure the whole attempt is abandoned with
//! [`RetryCause::Contended`] and all locks are released. A node that is
//! already held (`T` as the parent of `S`, `S` as the parent of `N`) is not
//! locked again.
//!
//! A successor that moved between search and lock is searched again while
//! `P` and `T` stay locked.

use seize::LocalGuard;

use super::LazyTree;
use super::traverse::{Edge, find_successor};
use super::validate::successor_unchanged;
use crate::node::Side;
use crate::nodelock::LockGuard;
use crate::retry::{Attempt, RetryCause};
use crate::tracing_helpers::debug_log;

/// Lock `edge.parent` unless it is the node `held`, which this attempt
/// already owns.
macro_rules! lock_parent_unless_held {
    ($edge:expr, $held:expr) => {
        if $edge.parent.same($held) {
            None
        } else {
            match $edge.parent.get().lock().try_lock() {
                Some(lock) => Some(lock),
                None => return Attempt::Retry(RetryCause::Contended),
            }
        }
    };
}

impl LazyTree {
    /// Remove `target.child`, which has two children.
    ///
    /// The caller holds the locks of `target.parent` and `target.child`
    /// (`target_lock`) and has validated `target`.
    pub(super) fn relocate_successor<'g>(
        &self,
        target: Edge<'g>,
        target_lock: &mut LockGuard<'_>,
        guard: &'g LocalGuard<'_>,
    ) -> Attempt<()> {
        debug_assert!(target_lock.guards(target.child.lock()));

        loop {
            // Right link of a locked node cannot change under us.
            let Some(succ) = find_successor(target.child, guard) else {
                debug_log!(key = target.child.key(), "right subtree vanished");
                return Attempt::Retry(RetryCause::Validation);
            };

            let _succ_parent_lock: Option<LockGuard<'_>> =
                lock_parent_unless_held!(succ, target.child);

            let Some(_succ_lock) = succ.child.get().lock().try_lock() else {
                return Attempt::Retry(RetryCause::Contended);
            };

            if !successor_unchanged(target.child, succ, guard) || !succ.is_valid() {
                self.counters.validation_retry();
                continue;
            }

            if succ.child.has_child(Side::Right) {
                return self.relocate_with_subtree(target, target_lock, succ, guard);
            }

            debug_log!(
                removed = target.child.key(),
                successor = succ.child.key(),
                "relocating leaf successor"
            );
            Self::replace_with_leaf(target, target_lock, succ, guard);
            self.counters.leaf_relocation();
            return Attempt::Done(());
        }
    }

    /// Park `succ` as the left leaf of its own successor, then move it.
    ///
    /// The caller holds `target`'s two locks and `succ`'s two locks.
    fn relocate_with_subtree<'g>(
        &self,
        target: Edge<'g>,
        target_lock: &mut LockGuard<'_>,
        succ: Edge<'g>,
        guard: &'g LocalGuard<'_>,
    ) -> Attempt<()> {
        loop {
            let Some(next) = find_successor(succ.child, guard) else {
                debug_log!(key = succ.child.key(), "successor lost its right subtree");
                return Attempt::Retry(RetryCause::Validation);
            };

            let _next_parent_lock: Option<LockGuard<'_>> =
                lock_parent_unless_held!(next, succ.child);

            let Some(_next_lock) = next.child.get().lock().try_lock() else {
                return Attempt::Retry(RetryCause::Contended);
            };

            if !successor_unchanged(succ.child, next, guard) || !next.is_valid() {
                self.counters.validation_retry();
                continue;
            }

            debug_log!(
                removed = target.child.key(),
                successor = succ.child.key(),
                parked_under = next.child.key(),
                "relocating successor with right subtree"
            );

            // S stays reachable: first under N, then (below) in T's place.
            next.child.set_child(Side::Left, Some(succ.child));
            succ.parent
                .set_child(succ.side, succ.child.child(Side::Right, guard));
            succ.child.set_child(Side::Right, None);

            let parked = Edge {
                parent: next.child,
                child: succ.child,
                side: Side::Left,
            };
            Self::replace_with_leaf(target, target_lock, parked, guard);
            self.counters.subtree_relocation();
            return Attempt::Done(());
        }
    }

    /// Put the leaf `leaf.child` in `target.child`'s place and mark the target.
    ///
    /// Every node written here is locked by the caller.
    fn replace_with_leaf<'g>(
        target: Edge<'g>,
        target_lock: &mut LockGuard<'_>,
        leaf: Edge<'g>,
        guard: &'g LocalGuard<'_>,
    ) {
        let removed = target.child;
        let moved = leaf.child;
        debug_assert!(!moved.has_child(Side::Left), "relocated node is not a leaf");

        target_lock.mark();

        // A direct right child must not end up pointing at itself.
        if !removed.links_to(Side::Right, Some(moved)) {
            moved.set_child(Side::Right, removed.child(Side::Right, guard));
        }
        moved.set_child(Side::Left, removed.child(Side::Left, guard));

        target.parent.set_child(target.side, Some(moved));
        leaf.parent.set_child(leaf.side, None);
    }
}
