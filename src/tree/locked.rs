//! Single attempts of `insert` and `remove`.
//!
//! Each attempt traverses, locks `parent` (blocking), then `current` with
//! `try_lock`, validates, and either commits or reports why it gave up. The
//! retry loop lives in [`crate::retry`].
//!
//! Locks are scoped guards, so every early return releases them.

use seize::LocalGuard;

use super::LazyTree;
use super::traverse::{Edge, Position};
use crate::node::{Node, NodeRef, Side};
use crate::reclaim::retire_node;
use crate::retry::{Attempt, RetryCause};
use crate::tracing_helpers::{error_log, trace_log};

impl LazyTree {
    pub(crate) fn try_insert(&self, key: i32, guard: &LocalGuard<'_>) -> Attempt<bool> {
        let position: Position<'_> = self.find_key(key, guard);
        let _parent_lock = position.parent.get().lock().lock();

        let Some(current) = position.current else {
            if !position.is_valid() {
                return Attempt::Retry(RetryCause::Validation);
            }

            position
                .parent
                .publish_child(position.side, Node::alloc_leaf(key));
            trace_log!(key, parent = position.parent.key(), "leaf published");
            return Attempt::Done(true);
        };

        let Some(_current_lock) = current.get().lock().try_lock() else {
            return Attempt::Retry(RetryCause::Contended);
        };

        if !position.is_valid() {
            return Attempt::Retry(RetryCause::Validation);
        }

        Self::expect_key(current, key);
        Attempt::Done(false)
    }

    pub(crate) fn try_remove(&self, key: i32, guard: &LocalGuard<'_>) -> Attempt<bool> {
        let position: Position<'_> = self.find_key(key, guard);
        let _parent_lock = position.parent.get().lock().lock();

        let Some(current) = position.current else {
            return if position.is_valid() {
                Attempt::Done(false)
            } else {
                Attempt::Retry(RetryCause::Validation)
            };
        };

        let Some(mut current_lock) = current.get().lock().try_lock() else {
            return Attempt::Retry(RetryCause::Contended);
        };

        if !position.is_valid() {
            return Attempt::Retry(RetryCause::Validation);
        }

        Self::expect_key(current, key);

        let left: Option<NodeRef<'_>> = current.child(Side::Left, guard);
        let right: Option<NodeRef<'_>> = current.child(Side::Right, guard);

        if left.is_some() && right.is_some() {
            let target = Edge {
                parent: position.parent,
                child: current,
                side: position.side,
            };

            if let Attempt::Retry(cause) = self.relocate_successor(target, &mut current_lock, guard)
            {
                return Attempt::Retry(cause);
            }
        } else {
            current_lock.mark();
            position.parent.set_child(position.side, left.or(right));
        }

        // SAFETY: `current` is marked and no link reaches it any more.
        unsafe { retire_node(current, guard) };

        trace_log!(key, "node removed");
        Attempt::Done(true)
    }

    /// A validated `current` must hold the key the traversal looked for.
    #[inline]
    fn expect_key(current: NodeRef<'_>, key: i32) {
        if current.key() != key {
            error_log!(key, found = current.key(), "traversal stopped on a foreign key");
            unreachable!("traversal for {key} stopped on node {}", current.key());
        }
    }
}
