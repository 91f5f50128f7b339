//! Lock-free descent.
//!
//! [`LazyTree::find_key_once`] walks from the head sentinel without taking
//! any lock. A single pass can miss a node that is being relocated (the
//! successor is briefly reachable only from its new spot), so
//! [`LazyTree::find_key`] repeats the walk until it either finds the key or
//! sees the same insertion parent twice in a row.

use std::cmp::Ordering;

use seize::LocalGuard;

use super::LazyTree;
use crate::node::{NodeRef, Side};

/// Where a key lives, or would be inserted.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Position<'g> {
    /// Node whose `side` link leads to `current`. Possibly the head.
    pub(crate) parent: NodeRef<'g>,

    /// Node holding the key (marked or not), or `None` at the insertion point.
    pub(crate) current: Option<NodeRef<'g>>,

    pub(crate) side: Side,
}

/// A real node together with the link that leads to it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Edge<'g> {
    pub(crate) parent: NodeRef<'g>,
    pub(crate) child: NodeRef<'g>,
    pub(crate) side: Side,
}

impl LazyTree {
    /// One unsynchronized walk towards `key`.
    pub(crate) fn find_key_once<'g>(&'g self, key: i32, guard: &'g LocalGuard<'_>) -> Position<'g> {
        let mut parent: NodeRef<'g> = self.head();
        let mut side: Side = Side::Right;
        let mut current: Option<NodeRef<'g>> = self.root(guard);

        while let Some(node) = current {
            side = match node.key().cmp(&key) {
                Ordering::Less => Side::Right,
                Ordering::Greater => Side::Left,
                Ordering::Equal => break,
            };
            parent = node;
            current = node.child(side, guard);
        }

        Position {
            parent,
            current,
            side,
        }
    }

    /// Walk towards `key` until the answer is certain.
    ///
    /// A found node is returned at once (it may be marked). An absent key is
    /// only reported once two consecutive passes end at the same parent. The
    /// first pass never certifies absence on its own.
    pub(crate) fn find_key<'g>(&'g self, key: i32, guard: &'g LocalGuard<'_>) -> Position<'g> {
        let mut previous: Option<NodeRef<'g>> = None;
        let mut passes: u32 = 0;

        loop {
            let position: Position<'g> = self.find_key_once(key, guard);
            passes += 1;

            if position.current.is_some() {
                return position;
            }

            if previous.is_some_and(|parent| parent.same(position.parent)) {
                if passes > 2 {
                    self.counters.traversal_repeat();
                }
                return position;
            }

            previous = Some(position.parent);
        }
    }
}

/// In-order successor of `node`: one step right, then left while possible.
///
/// Returns `None` if `node` has no right child.
pub(crate) fn find_successor<'g>(node: NodeRef<'g>, guard: &'g LocalGuard<'_>) -> Option<Edge<'g>> {
    let mut parent: NodeRef<'g> = node;
    let mut side: Side = Side::Right;
    let mut child: NodeRef<'g> = node.child(Side::Right, guard)?;

    while let Some(left) = child.child(Side::Left, guard) {
        parent = child;
        child = left;
        side = Side::Left;
    }

    Some(Edge {
        parent,
        child,
        side,
    })
}
