//! Quiescent readers: `size`, `keysum`, `keys`, `is_empty` and the
//! structural audit.
//!
//! These walk the tree without locks and are only meaningful while no
//! mutator runs. All walks are iterative; a tree built from sorted input is
//! a linked spine.

use std::collections::HashSet;

use super::LazyTree;
use crate::error::InvariantError;
use crate::node::{NodeRef, Side};

impl LazyTree {
    /// Number of reachable nodes.
    ///
    /// Quiescent only: the result is unspecified while mutators run.
    #[must_use]
    pub fn size(&self) -> usize {
        let mut count: usize = 0;
        self.for_each_in_order(|_| count += 1);
        count
    }

    /// Sum of all keys, accumulated in 64 bits.
    ///
    /// Quiescent only.
    #[must_use]
    pub fn keysum(&self) -> i64 {
        let mut sum: i64 = 0;
        self.for_each_in_order(|key| sum += i64::from(key));
        sum
    }

    /// All keys in ascending order.
    ///
    /// Quiescent only.
    #[must_use]
    pub fn keys(&self) -> Vec<i32> {
        let mut keys: Vec<i32> = Vec::new();
        self.for_each_in_order(|key| keys.push(key));
        keys
    }

    /// Whether the tree holds no node. Quiescent only.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.head.has_child(Side::Right)
    }

    /// Audit the tree structure.
    ///
    /// Quiescent only. Checks that keys strictly increase in order, that no
    /// marked node is reachable and that no node is reachable twice.
    ///
    /// # Errors
    /// The first violation found.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let guard = self.guard();
        let mut visited: HashSet<usize> = HashSet::new();
        let mut stack: Vec<NodeRef<'_>> = Vec::new();
        let mut previous: Option<i32> = None;
        let mut current: Option<NodeRef<'_>> = self.root(&guard);

        loop {
            while let Some(node) = current {
                if !visited.insert(node.as_ptr().addr()) {
                    return Err(InvariantError::SharedNode { key: node.key() });
                }
                if node.is_marked() {
                    return Err(InvariantError::MarkedReachable { key: node.key() });
                }
                stack.push(node);
                current = node.child(Side::Left, &guard);
            }

            let Some(node) = stack.pop() else {
                return Ok(());
            };

            match previous {
                Some(prev) if prev >= node.key() => {
                    return Err(InvariantError::OutOfOrder {
                        prev,
                        next: node.key(),
                    });
                }
                _ => previous = Some(node.key()),
            }

            current = node.child(Side::Right, &guard);
        }
    }

    /// In-order walk with an explicit stack.
    fn for_each_in_order<F: FnMut(i32)>(&self, mut visit: F) {
        let guard = self.guard();
        let mut stack: Vec<NodeRef<'_>> = Vec::new();
        let mut current: Option<NodeRef<'_>> = self.root(&guard);

        loop {
            while let Some(node) = current {
                stack.push(node);
                current = node.child(Side::Left, &guard);
            }

            let Some(node) = stack.pop() else {
                return;
            };
            visit(node.key());
            current = node.child(Side::Right, &guard);
        }
    }
}
