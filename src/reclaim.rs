//! Reclaim helpers for seize-based memory reclamation.
//!
//! - [`retire_node`] / [`retire_boxed`] hand an unlinked node to the guard's
//!   collector.
//! - [`reclaim_subtree`] and [`reclaim_chain`] free whatever is still
//!   reachable when a structure is dropped.

use std::collections::HashSet;

use seize::{Collector, Guard, LocalGuard};

use crate::node::{Node, NodeRef, Side};
use crate::ordering::READ_ORD;

/// Reclaim a boxed node (seize callback).
///
/// # Safety
///
/// - `ptr` must come from `Box::into_raw` (or `Box::leak`).
/// - Must only be called after seize determines no reader remains.
unsafe fn reclaim_boxed<T>(ptr: *mut T, _collector: &Collector) {
    // SAFETY: Caller guarantees ptr is valid and uniquely owned now.
    unsafe { drop(Box::from_raw(ptr)) };
}

/// Schedule an unlinked heap node for reclamation.
///
/// # Safety
///
/// - `ptr` must come from `Box::into_raw` and be marked and no longer
///   reachable from the structure.
/// - `ptr` must not be retired twice.
pub(crate) unsafe fn retire_boxed<T>(ptr: *mut T, guard: &LocalGuard<'_>) {
    // SAFETY: Caller guarantees the node is unreachable for new traversals;
    // seize delays the free until current guards are gone.
    unsafe { guard.defer_retire(ptr, reclaim_boxed::<T>) };
}

/// Schedule an unlinked tree node for reclamation.
///
/// # Safety
///
/// Same contract as [`retire_boxed`].
#[inline]
pub(crate) unsafe fn retire_node(node: NodeRef<'_>, guard: &LocalGuard<'_>) {
    // SAFETY: forwarded from the caller.
    unsafe { retire_boxed(node.as_ptr(), guard) };
}

/// Free every node reachable from `root`.
///
/// Iterative (the tree is unbalanced, so depth can be linear in size). A
/// visited set protects against freeing a node twice if the structure is
/// corrupt.
///
/// # Safety
///
/// - No other thread may access the structure.
/// - Every reachable node must come from `Node::alloc_leaf` and must not be
///   retired.
pub(crate) unsafe fn reclaim_subtree(root: *mut Node) {
    let mut stack: Vec<*mut Node> = Vec::with_capacity(64);
    let mut visited: HashSet<usize> = HashSet::new();
    stack.push(root);

    while let Some(node) = stack.pop() {
        if node.is_null() || !visited.insert(node.addr()) {
            continue;
        }

        // SAFETY: node is a live, uniquely owned tree node.
        let boxed: Box<Node> = unsafe { Box::from_raw(node) };
        stack.push(boxed.child_ptr(Side::Left));
        stack.push(boxed.child_ptr(Side::Right));
    }
}

/// Free a singly linked chain, following `next` until null.
///
/// # Safety
///
/// Same contract as [`reclaim_subtree`], for chains of `T`.
pub(crate) unsafe fn reclaim_chain<T>(mut head: *mut T, next: impl Fn(&T) -> *mut T) {
    while !head.is_null() {
        // SAFETY: head is a live, uniquely owned node from Box::into_raw.
        let boxed: Box<T> = unsafe { Box::from_raw(head) };
        head = next(&boxed);
    }
}

/// Read a link for teardown purposes.
#[inline]
pub(crate) fn load_link<T>(link: &std::sync::atomic::AtomicPtr<T>) -> *mut T {
    link.load(READ_ORD)
}
