//! Tree node and guard-scoped node references.
//!
//! A [`Node`] holds an immutable key, two atomic child links and a
//! [`NodeLock`]. A null link is the absence sentinel: it stands for "no
//! child", orders after every key, and is never locked or marked.
//!
//! Nodes are reached through [`NodeRef`], a copyable pointer whose lifetime
//! is tied to a `seize` guard. Retired nodes are reclaimed only after every
//! guard that could have loaded them is gone, so a `NodeRef<'g>` stays valid
//! for `'g` even if the node is unlinked meanwhile.

use std::fmt as StdFmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::{self as StdPtr, NonNull};
use std::sync::atomic::AtomicPtr;

use seize::LocalGuard;

use crate::nodelock::NodeLock;
use crate::ordering::{READ_ORD, WRITE_ORD};

/// Which child link of a parent a position refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

/// A tree node.
pub(crate) struct Node {
    key: i32,
    left: AtomicPtr<Node>,
    right: AtomicPtr<Node>,
    lock: NodeLock,
}

impl Node {
    /// A node with no children.
    pub(crate) const fn new(key: i32) -> Self {
        Self {
            key,
            left: AtomicPtr::new(StdPtr::null_mut()),
            right: AtomicPtr::new(StdPtr::null_mut()),
            lock: NodeLock::new(),
        }
    }

    /// Allocate an unpublished leaf.
    ///
    /// The node is private to the caller until a link store publishes it.
    pub(crate) fn alloc_leaf(key: i32) -> NonNull<Self> {
        NonNull::from(Box::leak(Box::new(Self::new(key))))
    }

    #[inline]
    pub(crate) const fn key(&self) -> i32 {
        self.key
    }

    #[inline]
    pub(crate) const fn lock(&self) -> &NodeLock {
        &self.lock
    }

    #[inline]
    pub(crate) fn is_marked(&self) -> bool {
        self.lock.is_marked()
    }

    #[inline]
    const fn link(&self, side: Side) -> &AtomicPtr<Self> {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Raw child pointer, for identity comparisons.
    #[inline]
    pub(crate) fn child_ptr(&self, side: Side) -> *mut Self {
        self.link(side).load(READ_ORD)
    }

    /// Load a child link.
    #[inline]
    pub(crate) fn child<'g>(&self, side: Side, _guard: &'g LocalGuard<'_>) -> Option<NodeRef<'g>> {
        // SAFETY: links only ever hold null or live nodes, and nodes are
        // retired through the guard's collector, so they outlive 'g.
        unsafe { NodeRef::from_raw(self.child_ptr(side)) }
    }

    #[inline]
    pub(crate) fn has_child(&self, side: Side) -> bool {
        !self.child_ptr(side).is_null()
    }

    /// Whether `side` currently links to `expected` (`None` = absence).
    #[inline]
    pub(crate) fn links_to(&self, side: Side, expected: Option<NodeRef<'_>>) -> bool {
        StdPtr::eq(self.child_ptr(side), NodeRef::as_ptr_or_null(expected))
    }

    /// Overwrite a child link.
    ///
    /// The caller must hold this node's lock.
    #[inline]
    pub(crate) fn set_child(&self, side: Side, child: Option<NodeRef<'_>>) {
        debug_assert!(self.lock.is_locked(), "link written without the lock");
        self.link(side).store(NodeRef::as_ptr_or_null(child), WRITE_ORD);
    }

    /// Publish a freshly allocated node into a child link.
    ///
    /// The caller must hold this node's lock.
    #[inline]
    pub(crate) fn publish_child(&self, side: Side, child: NonNull<Self>) {
        debug_assert!(self.lock.is_locked(), "link written without the lock");
        self.link(side).store(child.as_ptr(), WRITE_ORD);
    }
}

impl StdFmt::Debug for Node {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("Node")
            .field("key", &self.key)
            .field("marked", &self.is_marked())
            .field("has_left", &self.has_child(Side::Left))
            .field("has_right", &self.has_child(Side::Right))
            .finish()
    }
}

// ============================================================================
//  NodeRef
// ============================================================================

/// A guard-scoped reference to a [`Node`].
///
/// Compared by identity, never by key.
pub(crate) struct NodeRef<'g> {
    ptr: NonNull<Node>,
    _guard: PhantomData<&'g Node>,
}

impl<'g> NodeRef<'g> {
    /// Wrap a raw link value.
    ///
    /// # Safety
    /// `ptr` must be null or point to a node that stays allocated for `'g`.
    #[inline]
    pub(crate) unsafe fn from_raw(ptr: *mut Node) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self {
            ptr,
            _guard: PhantomData,
        })
    }

    /// Reference to a node owned by the structure itself (the head).
    ///
    /// Such a node is never stored in a link, so its pointer is only used
    /// for reads and identity.
    #[inline]
    pub(crate) fn from_owned(node: &'g Node) -> Self {
        Self {
            ptr: NonNull::from(node),
            _guard: PhantomData,
        }
    }

    #[inline]
    pub(crate) const fn as_ptr(self) -> *mut Node {
        self.ptr.as_ptr()
    }

    #[inline]
    pub(crate) fn as_ptr_or_null(node: Option<Self>) -> *mut Node {
        node.map_or(StdPtr::null_mut(), Self::as_ptr)
    }

    /// Borrow the node for the full guard lifetime.
    #[inline]
    pub(crate) const fn get(self) -> &'g Node {
        // SAFETY: construction guarantees the node outlives 'g.
        unsafe { self.ptr.as_ref() }
    }

    #[inline]
    pub(crate) fn same(self, other: Self) -> bool {
        self.ptr == other.ptr
    }

    #[cfg(test)]
    pub(crate) fn same_opt(a: Option<Self>, b: Option<Self>) -> bool {
        StdPtr::eq(Self::as_ptr_or_null(a), Self::as_ptr_or_null(b))
    }
}

impl Clone for NodeRef<'_> {
    fn clone(&self) -> Self {
        *self
    }
}

impl Copy for NodeRef<'_> {}

impl Deref for NodeRef<'_> {
    type Target = Node;

    #[inline]
    fn deref(&self) -> &Node {
        // SAFETY: construction guarantees the node outlives the reference.
        unsafe { self.ptr.as_ref() }
    }
}

impl StdFmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_tuple("NodeRef").field(&self.key()).finish()
    }
}
