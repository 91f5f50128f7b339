//! Per-node lock and deletion mark.
//!
//! [`NodeLock`] pairs a `parking_lot` raw mutex with the node's `marked`
//! flag. Readers check [`NodeLock::is_marked`] without locking; writers take a
//! [`LockGuard`] and mutate the node while holding it.
//!
//! # Type-State Pattern
//! A [`LockGuard`] can only be obtained from [`NodeLock::lock`] or
//! [`NodeLock::try_lock`]. Marking takes `&mut LockGuard` as proof that the
//! lock is held, and the lock is released when the guard drops (panic-safe).
//!
//! ```rust
//! use lazyset::nodelock::NodeLock;
//!
//! let lock = NodeLock::new();
//! {
//!     let mut guard = lock.lock();
//!     guard.mark();
//! }
//! assert!(lock.is_marked());
//! assert!(!lock.is_locked());
//! ```

use std::fmt as StdFmt;
use std::marker::PhantomData;
use std::sync::atomic::AtomicBool;

use parking_lot::RawMutex;
use parking_lot::lock_api::RawMutex as RawMutexApi;

use crate::ordering::{READ_ORD, WRITE_ORD};

/// Lock plus logical-deletion flag embedded in every node.
///
/// `marked` is monotonic: it goes from `false` to `true` exactly once, while
/// the lock is held.
pub struct NodeLock {
    raw: RawMutex,
    marked: AtomicBool,
}

/// Proof that a [`NodeLock`] is held.
///
/// The lock is released when the guard drops, including during unwinding.
/// `PhantomData<*mut ()>` keeps the guard `!Send`: a raw mutex must be
/// unlocked by the thread that locked it.
#[must_use = "releasing a lock without using the guard is a logic error"]
pub struct LockGuard<'a> {
    lock: &'a NodeLock,
    _marker: PhantomData<*mut ()>,
}

impl NodeLock {
    /// Create an unlocked, unmarked lock.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            raw: <RawMutex as RawMutexApi>::INIT,
            marked: AtomicBool::new(false),
        }
    }

    /// Acquire the lock, blocking until it is available.
    pub fn lock(&self) -> LockGuard<'_> {
        self.raw.lock();

        LockGuard {
            lock: self,
            _marker: PhantomData,
        }
    }

    /// Acquire the lock only if it is free right now.
    #[must_use]
    pub fn try_lock(&self) -> Option<LockGuard<'_>> {
        if !self.raw.try_lock() {
            return None;
        }

        Some(LockGuard {
            lock: self,
            _marker: PhantomData,
        })
    }

    /// Whether the node has been logically deleted.
    #[inline]
    #[must_use]
    pub fn is_marked(&self) -> bool {
        self.marked.load(READ_ORD)
    }

    /// Whether some thread currently holds the lock.
    ///
    /// Only meaningful for assertions: the answer can be stale on return.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }
}

impl Default for NodeLock {
    fn default() -> Self {
        Self::new()
    }
}

impl StdFmt::Debug for NodeLock {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("NodeLock")
            .field("locked", &self.is_locked())
            .field("marked", &self.is_marked())
            .finish()
    }
}

impl LockGuard<'_> {
    /// Logically delete the node.
    ///
    /// # Panics
    /// In debug builds, if the node is already marked: a node is deleted
    /// exactly once.
    #[inline]
    pub fn mark(&mut self) {
        debug_assert!(!self.lock.is_marked(), "node marked twice");
        self.lock.marked.store(true, WRITE_ORD);
    }

    /// Whether this guard protects `lock`.
    #[inline]
    #[must_use]
    pub fn guards(&self, lock: &NodeLock) -> bool {
        std::ptr::eq(self.lock, lock)
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: a LockGuard only exists while this thread holds `raw`, and
        // it is `!Send`, so the unlocking thread is the locking thread.
        unsafe { self.lock.raw.unlock() };
    }
}

impl StdFmt::Debug for LockGuard<'_> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("LockGuard")
            .field("marked", &self.lock.is_marked())
            .finish_non_exhaustive()
    }
}
