//! `LazyList` - a concurrent sorted singly linked list of `i32` keys.
//!
//! The same optimistic protocol as [`LazyTree`](crate::LazyTree) over a
//! single `next` link:
//!
//! ```text
//! head(-inf) -> k1 -> k2 -> ... -> tail(+inf)
//! ```
//!
//! - `contains` walks without locks and reports `key == k && !marked`.
//! - `insert` / `remove` lock `pred` (blocking) and `curr` (`try_lock`),
//!   validate `!pred.marked && !curr.marked && pred.next == curr`, then
//!   splice.
//!
//! Both ends are real nodes with out-of-band bounds, so every `i32` is an
//! ordinary key. The tail is locked like any other `curr`, which keeps a
//! concurrent append at the end of the list from going unnoticed.

use std::collections::HashSet;
use std::fmt as StdFmt;
use std::ptr::{self as StdPtr, NonNull};
use std::sync::atomic::AtomicPtr;

use seize::{Collector, LocalGuard};

use crate::config::Config;
use crate::error::InvariantError;
use crate::guard::SetGuard;
use crate::nodelock::NodeLock;
use crate::ordering::WRITE_ORD;
use crate::reclaim::{load_link, reclaim_chain, retire_boxed};
use crate::retry::{Attempt, RetryCause, run_until_done};
use crate::set::ConcurrentSet;
use crate::stats::{Counters, DebugCounters};
use crate::tracing_helpers::{error_log, trace_log};

/// Key of a list node, with the two bounds kept apart from user keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ListKey {
    NegInf,
    Key(i32),
    PosInf,
}

struct ListNode {
    key: ListKey,
    next: AtomicPtr<ListNode>,
    lock: NodeLock,
}

impl ListNode {
    fn boxed(key: ListKey, next: *mut Self) -> Box<Self> {
        Box::new(Self {
            key,
            next: AtomicPtr::new(next),
            lock: NodeLock::new(),
        })
    }

    /// Load `next`.
    ///
    /// Only the tail has a null `next`, and nobody walks past the tail.
    #[inline]
    fn next_ptr(&self) -> NonNull<Self> {
        match NonNull::new(load_link(&self.next)) {
            Some(next) => next,
            None => {
                error_log!(key = ?self.key, "walked past the tail");
                unreachable!("walked past the tail of a LazyList")
            }
        }
    }

    /// Borrow a loaded node for the guard's lifetime.
    #[inline]
    fn protect<'g>(ptr: NonNull<Self>, _guard: &'g LocalGuard<'_>) -> &'g Self {
        // SAFETY: links hold live nodes; removed nodes are retired through
        // the guard's collector and outlive 'g.
        unsafe { ptr.as_ref() }
    }

    #[inline]
    fn next<'g>(&self, guard: &'g LocalGuard<'_>) -> &'g Self {
        Self::protect(self.next_ptr(), guard)
    }

    #[inline]
    fn set_next(&self, next: *mut Self) {
        debug_assert!(self.lock.is_locked(), "link written without the lock");
        self.next.store(next, WRITE_ORD);
    }
}

/// Adjacent nodes around a key: `pred.key < key <= curr.key`.
#[derive(Clone, Copy)]
struct Window<'g> {
    pred: &'g ListNode,
    curr: &'g ListNode,
    /// `curr` exactly as loaded from a link.
    curr_ptr: NonNull<ListNode>,
}

impl Window<'_> {
    /// The caller must hold both locks.
    #[inline]
    fn is_valid(&self) -> bool {
        !self.pred.lock.is_marked()
            && !self.curr.lock.is_marked()
            && load_link(&self.pred.next) == self.curr_ptr.as_ptr()
    }
}

// ============================================================================
//  LazyList
// ============================================================================

/// A concurrent ordered set of `i32` keys backed by a sorted list.
///
/// Same contract as [`LazyTree`](crate::LazyTree): linearizable
/// `contains`/`insert`/`remove`, quiescent `size`/`keysum`/`keys`. Operations
/// are linear in the number of keys.
///
/// ```rust
/// use lazyset::LazyList;
///
/// let list = LazyList::new();
/// assert!(list.insert(i32::MAX));
/// assert!(list.insert(-1));
/// assert_eq!(list.keys(), vec![-1, i32::MAX]);
/// ```
pub struct LazyList {
    collector: Collector,
    head: Box<ListNode>,
    counters: Counters,
    config: &'static Config,
}

impl LazyList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::global())
    }

    /// Create an empty list with explicit tuning.
    #[must_use]
    pub fn with_config(config: &'static Config) -> Self {
        let tail: *mut ListNode =
            Box::into_raw(ListNode::boxed(ListKey::PosInf, StdPtr::null_mut()));

        Self {
            collector: Collector::new(),
            head: ListNode::boxed(ListKey::NegInf, tail),
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

    /// Whether `key` is in the set. Never locks.
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
    /// If `guard` was not issued by this list.
    #[must_use]
    pub fn contains_with_guard(&self, key: i32, guard: &SetGuard<'_>) -> bool {
        guard.assert_owned_by(&self.collector);
        let window: Window<'_> = self.find(key, guard);
        window.curr.key == ListKey::Key(key) && !window.curr.lock.is_marked()
    }

    /// [`insert`](Self::insert) under a caller-held guard.
    ///
    /// # Panics
    /// If `guard` was not issued by this list.
    pub fn insert_with_guard(&self, key: i32, guard: &SetGuard<'_>) -> bool {
        guard.assert_owned_by(&self.collector);
        run_until_done("list_insert", key, self.config, &self.counters, || {
            self.try_insert(key, guard)
        })
    }

    /// [`remove`](Self::remove) under a caller-held guard.
    ///
    /// # Panics
    /// If `guard` was not issued by this list.
    pub fn remove_with_guard(&self, key: i32, guard: &SetGuard<'_>) -> bool {
        guard.assert_owned_by(&self.collector);
        run_until_done("list_remove", key, self.config, &self.counters, || {
            self.try_remove(key, guard)
        })
    }

    /// Number of keys. Quiescent only.
    #[must_use]
    pub fn size(&self) -> usize {
        let mut count: usize = 0;
        self.for_each_key(|_| count += 1);
        count
    }

    /// Sum of all keys, accumulated in 64 bits. Quiescent only.
    #[must_use]
    pub fn keysum(&self) -> i64 {
        let mut sum: i64 = 0;
        self.for_each_key(|key| sum += i64::from(key));
        sum
    }

    /// All keys in ascending order. Quiescent only.
    #[must_use]
    pub fn keys(&self) -> Vec<i32> {
        let mut keys: Vec<i32> = Vec::new();
        self.for_each_key(|key| keys.push(key));
        keys
    }

    /// Whether the list holds no key. Quiescent only.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let guard = self.guard();
        self.head.next(&guard).key == ListKey::PosInf
    }

    /// Audit the list. Quiescent only.
    ///
    /// # Errors
    /// The first violation found: keys not strictly increasing, a marked
    /// node still linked, or a node linked twice.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let guard = self.guard();
        let mut visited: HashSet<usize> = HashSet::new();
        let mut previous: Option<i32> = None;
        let mut node: &ListNode = self.head.next(&guard);

        while let ListKey::Key(key) = node.key {
            if !visited.insert(StdPtr::from_ref(node).addr()) {
                return Err(InvariantError::SharedNode { key });
            }
            if node.lock.is_marked() {
                return Err(InvariantError::MarkedReachable { key });
            }
            if let Some(prev) = previous.filter(|&prev| prev >= key) {
                return Err(InvariantError::OutOfOrder { prev, next: key });
            }
            previous = Some(key);
            node = node.next(&guard);
        }

        Ok(())
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

    /// Walk to the first node whose key is `>= key`.
    fn find<'g>(&'g self, key: i32, guard: &'g LocalGuard<'_>) -> Window<'g> {
        let target = ListKey::Key(key);
        let mut pred: &'g ListNode = &self.head;
        let mut curr_ptr: NonNull<ListNode> = pred.next_ptr();
        let mut curr: &'g ListNode = ListNode::protect(curr_ptr, guard);

        while curr.key < target {
            pred = curr;
            curr_ptr = curr.next_ptr();
            curr = ListNode::protect(curr_ptr, guard);
        }

        Window {
            pred,
            curr,
            curr_ptr,
        }
    }

    fn try_insert(&self, key: i32, guard: &LocalGuard<'_>) -> Attempt<bool> {
        let window: Window<'_> = self.find(key, guard);
        let _pred_lock = window.pred.lock.lock();
        let Some(_curr_lock) = window.curr.lock.try_lock() else {
            return Attempt::Retry(RetryCause::Contended);
        };

        if !window.is_valid() {
            return Attempt::Retry(RetryCause::Validation);
        }

        if window.curr.key == ListKey::Key(key) {
            return Attempt::Done(false);
        }

        let node: *mut ListNode = Box::into_raw(ListNode::boxed(
            ListKey::Key(key),
            window.curr_ptr.as_ptr(),
        ));
        window.pred.set_next(node);
        trace_log!(key, "list node published");
        Attempt::Done(true)
    }

    fn try_remove(&self, key: i32, guard: &LocalGuard<'_>) -> Attempt<bool> {
        let window: Window<'_> = self.find(key, guard);
        let _pred_lock = window.pred.lock.lock();
        let Some(mut curr_lock) = window.curr.lock.try_lock() else {
            return Attempt::Retry(RetryCause::Contended);
        };

        if !window.is_valid() {
            return Attempt::Retry(RetryCause::Validation);
        }

        if window.curr.key != ListKey::Key(key) {
            return Attempt::Done(false);
        }

        curr_lock.mark();
        window.pred.set_next(load_link(&window.curr.next));

        // SAFETY: `curr` came from Box::into_raw, is marked and unlinked.
        unsafe { retire_boxed(window.curr_ptr.as_ptr(), guard) };

        trace_log!(key, "list node removed");
        Attempt::Done(true)
    }

    fn for_each_key<F: FnMut(i32)>(&self, mut visit: F) {
        let guard = self.guard();
        let mut node: &ListNode = self.head.next(&guard);

        while let ListKey::Key(key) = node.key {
            visit(key);
            node = node.next(&guard);
        }
    }
}

impl Default for LazyList {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LazyList {
    fn drop(&mut self) {
        let first: *mut ListNode = load_link(&self.head.next);

        // SAFETY: exclusive access; every linked node (tail included) came
        // from Box::into_raw and retired nodes are no longer linked.
        unsafe { reclaim_chain(first, |node: &ListNode| load_link(&node.next)) };
    }
}

impl StdFmt::Debug for LazyList {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("LazyList")
            .field("counters", &self.counters.snapshot())
            .finish_non_exhaustive()
    }
}

impl Extend<i32> for LazyList {
    fn extend<I: IntoIterator<Item = i32>>(&mut self, iter: I) {
        let guard = self.guard();
        for key in iter {
            self.insert_with_guard(key, &guard);
        }
    }
}

impl FromIterator<i32> for LazyList {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl ConcurrentSet for LazyList {
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
