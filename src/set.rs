//! The operations shared by [`LazyTree`](crate::LazyTree) and
//! [`LazyList`](crate::LazyList).
//!
//! Tests and benchmarks are written once against this trait and run on both
//! structures.

use crate::error::InvariantError;

/// A concurrent set of `i32` keys.
///
/// `contains`, `insert` and `remove` are linearizable and may be called from
/// any number of threads. The remaining methods are quiescent: callers must
/// ensure no mutator runs at the same time.
pub trait ConcurrentSet: Send + Sync {
    /// Returns `true` iff the set contains `key`.
    fn contains(&self, key: i32) -> bool;

    /// Adds `key`. Returns whether it was newly inserted.
    fn insert(&self, key: i32) -> bool;

    /// Removes `key`. Returns whether it was present.
    fn remove(&self, key: i32) -> bool;

    /// Number of keys. Quiescent only.
    fn size(&self) -> usize;

    /// Sum of all keys. Quiescent only.
    fn keysum(&self) -> i64;

    /// Keys in ascending order. Quiescent only.
    fn keys(&self) -> Vec<i32>;

    /// Structural audit. Quiescent only.
    ///
    /// # Errors
    /// The first broken invariant found.
    fn check_invariants(&self) -> Result<(), InvariantError>;
}
