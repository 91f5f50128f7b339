//! Standard memory orderings for node links and the marked flag.
//!
//! Links and flags are written only under the owning node's lock and read
//! both under lock (validation) and without it (traversal). Every write is a
//! `Release` store and every read an `Acquire` load, so a traversal that
//! reaches a node through a freshly published link also sees that node's
//! initialized fields.

use std::sync::atomic::Ordering;

/// Ordering for reading links and flags, during traversal or under lock.
/// Pairs with writer's `Release` stores.
pub const READ_ORD: Ordering = Ordering::Acquire;

/// Ordering for writing links and flags under lock.
/// Pairs with reader's `Acquire` loads.
pub const WRITE_ORD: Ordering = Ordering::Release;

/// Ordering for the statistics counters, which synchronize nothing.
pub const RELAXED: Ordering = Ordering::Relaxed;
