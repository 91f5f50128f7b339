//! # `lazyset`
//!
//! Concurrent ordered sets of `i32` keys built on fine-grained per-node
//! locking, lock-free traversal and lazy (marked) deletion.
//!
//! - [`LazyTree`]: an unbalanced binary search tree. Removing a node with two
//!   children moves its in-order successor into its place without ever
//!   hiding a live key from a concurrent reader.
//! - [`LazyList`]: the same protocol over a sorted singly linked list.
//!
//! | Operation | Concurrency |
//! |-----------|-------------|
//! | `contains` | lock-free, linearizable |
//! | `insert` / `remove` | locks a few adjacent nodes, linearizable |
//! | `size` / `keysum` / `keys` / `check_invariants` | quiescent only |
//!
//! ## Thread Safety
//!
//! Both structures are `Send + Sync` and are shared through `Arc` or scoped
//! threads. Every operation runs inside a `seize` guard; batches can reuse
//! one guard through the `*_with_guard` methods:
//!
//! ```rust
//! use lazyset::LazyTree;
//!
//! let tree = LazyTree::new();
//! let guard = tree.guard();
//!
//! for key in [8, 3, 12, 10, 14] {
//!     tree.insert_with_guard(key, &guard);
//! }
//!
//! // 8 has two children: 10 takes its place.
//! assert!(tree.remove_with_guard(8, &guard));
//! assert!(tree.contains_with_guard(10, &guard));
//! drop(guard);
//!
//! assert_eq!(tree.keys(), vec![3, 10, 12, 14]);
//! ```
//!
//! ## Memory
//!
//! Removed nodes are retired to the structure's `seize::Collector` and freed
//! once no guard can still observe them. Nodes still linked are freed on drop.
//!
//! ## Limitations
//!
//! - The tree is not balanced: sorted insertion builds a linear spine.
//! - Quiescent readers running next to mutators return unspecified results
//!   (they stay memory safe).

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::inline_always)]

pub mod config;
pub mod error;
pub mod guard;
pub mod list;
pub mod nodelock;
pub mod ordering;
pub mod set;
pub mod stats;
pub mod tree;

mod node;
mod reclaim;
mod retry;
mod tracing_helpers;

// Re-export main types for convenience
pub use config::Config;
pub use error::InvariantError;
pub use guard::SetGuard;
pub use list::LazyList;
pub use set::ConcurrentSet;
pub use stats::DebugCounters;
pub use tree::LazyTree;
