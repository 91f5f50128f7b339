//! Structural audit errors.
//!
//! Ordinary outcomes (duplicate insert, missing key) are plain `bool`s and
//! never errors. [`InvariantError`] is only produced by the quiescent
//! `check_invariants` audits.

use std::fmt as StdFmt;

/// A broken structural invariant found by a quiescent audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    /// Two consecutive keys of an in-order walk are not strictly increasing.
    OutOfOrder {
        /// Key visited first.
        prev: i32,
        /// Key visited right after `prev`.
        next: i32,
    },

    /// A logically deleted node is still reachable.
    MarkedReachable {
        /// Key of the marked node.
        key: i32,
    },

    /// A node is reachable along two paths (or through a cycle).
    SharedNode {
        /// Key of the node reached twice.
        key: i32,
    },
}

impl StdFmt::Display for InvariantError {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::OutOfOrder { prev, next } => {
                write!(f, "keys out of order: {prev} visited before {next}")
            }

            Self::MarkedReachable { key } => {
                write!(f, "marked node {key} is still reachable")
            }

            Self::SharedNode { key } => {
                write!(f, "node {key} is reachable more than once")
            }
        }
    }
}

impl std::error::Error for InvariantError {}
