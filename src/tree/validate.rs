//! Checks run while the relevant locks are held.
//!
//! A traversal result is only a hint. Before committing, the mutator locks
//! the nodes involved and confirms that nothing it relied on changed:
//! neither end of the link is marked and the link still points where the
//! traversal saw it point.

use seize::LocalGuard;

use super::traverse::{Edge, Position, find_successor};
use crate::node::{NodeRef, Side};

impl Position<'_> {
    /// Whether this position is still current.
    ///
    /// The caller must hold `parent`'s lock, and `current`'s lock if real.
    #[inline]
    pub(crate) fn is_valid(&self) -> bool {
        !self.parent.is_marked()
            && self.current.is_none_or(|node| !node.is_marked())
            && self.parent.links_to(self.side, self.current)
    }
}

impl Edge<'_> {
    /// Whether this edge is still current.
    ///
    /// The caller must hold the locks of both ends.
    #[inline]
    pub(crate) fn is_valid(&self) -> bool {
        !self.parent.is_marked()
            && !self.child.is_marked()
            && self.parent.links_to(self.side, Some(self.child))
    }
}

/// Whether `seen` is still the in-order successor of `base`.
///
/// Re-runs the successor search and requires the same parent, node and side,
/// and that the successor has not gained a left child.
pub(crate) fn successor_unchanged<'g>(
    base: NodeRef<'g>,
    seen: Edge<'g>,
    guard: &'g LocalGuard<'_>,
) -> bool {
    let Some(again) = find_successor(base, guard) else {
        return false;
    };

    again.parent.same(seen.parent)
        && again.child.same(seen.child)
        && again.side == seen.side
        && !seen.child.has_child(Side::Left)
}
