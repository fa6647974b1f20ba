//! Instrumentation hooks for observing node accesses and split work.
//!
//! The tree reports two kinds of events:
//!
//! - an **access** every time a node-level operation touches a node (descent, leaf search,
//!   overflow check, split, parent link read or write, traversal step, print, creation);
//! - a **rebalance** once per split event while a split propagates towards the root.
//!
//! Hooks are handed to the tree through [`TreeConfig`](crate::TreeConfig) before the first
//! node exists, so no node is ever created without them.

use core::fmt;

/// Identity of a node instance.
///
/// Identities are issued in creation order starting at zero and are never reused within a
/// tree, even though the storage slot of a node retired by a split is.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw creation sequence number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Callback fired with the identity of every node touched.
pub type AccessCounter = Box<dyn Fn(NodeId)>;

/// Callback fired once per split event.
pub type RebalanceCounter = Box<dyn Fn()>;

#[derive(Default)]
pub(crate) struct Hooks {
    pub(crate) access: Option<AccessCounter>,
    pub(crate) rebalance: Option<RebalanceCounter>,
}

impl Hooks {
    #[inline]
    pub(crate) fn count_access(&self, id: NodeId) {
        if let Some(access) = &self.access {
            access(id);
        }
    }

    #[inline]
    pub(crate) fn count_rebalance(&self) {
        if let Some(rebalance) = &self.rebalance {
            rebalance();
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("access", &self.access.is_some())
            .field("rebalance", &self.rebalance.is_some())
            .finish()
    }
}
