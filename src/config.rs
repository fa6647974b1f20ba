//! Construction-time configuration for [`BTree`](crate::BTree).

use crate::instrument::{Hooks, NodeId};

/// Smallest order the split algorithm supports.
pub const MIN_ORDER: usize = 2;

/// Order used by [`TreeConfig::default`].
pub const DEFAULT_ORDER: usize = 2;

/// Everything a tree needs to know before its first node is created.
///
/// # Examples
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use locality_btree::{BTree, TreeConfig};
///
/// let splits = Rc::new(Cell::new(0));
/// let config = TreeConfig::new(3).with_rebalance_counter({
///     let splits = Rc::clone(&splits);
///     move || splits.set(splits.get() + 1)
/// });
///
/// let mut tree = BTree::with_config(config);
/// for k in 0..4 {
///     tree.insert(k, ());
/// }
/// assert_eq!(splits.get(), 1);
/// ```
#[derive(Debug)]
pub struct TreeConfig {
    pub(crate) order: usize,
    pub(crate) strict: bool,
    pub(crate) hooks: Hooks,
}

impl TreeConfig {
    /// Creates a configuration for a tree of the given order with no hooks.
    ///
    /// The order is the maximum number of children of an inner node and the maximum
    /// number of entries of a leaf. It is validated when the tree is built.
    #[must_use]
    pub fn new(order: usize) -> Self {
        Self {
            order,
            strict: false,
            hooks: Hooks::default(),
        }
    }

    /// Sets the callback fired with the identity of every node a tree operation touches.
    #[must_use]
    pub fn with_access_counter(mut self, access: impl Fn(NodeId) + 'static) -> Self {
        self.hooks.access = Some(Box::new(access));
        self
    }

    /// Sets the callback fired once per split event.
    #[must_use]
    pub fn with_rebalance_counter(mut self, rebalance: impl Fn() + 'static) -> Self {
        self.hooks.rebalance = Some(Box::new(rebalance));
        self
    }

    /// Enables strict mode: every insert re-validates the whole tree and panics on the
    /// first violated invariant. Meant for tests; it turns inserts into O(n).
    ///
    /// Strict checks walk the tree and therefore also fire the access counter.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Returns the configured order.
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Returns whether strict mode is enabled.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ORDER)
    }
}
