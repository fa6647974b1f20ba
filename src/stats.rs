//! Structural counters for a [`BTree`](crate::BTree).

/// A snapshot of how much structure a tree has built so far.
///
/// Reading it does not touch any node, so it never fires the access counter.
///
/// # Example
/// ```
/// use locality_btree::BTree;
///
/// let mut tree = BTree::new(2);
/// for k in [10, 20, 30] {
///     tree.insert(k, k);
/// }
///
/// let stats = tree.stats();
/// assert_eq!(stats.splits, 1);
/// assert_eq!(stats.height, 2);
/// // the initial root leaf, its two halves and the new root
/// assert_eq!(stats.nodes_created, 4);
/// assert_eq!(stats.live_nodes, 3);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Node identities issued since construction, including nodes since retired by splits.
    pub nodes_created: u64,

    /// Nodes currently reachable from the root.
    pub live_nodes: usize,

    /// Split events, one per level that overflowed during an insert.
    pub splits: u64,

    /// Number of levels, counting the leaf level.
    pub height: usize,
}

impl TreeStats {
    /// Nodes that were built and later discarded by a split.
    #[must_use]
    pub fn retired_nodes(&self) -> u64 {
        self.nodes_created - self.live_nodes as u64
    }
}
