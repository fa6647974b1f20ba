use core::borrow::Borrow;
use core::fmt;
use std::io;

use crate::config::TreeConfig;
use crate::error::Result;
use crate::raw::RawBTree;
use crate::stats::TreeStats;

/// An ordered map based on a [B-Tree] of configurable order, instrumented for studying
/// node-access locality.
///
/// Given a key type with a [total order], the map stores its entries in leaves sorted by
/// key. Inner nodes hold separator keys: a key equal to a separator lives in the subtree to
/// the separator's right.
///
/// The order `m` bounds both the children of an inner node and the entries of a leaf.
/// An insert that pushes a leaf to `m + 1` entries splits it around its median key; the
/// split propagates upward for as long as parents overflow, growing a new root when it
/// reaches the top. All leaves therefore stay at the same depth.
///
/// The median rule leaves the right half of an inner split with one child fewer than the
/// left. At order 2 that half has a single child and no separator, so descending input
/// grows the tree by about one level per two keys instead of logarithmically. Orders of 3
/// and above keep every split half with at least one separator.
///
/// Every node-level operation reports the node it touched to the access counter, and every
/// split reports itself to the rebalance counter; see [`TreeConfig`].
///
/// # Examples
///
/// ```
/// use locality_btree::BTree;
///
/// let mut tree = BTree::new(2);
/// for k in [10, 20, 30, 40, 50] {
///     tree.insert(k, k);
///     assert!(tree.integrity_check().is_ok());
/// }
///
/// assert_eq!(tree.find(&30), Some(&30));
/// assert_eq!(tree.find(&25), None);
///
/// // Inserting an existing key overwrites its value.
/// tree.insert(10, 999);
/// assert_eq!(tree.find(&10), Some(&999));
/// assert_eq!(tree.len(), 5);
/// ```
///
/// Counting node visits while inserting a shuffled sequence:
///
/// ```
/// use std::cell::RefCell;
/// use std::collections::HashSet;
/// use std::rc::Rc;
/// use locality_btree::{BTree, TreeConfig};
///
/// let seen = Rc::new(RefCell::new(HashSet::new()));
/// let config = TreeConfig::new(3).with_access_counter({
///     let seen = Rc::clone(&seen);
///     move |node| {
///         seen.borrow_mut().insert(node);
///     }
/// });
///
/// let mut tree = BTree::with_config(config);
/// for k in [5, 1, 4, 2, 3, 9, 0, 8, 6, 7] {
///     tree.insert(k, ());
/// }
/// assert_eq!(seen.borrow().len() as u64, tree.stats().nodes_created);
/// ```
///
/// # Concurrency
///
/// The tree is single-threaded: it is neither `Send` nor `Sync` because its hooks are plain
/// closures. Callers needing shared access wrap a whole tree behind one lock.
///
/// [B-Tree]: https://en.wikipedia.org/wiki/B-tree
/// [total order]: https://en.wikipedia.org/wiki/Total_order
pub struct BTree<K, V> {
    raw: RawBTree<K, V>,
}

impl<K, V> BTree<K, V> {
    /// Makes a new, empty tree of the given order with no instrumentation.
    ///
    /// # Panics
    ///
    /// Panics if `order < 2`.
    ///
    /// # Examples
    ///
    /// ```
    /// use locality_btree::BTree;
    ///
    /// let tree: BTree<i32, &str> = BTree::new(4);
    /// assert!(tree.is_empty());
    /// assert_eq!(tree.order(), 4);
    /// ```
    #[must_use]
    pub fn new(order: usize) -> Self {
        Self::with_config(TreeConfig::new(order))
    }

    /// Makes a new, empty tree from a configuration carrying the order, hooks and strict
    /// flag. The hooks observe the initial root leaf as well as every later node.
    ///
    /// # Panics
    ///
    /// Panics if the configured order is below 2.
    #[must_use]
    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            raw: RawBTree::new(config),
        }
    }

    /// Returns the order the tree was built with.
    #[must_use]
    pub fn order(&self) -> usize {
        self.raw.order()
    }

    /// Returns the number of entries in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the tree holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the number of levels, 1 for a tree whose root is a leaf.
    #[must_use]
    pub fn height(&self) -> usize {
        self.raw.height()
    }

    /// Returns a snapshot of the tree's structural counters.
    #[must_use]
    pub fn stats(&self) -> TreeStats {
        self.raw.stats()
    }
}

impl<K: Ord + Clone, V> BTree<K, V> {
    /// Inserts a key-value pair.
    ///
    /// If the key is already present its value is overwritten; keys are never duplicated.
    /// Any node the insert overflows is split before this returns.
    ///
    /// # Examples
    ///
    /// ```
    /// use locality_btree::BTree;
    ///
    /// let mut tree = BTree::new(2);
    /// tree.insert(37, "a");
    /// tree.insert(37, "b");
    /// assert_eq!(tree.find(&37), Some(&"b"));
    /// assert_eq!(tree.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, value: V) {
        self.raw.insert(key, value);
    }

    /// Returns a reference to the value stored under `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use locality_btree::BTree;
    ///
    /// let mut tree = BTree::new(3);
    /// tree.insert(1, "a");
    /// assert_eq!(tree.find(&1), Some(&"a"));
    /// assert_eq!(tree.find(&2), None);
    /// ```
    pub fn find<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.find(key)
    }

    /// Returns `true` if the tree holds a value for `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.find(key).is_some()
    }

    /// Verifies every structural invariant of the tree and reports the first violation:
    /// leaf and inner node sizes, key ordering inside nodes, child and separator counts, parent links in
    /// both directions, the key range of every subtree, and that all leaves share one depth.
    ///
    /// Both passes, collecting subtree key bounds and then checking nodes, fire the access
    /// counter like any other traversal.
    ///
    /// # Errors
    ///
    /// Returns the first [`IntegrityError`](crate::IntegrityError) found in pre-order.
    pub fn integrity_check(&self) -> Result<()> {
        self.raw.integrity_check()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> BTree<K, V> {
    /// Writes a human-readable, indented dump of the tree.
    ///
    /// Inner nodes are framed by `--` lines with their separators written between
    /// children, one level of indentation deeper per level; leaves print one
    /// `[key]:value` line per entry. The format is diagnostic only.
    ///
    /// # Errors
    ///
    /// Propagates any error from the writer.
    ///
    /// # Examples
    ///
    /// ```
    /// use locality_btree::BTree;
    ///
    /// let mut tree = BTree::new(2);
    /// for k in [1, 2, 3] {
    ///     tree.insert(k, k * 10);
    /// }
    ///
    /// let mut out = Vec::new();
    /// tree.print(&mut out).unwrap();
    /// assert_eq!(String::from_utf8(out).unwrap(), "--\n [1]:10\n2:\n [2]:20\n [3]:30\n--\n");
    /// ```
    pub fn print<W: io::Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        self.raw.print(w)
    }
}

impl<K, V> Default for BTree<K, V> {
    /// Creates an empty tree with [`DEFAULT_ORDER`](crate::DEFAULT_ORDER).
    fn default() -> Self {
        Self::with_config(TreeConfig::default())
    }
}

impl<K: Ord + Clone, V> Extend<(K, V)> for BTree<K, V> {
    #[inline]
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V> fmt::Debug for BTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BTree")
            .field("order", &self.order())
            .field("len", &self.len())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}
