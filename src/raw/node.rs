use core::borrow::Borrow;

use smallvec::SmallVec;

use super::handle::Handle;
use crate::instrument::NodeId;

/// Keys kept inline before a node spills to the heap. Orders above this still work.
pub(crate) const INLINE_KEYS: usize = 16;

pub(crate) type Keys<K> = SmallVec<[K; INLINE_KEYS]>;
pub(crate) type Children = SmallVec<[Handle; INLINE_KEYS + 1]>;
pub(crate) type Values<V> = SmallVec<[V; INLINE_KEYS]>;

#[allow(clippy::large_enum_variant)]
pub(crate) enum Node<K, V> {
    Inner(InnerNode<K>),
    Leaf(LeafNode<K, V>),
}

// Separator `keys[i]` sits between `children[i]` and `children[i + 1]`:
//
//   children[0] keys[0] children[1] keys[1] children[2]
//
// so `children[i]` holds exactly `keys[i - 1] <= k < keys[i]`.
pub(crate) struct InnerNode<K> {
    id: NodeId,
    parent: Option<Handle>,
    keys: Keys<K>,
    children: Children,
}

pub(crate) struct LeafNode<K, V> {
    id: NodeId,
    parent: Option<Handle>,
    keys: Keys<K>,
    values: Values<V>,
}

/// Result of searching for a key in a leaf.
pub(crate) enum SearchResult {
    /// Key was found at the given index.
    Found(usize),
    /// Key was not found; index is where it would be inserted.
    NotFound(usize),
}

impl<K, V> Node<K, V> {
    pub(crate) fn id(&self) -> NodeId {
        match self {
            Node::Inner(inner) => inner.id,
            Node::Leaf(leaf) => leaf.id,
        }
    }

    pub(crate) fn parent(&self) -> Option<Handle> {
        match self {
            Node::Inner(inner) => inner.parent,
            Node::Leaf(leaf) => leaf.parent,
        }
    }

    /// Raw parent assignment. Callers go through `RawBTree::attach` / `RawBTree::rehome`,
    /// which enforce when a link may change.
    pub(crate) fn set_parent(&mut self, parent: Option<Handle>) {
        match self {
            Node::Inner(inner) => inner.parent = parent,
            Node::Leaf(leaf) => leaf.parent = parent,
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Returns the leaf node, panicking if this is not a leaf.
    pub(crate) fn as_leaf(&self) -> &LeafNode<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Inner(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the leaf node mutably, panicking if this is not a leaf.
    pub(crate) fn as_leaf_mut(&mut self) -> &mut LeafNode<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Inner(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the inner node mutably, panicking if this is not an inner node.
    pub(crate) fn as_inner_mut(&mut self) -> &mut InnerNode<K> {
        match self {
            Node::Inner(inner) => inner,
            Node::Leaf(_) => panic!("expected inner node"),
        }
    }

    /// True when the node holds more than `order` entries (leaf) or children (inner).
    ///
    /// # Panics
    ///
    /// Panics if an inner node holds more than `order + 1` children; no insertion path
    /// can produce that.
    pub(crate) fn is_overflow(&self, order: usize) -> bool {
        match self {
            Node::Leaf(leaf) => leaf.key_count() > order,
            Node::Inner(inner) => {
                assert!(
                    inner.child_count() <= order + 1,
                    "inner node has {} children, more than order + 1 ({})",
                    inner.child_count(),
                    order + 1
                );
                inner.child_count() > order
            }
        }
    }
}

impl<K> InnerNode<K> {
    /// Builds an unattached inner node from already-ordered parts.
    pub(crate) fn new(id: NodeId, keys: Keys<K>, children: Children) -> Self {
        assert_eq!(
            children.len(),
            keys.len() + 1,
            "inner node needs exactly one more child than separators"
        );
        Self {
            id,
            parent: None,
            keys,
            children,
        }
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn child_count(&self) -> usize {
        self.children.len()
    }

    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    pub(crate) fn children(&self) -> &[Handle] {
        &self.children
    }

    #[inline]
    pub(crate) fn child(&self, index: usize) -> Handle {
        self.children[index]
    }

    /// Position of `child` among this node's children.
    pub(crate) fn position_of(&self, child: Handle) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    /// Index of the child whose range holds `key`: the leftmost separator strictly
    /// greater than `key`, or the last child. Keys equal to a separator go right.
    #[inline]
    pub(crate) fn route<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.keys.partition_point(|separator| separator.borrow() <= key)
    }

    /// Replaces the child at `index` with `left, right` and puts `separator` between them.
    pub(crate) fn expand_at(&mut self, index: usize, left: Handle, right: Handle, separator: K) {
        self.children[index] = left;
        self.children.insert(index + 1, right);
        self.keys.insert(index, separator);
    }

    /// Consumes this node and rebuilds it as two nodes around the key at `len / 2`.
    /// The median key is returned for the parent; it lives in neither half.
    pub(crate) fn split_around_median(self, left_id: NodeId, right_id: NodeId) -> (Self, Self, K) {
        let Self {
            mut keys,
            mut children,
            ..
        } = self;
        let mid = keys.len() / 2;

        let right_keys: Keys<K> = keys.drain(mid + 1..).collect();
        let right_children: Children = children.drain(mid + 1..).collect();
        let Some(median) = keys.pop() else {
            panic!("cannot split an inner node without separators");
        };

        (
            Self::new(left_id, keys, children),
            Self::new(right_id, right_keys, right_children),
            median,
        )
    }
}

impl<K, V> LeafNode<K, V> {
    pub(crate) fn new(id: NodeId) -> Self {
        Self {
            id,
            parent: None,
            keys: SmallVec::new(),
            values: SmallVec::new(),
        }
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    #[inline]
    pub(crate) fn value(&self, index: usize) -> &V {
        &self.values[index]
    }

    pub(crate) fn pairs(&self) -> impl Iterator<Item = (&K, &V)> {
        self.keys.iter().zip(self.values.iter())
    }

    /// Searches for a key in this leaf.
    #[inline]
    pub(crate) fn search<Q>(&self, key: &Q) -> SearchResult
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match self.keys.binary_search_by(|k| k.borrow().cmp(key)) {
            Ok(idx) => SearchResult::Found(idx),
            Err(idx) => SearchResult::NotFound(idx),
        }
    }

    /// Inserts a key and value at the given position.
    pub(crate) fn insert(&mut self, index: usize, key: K, value: V) {
        self.keys.insert(index, key);
        self.values.insert(index, value);
    }

    /// Overwrites the value at `index`, returning the previous one.
    pub(crate) fn replace_value(&mut self, index: usize, value: V) -> V {
        core::mem::replace(&mut self.values[index], value)
    }

    /// Consumes this leaf and rebuilds it as two leaves around the pair at `len / 2`.
    /// `left` gets every pair below the median key, `right` the median and above.
    pub(crate) fn split_around_median(self, left_id: NodeId, right_id: NodeId) -> (Self, Self, K)
    where
        K: Clone,
    {
        let Self {
            mut keys,
            mut values,
            ..
        } = self;
        let mid = keys.len() / 2;
        let median = keys[mid].clone();

        let right = Self {
            id: right_id,
            parent: None,
            keys: keys.drain(mid..).collect(),
            values: values.drain(mid..).collect(),
        };
        let left = Self {
            id: left_id,
            parent: None,
            keys,
            values,
        };
        (left, right, median)
    }
}

impl<K: Ord, V> LeafNode<K, V> {
    pub(crate) fn is_sorted(&self) -> bool {
        self.keys.windows(2).all(|w| w[0] < w[1])
    }
}

#[cfg(test)]
impl<K> InnerNode<K> {
    pub(crate) fn keys_mut(&mut self) -> &mut Keys<K> {
        &mut self.keys
    }

    pub(crate) fn children_mut(&mut self) -> &mut Children {
        &mut self.children
    }
}

#[cfg(test)]
impl<K, V> LeafNode<K, V> {
    pub(crate) fn keys_mut(&mut self) -> &mut Keys<K> {
        &mut self.keys
    }
}
