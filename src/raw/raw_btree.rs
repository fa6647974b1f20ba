use core::borrow::Borrow;
use core::fmt;
use std::io;

use smallvec::{SmallVec, smallvec};

use super::arena::Arena;
use super::handle::Handle;
use super::node::{Children, InnerNode, LeafNode, Node, SearchResult};
use crate::config::{MIN_ORDER, TreeConfig};
use crate::instrument::{Hooks, NodeId};
use crate::stats::TreeStats;
use crate::tracing_helpers::{debug_log, trace_log};

/// The core B-tree implementation backing `BTree`.
pub(crate) struct RawBTree<K, V> {
    /// Arena storing all live nodes.
    nodes: Arena<Node<K, V>>,
    /// Handle to the root node, a leaf until the first split.
    root: Handle,
    /// Maximum children of an inner node and maximum entries of a leaf.
    order: usize,
    /// Total number of key-value pairs in the tree.
    len: usize,
    /// Number of levels, counting the leaf level.
    height: usize,
    /// Identity handed to the next node built.
    next_id: u64,
    /// Split events since construction.
    splits: u64,
    /// Re-validate the whole tree after every insert.
    strict: bool,
    hooks: Hooks,
}

/// A node that was split: where it was, and what replaces it.
struct Split<K> {
    /// Slot of the retired node. It may already be reused by `left` or `right`.
    retired: Handle,
    /// Parent of the retired node, `None` if it was the root.
    parent: Option<Handle>,
    left: Handle,
    right: Handle,
    /// Smallest key reachable under `right`.
    separator: K,
}

impl<K, V> RawBTree<K, V> {
    /// Creates a tree holding a single empty root leaf.
    ///
    /// # Panics
    ///
    /// Panics if the configured order is below [`MIN_ORDER`].
    pub(crate) fn new(config: TreeConfig) -> Self {
        let TreeConfig { order, strict, hooks } = config;
        assert!(order >= MIN_ORDER, "B-tree order must be at least {MIN_ORDER}, got {order}");

        let root_id = NodeId::new(0);
        let mut nodes = Arena::new();
        let root = nodes.store(Node::Leaf(LeafNode::new(root_id)));
        hooks.count_access(root_id);

        Self {
            nodes,
            root,
            order,
            len: 0,
            height: 1,
            next_id: 1,
            splits: 0,
            strict,
            hooks,
        }
    }

    pub(crate) const fn order(&self) -> usize {
        self.order
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) const fn height(&self) -> usize {
        self.height
    }

    pub(crate) const fn root(&self) -> Handle {
        self.root
    }

    pub(crate) fn stats(&self) -> TreeStats {
        TreeStats {
            nodes_created: self.next_id,
            live_nodes: self.nodes.len(),
            splits: self.splits,
            height: self.height,
        }
    }

    /// Returns a node without reporting an access.
    pub(crate) fn node(&self, handle: Handle) -> &Node<K, V> {
        self.nodes.get(handle)
    }

    #[cfg(test)]
    pub(crate) fn node_mut(&mut self, handle: Handle) -> &mut Node<K, V> {
        self.nodes.get_mut(handle)
    }

    /// Stores a hand-built node without linking it anywhere.
    #[cfg(test)]
    pub(crate) fn alloc_detached(&mut self, node: Node<K, V>) -> Handle {
        self.nodes.store(node)
    }

    /// Reports an access to the node stored at `handle`.
    #[inline]
    pub(crate) fn count_access(&self, handle: Handle) {
        self.hooks.count_access(self.nodes.get(handle).id());
    }

    fn issue_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Stores a freshly built node. Creation counts as an access.
    fn alloc_node(&mut self, node: Node<K, V>) -> Handle {
        let id = node.id();
        let handle = self.nodes.store(node);
        self.hooks.count_access(id);
        handle
    }

    /// Takes a node out of the arena so it can be rebuilt.
    fn retire(&mut self, handle: Handle) -> Node<K, V> {
        let node = self.nodes.retire(handle);
        self.hooks.count_access(node.id());
        node
    }

    pub(crate) fn is_root(&self, handle: Handle) -> bool {
        self.parent(handle).is_none()
    }

    pub(crate) fn parent(&self, handle: Handle) -> Option<Handle> {
        self.count_access(handle);
        self.nodes.get(handle).parent()
    }

    /// Links a node that has never had a parent.
    ///
    /// # Panics
    ///
    /// Panics if the node is already attached.
    fn attach(&mut self, child: Handle, parent: Handle) {
        self.count_access(child);
        let node = self.nodes.get_mut(child);
        assert!(node.parent().is_none(), "node {} is already attached to a parent", node.id());
        node.set_parent(Some(parent));
    }

    /// Moves a child of the retired node `from` under its replacement `to`.
    ///
    /// # Panics
    ///
    /// Panics if `from` is not the child's current parent.
    fn rehome(&mut self, child: Handle, from: Handle, to: Handle) {
        self.count_access(child);
        let node = self.nodes.get_mut(child);
        assert_eq!(
            node.parent(),
            Some(from),
            "node {} re-homed away from a node that is not its parent",
            node.id()
        );
        node.set_parent(Some(to));
    }

    fn is_overflow(&self, handle: Handle) -> bool {
        self.count_access(handle);
        self.nodes.get(handle).is_overflow(self.order)
    }

    /// Pre-order depth-first traversal from `handle`, calling `f(level, node)` on every
    /// node and stopping at the first error.
    pub(crate) fn walk_until_error<E, F>(&self, handle: Handle, level: usize, f: &mut F) -> Result<(), E>
    where
        F: FnMut(usize, Handle) -> Result<(), E>,
    {
        self.count_access(handle);
        f(level, handle)?;
        if let Node::Inner(inner) = self.nodes.get(handle) {
            for &child in inner.children() {
                self.walk_until_error(child, level + 1, f)?;
            }
        }
        Ok(())
    }
}

impl<K: Ord + Clone, V> RawBTree<K, V> {
    /// Descends from `start` to the leaf whose key range holds `key`. The leaf is
    /// returned whether or not it contains the key.
    pub(crate) fn find_leaf_by_key<Q>(&self, start: Handle, key: &Q) -> Handle
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = start;
        loop {
            self.count_access(current);
            match self.nodes.get(current) {
                Node::Inner(inner) => current = inner.child(inner.route(key)),
                Node::Leaf(_) => return current,
            }
        }
    }

    /// Returns a reference to the value stored under `key`.
    pub(crate) fn find<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let leaf_handle = self.find_leaf_by_key(self.root, key);
        self.count_access(leaf_handle);
        let leaf = self.nodes.get(leaf_handle).as_leaf();
        match leaf.search(key) {
            SearchResult::Found(idx) => Some(leaf.value(idx)),
            SearchResult::NotFound(_) => None,
        }
    }

    /// Inserts a key-value pair, overwriting the value if the key is present, then splits
    /// every node the insertion pushed past `order`.
    pub(crate) fn insert(&mut self, key: K, value: V) {
        let leaf_handle = self.find_leaf_by_key(self.root, &key);
        self.count_access(leaf_handle);

        let leaf = self.nodes.get_mut(leaf_handle).as_leaf_mut();
        match leaf.search(&key) {
            SearchResult::Found(idx) => {
                leaf.replace_value(idx, value);
                return;
            }
            SearchResult::NotFound(idx) => leaf.insert(idx, key, value),
        }
        if self.strict {
            assert!(leaf.is_sorted(), "leaf keys out of order after insert");
        }
        self.len += 1;

        if self.is_overflow(leaf_handle) {
            let split = self.split_leaf(leaf_handle);
            if let Some(new_root) = self.replace(split) {
                self.root = new_root;
                self.height += 1;
                debug_log!(
                    height = self.height,
                    root = %self.nodes.get(new_root).id(),
                    "root split, tree grew a level"
                );
            }
        }

        if self.strict {
            self.assert_integrity();
        }
    }

    /// Retires an overflowing leaf and builds its two halves.
    fn split_leaf(&mut self, handle: Handle) -> Split<K> {
        let node = self.retire(handle);
        let parent = node.parent();
        trace_log!(retired = %node.id(), "splitting leaf");
        let Node::Leaf(leaf) = node else {
            panic!("expected leaf node");
        };

        let (left_id, right_id) = (self.issue_id(), self.issue_id());
        let (left, right, separator) = leaf.split_around_median(left_id, right_id);
        if self.strict {
            assert!(left.is_sorted() && right.is_sorted(), "split leaf halves out of order");
            assert!(
                left.keys().iter().all(|k| *k < separator) && right.keys().iter().all(|k| *k >= separator),
                "split leaf halves straddle the separator"
            );
        }

        let left = self.alloc_node(Node::Leaf(left));
        let right = self.alloc_node(Node::Leaf(right));
        Split {
            retired: handle,
            parent,
            left,
            right,
            separator,
        }
    }

    /// Retires an overflowing inner node, builds its two halves and moves its children
    /// under them.
    fn split_inner(&mut self, handle: Handle) -> Split<K> {
        let node = self.retire(handle);
        let parent = node.parent();
        trace_log!(retired = %node.id(), "splitting inner node");
        let Node::Inner(inner) = node else {
            panic!("expected inner node");
        };

        let (left_id, right_id) = (self.issue_id(), self.issue_id());
        let (left, right, separator) = inner.split_around_median(left_id, right_id);
        let left_children: Children = SmallVec::from_slice(left.children());
        let right_children: Children = SmallVec::from_slice(right.children());

        let left = self.alloc_node(Node::Inner(left));
        let right = self.alloc_node(Node::Inner(right));
        for child in left_children {
            self.rehome(child, handle, left);
        }
        for child in right_children {
            self.rehome(child, handle, right);
        }

        Split {
            retired: handle,
            parent,
            left,
            right,
            separator,
        }
    }

    /// Puts the halves of a split node where the node used to be, splitting ancestors as
    /// they overflow. Returns the new root if the split reached the top of the tree.
    fn replace(&mut self, split: Split<K>) -> Option<Handle> {
        let Split {
            retired,
            parent,
            left,
            right,
            separator,
        } = split;
        self.splits += 1;
        self.hooks.count_rebalance();

        let Some(parent) = parent else {
            let id = self.issue_id();
            let root = self.alloc_node(Node::Inner(InnerNode::new(id, smallvec![separator], smallvec![left, right])));
            self.attach(left, root);
            self.attach(right, root);
            return Some(root);
        };

        assert!(!self.is_overflow(parent), "parent overflowed before its child was spliced in");
        self.count_access(parent);
        let inner = self.nodes.get_mut(parent).as_inner_mut();
        let Some(index) = inner.position_of(retired) else {
            panic!("split node is missing from its parent's children");
        };
        inner.expand_at(index, left, right, separator);
        self.attach(left, parent);
        self.attach(right, parent);

        if !self.is_overflow(parent) {
            return None;
        }
        let split = self.split_inner(parent);
        self.replace(split)
    }

    fn assert_integrity(&self) {
        trace_log!(len = self.len, "strict integrity check");
        if let Err(err) = self.integrity_check() {
            panic!("B-tree invariant violated after insert: {err}");
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> RawBTree<K, V> {
    /// Writes an indented dump of the whole tree.
    pub(crate) fn print<W: io::Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        self.print_node(self.root, w, 0)
    }

    fn print_node<W: io::Write + ?Sized>(&self, handle: Handle, w: &mut W, indent: usize) -> io::Result<()> {
        self.count_access(handle);
        let spaces = " ".repeat(indent);
        match self.nodes.get(handle) {
            Node::Inner(inner) => {
                writeln!(w, "{spaces}--")?;
                for (&child, key) in inner.children().iter().zip(inner.keys()) {
                    self.print_node(child, w, indent + 1)?;
                    writeln!(w, "{spaces}{key:?}:")?;
                }
                if let Some(&last) = inner.children().last() {
                    self.print_node(last, w, indent + 1)?;
                }
                writeln!(w, "{spaces}--")
            }
            Node::Leaf(leaf) => {
                for (key, value) in leaf.pairs() {
                    writeln!(w, "{spaces}[{key:?}]:{value:?}")?;
                }
                Ok(())
            }
        }
    }
}
