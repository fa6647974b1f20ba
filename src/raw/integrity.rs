use std::cell::Cell;
use std::collections::HashMap;

use super::handle::Handle;
use super::node::Node;
use super::raw_btree::RawBTree;
use crate::error::{IntegrityError, Result};

/// Lowest and highest key reachable under a node, `None` for an empty subtree.
type KeyBounds<K> = HashMap<Handle, Option<(K, K)>>;

type Check<'a> = &'a dyn Fn(usize, Handle) -> Result<()>;

/// Runs every check against a node, stopping at the first failure.
fn chain<'a>(checks: &'a [Check<'a>]) -> impl FnMut(usize, Handle) -> Result<()> + 'a {
    move |level, node| checks.iter().try_for_each(|check| check(level, node))
}

impl<K: Ord + Clone, V> RawBTree<K, V> {
    /// Walks the whole tree and reports the first structural invariant that does not hold.
    pub(crate) fn integrity_check(&self) -> Result<()> {
        let mut bounds = KeyBounds::new();
        self.collect_key_bounds(self.root(), &mut bounds);
        let leaf_level = Cell::new(None);

        let checks: [Check<'_>; 7] = [
            &|level, node| self.check_leaf_size(level, node),
            &|level, node| self.check_leaf_keys(level, node),
            &|level, node| self.check_inner_shape(level, node),
            &|level, node| self.check_parent_presence(level, node),
            &|level, node| self.check_back_references(level, node),
            &|level, node| self.check_key_ranges(level, node, &bounds),
            &|level, node| self.check_leaf_depth(level, node, &leaf_level),
        ];
        self.walk_until_error(self.root(), 0, &mut chain(&checks))
    }

    fn check_leaf_size(&self, level: usize, handle: Handle) -> Result<()> {
        let Node::Leaf(leaf) = self.node(handle) else {
            return Ok(());
        };
        if leaf.key_count() > self.order() {
            return Err(IntegrityError::LeafOverflow {
                node: self.node(handle).id(),
                level,
                len: leaf.key_count(),
                order: self.order(),
            });
        }
        Ok(())
    }

    fn check_leaf_keys(&self, level: usize, handle: Handle) -> Result<()> {
        let Node::Leaf(leaf) = self.node(handle) else {
            return Ok(());
        };
        match leaf.keys().windows(2).position(|w| w[0] >= w[1]) {
            Some(i) => Err(IntegrityError::LeafKeysUnordered {
                node: self.node(handle).id(),
                level,
                index: i + 1,
            }),
            None => Ok(()),
        }
    }

    fn check_inner_shape(&self, level: usize, handle: Handle) -> Result<()> {
        let Node::Inner(inner) = self.node(handle) else {
            return Ok(());
        };
        let node = self.node(handle).id();
        if inner.child_count() != inner.key_count() + 1 {
            return Err(IntegrityError::ChildCountMismatch {
                node,
                level,
                children: inner.child_count(),
                keys: inner.key_count(),
            });
        }
        if inner.child_count() > self.order() {
            return Err(IntegrityError::InnerOverflow {
                node,
                level,
                children: inner.child_count(),
                order: self.order(),
            });
        }
        match inner.keys().windows(2).position(|w| w[0] >= w[1]) {
            Some(i) => Err(IntegrityError::SeparatorsUnordered { node, level, index: i + 1 }),
            None => Ok(()),
        }
    }

    fn check_parent_presence(&self, level: usize, handle: Handle) -> Result<()> {
        let node = self.node(handle).id();
        match (level == 0, self.is_root(handle)) {
            (true, false) => Err(IntegrityError::RootHasParent { node }),
            (false, true) => Err(IntegrityError::MissingParent { node, level }),
            _ => Ok(()),
        }
    }

    fn check_back_references(&self, level: usize, handle: Handle) -> Result<()> {
        let Node::Inner(inner) = self.node(handle) else {
            return Ok(());
        };
        match inner.children().iter().position(|&child| self.parent(child) != Some(handle)) {
            Some(child) => Err(IntegrityError::WrongParent {
                node: self.node(handle).id(),
                level,
                child,
            }),
            None => Ok(()),
        }
    }

    // Child `i` must hold only keys in `[keys[i - 1], keys[i])`; ties go right, as in descent.
    fn check_key_ranges(&self, level: usize, handle: Handle, bounds: &KeyBounds<K>) -> Result<()> {
        let Node::Inner(inner) = self.node(handle) else {
            return Ok(());
        };
        let node = self.node(handle).id();
        let keys = inner.keys();

        for (i, child) in inner.children().iter().enumerate() {
            let Some((lo, hi)) = bounds.get(child).and_then(Option::as_ref) else {
                return Err(IntegrityError::EmptyChild { node, level, child: i });
            };
            if i > 0 && *lo < keys[i - 1] {
                return Err(IntegrityError::KeyBelowRange { node, level, child: i });
            }
            if i < keys.len() && *hi >= keys[i] {
                return Err(IntegrityError::KeyAboveRange { node, level, child: i });
            }
        }
        Ok(())
    }

    fn check_leaf_depth(&self, level: usize, handle: Handle, leaf_level: &Cell<Option<usize>>) -> Result<()> {
        if !self.node(handle).is_leaf() {
            return Ok(());
        }
        match leaf_level.get() {
            None => {
                leaf_level.set(Some(level));
                Ok(())
            }
            Some(expected) if expected != level => Err(IntegrityError::UnevenLeafDepth {
                node: self.node(handle).id(),
                level,
                expected,
            }),
            Some(_) => Ok(()),
        }
    }

    /// Records the key bounds of every subtree under `handle`, bottom-up.
    fn collect_key_bounds(&self, handle: Handle, bounds: &mut KeyBounds<K>) -> Option<(K, K)> {
        self.count_access(handle);
        let span = match self.node(handle) {
            Node::Leaf(leaf) => leaf
                .keys()
                .iter()
                .min()
                .zip(leaf.keys().iter().max())
                .map(|(lo, hi)| (lo.clone(), hi.clone())),
            Node::Inner(inner) => inner
                .children()
                .iter()
                .map(|&child| self.collect_key_bounds(child, bounds))
                .fold(None, widen),
        };
        bounds.insert(handle, span.clone());
        span
    }
}

fn widen<K: Ord>(acc: Option<(K, K)>, next: Option<(K, K)>) -> Option<(K, K)> {
    match (acc, next) {
        (Some((lo, hi)), Some((next_lo, next_hi))) => Some((lo.min(next_lo), hi.max(next_hi))),
        (span, None) | (None, span) => span,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::TreeConfig;
    use crate::instrument::NodeId;
    use crate::raw::node::InnerNode;
    use pretty_assertions::assert_eq;
    use smallvec::smallvec;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn tree_with(order: usize, keys: &[i32]) -> RawBTree<i32, i32> {
        let mut t = RawBTree::new(TreeConfig::new(order));
        for &k in keys {
            t.insert(k, k);
        }
        t
    }

    fn children(t: &RawBTree<i32, i32>, handle: Handle) -> Vec<Handle> {
        match t.node(handle) {
            Node::Inner(inner) => inner.children().to_vec(),
            Node::Leaf(_) => Vec::new(),
        }
    }

    #[test]
    fn healthy_tree_passes() {
        let t = tree_with(2, &[50, 10, 40, 20, 30]);
        assert_eq!(t.integrity_check(), Ok(()));
    }

    #[test]
    fn oversized_leaf_is_reported() {
        let mut t = tree_with(3, &[1, 2, 3]);
        let root = t.root();
        t.node_mut(root).as_leaf_mut().keys_mut().push(4);
        assert_eq!(
            t.integrity_check(),
            Err(IntegrityError::LeafOverflow { node: NodeId::new(0), level: 0, len: 4, order: 3 })
        );
    }

    #[test]
    fn duplicate_leaf_key_is_reported() {
        let mut t = tree_with(3, &[1, 2]);
        let root = t.root();
        t.node_mut(root).as_leaf_mut().keys_mut()[1] = 1;
        assert_eq!(
            t.integrity_check(),
            Err(IntegrityError::LeafKeysUnordered { node: NodeId::new(0), level: 0, index: 1 })
        );
    }

    #[test]
    fn missing_separator_is_reported() {
        let mut t = tree_with(2, &[10, 20, 30]);
        let root = t.root();
        let id = t.node(root).id();
        t.node_mut(root).as_inner_mut().keys_mut().clear();
        assert_eq!(
            t.integrity_check(),
            Err(IntegrityError::ChildCountMismatch { node: id, level: 0, children: 2, keys: 0 })
        );
    }

    #[test]
    fn oversized_inner_node_is_reported() {
        let mut t = tree_with(2, &[10, 20, 30]);
        let root = t.root();
        let id = t.node(root).id();
        let right = children(&t, root)[1];
        let inner = t.node_mut(root).as_inner_mut();
        inner.keys_mut().push(40);
        inner.children_mut().push(right);
        assert_eq!(
            t.integrity_check(),
            Err(IntegrityError::InnerOverflow { node: id, level: 0, children: 3, order: 2 })
        );
    }

    #[test]
    fn key_bounds_pass_reports_every_node_once() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let config = TreeConfig::new(3).with_access_counter({
            let seen = Rc::clone(&seen);
            move |id| seen.borrow_mut().push(id)
        });
        let mut t: RawBTree<i32, i32> = RawBTree::new(config);
        for k in 0..40 {
            t.insert(k, k);
        }

        RefCell::borrow_mut(&seen).clear();
        let mut bounds = KeyBounds::new();
        assert_eq!(t.collect_key_bounds(t.root(), &mut bounds), Some((0, 39)));

        let mut reported = RefCell::borrow(&seen).clone();
        reported.sort();
        let mut live: Vec<NodeId> = bounds.keys().map(|&handle| t.node(handle).id()).collect();
        live.sort();
        assert_eq!(reported.len(), t.stats().live_nodes);
        assert_eq!(reported, live);
    }

    #[test]
    fn separator_out_of_range_is_reported() {
        let mut t = tree_with(2, &[10, 20, 30]);
        let root = t.root();
        let id = t.node(root).id();
        t.node_mut(root).as_inner_mut().keys_mut()[0] = 5;
        assert_eq!(
            t.integrity_check(),
            Err(IntegrityError::KeyAboveRange { node: id, level: 0, child: 0 })
        );

        t.node_mut(root).as_inner_mut().keys_mut()[0] = 25;
        assert_eq!(
            t.integrity_check(),
            Err(IntegrityError::KeyBelowRange { node: id, level: 0, child: 1 })
        );

        // A separator equal to the right child's smallest key is legal: ties route right.
        t.node_mut(root).as_inner_mut().keys_mut()[0] = 20;
        assert_eq!(t.integrity_check(), Ok(()));

        t.node_mut(root).as_inner_mut().keys_mut()[0] = 11;
        assert_eq!(t.integrity_check(), Ok(()));
    }

    #[test]
    fn key_left_of_its_range_is_reported() {
        let mut t = tree_with(2, &[10, 20, 30]);
        let root = t.root();
        let id = t.node(root).id();
        let right = children(&t, root)[1];
        t.node_mut(right).as_leaf_mut().keys_mut()[0] = 15;
        assert_eq!(
            t.integrity_check(),
            Err(IntegrityError::KeyBelowRange { node: id, level: 0, child: 1 })
        );
    }

    #[test]
    fn broken_back_reference_is_reported() {
        let mut t = tree_with(2, &[10, 20, 30]);
        let root = t.root();
        let id = t.node(root).id();
        let right = children(&t, root)[1];
        t.node_mut(right).set_parent(Some(right));
        assert_eq!(
            t.integrity_check(),
            Err(IntegrityError::WrongParent { node: id, level: 0, child: 1 })
        );
    }

    #[test]
    fn orphaned_child_is_reported() {
        let mut t = tree_with(2, &[10, 20, 30]);
        let root = t.root();
        let id = t.node(root).id();
        let left = children(&t, root)[0];
        t.node_mut(left).set_parent(None);
        // The parent notices before the orphan is visited.
        assert_eq!(
            t.integrity_check(),
            Err(IntegrityError::WrongParent { node: id, level: 0, child: 0 })
        );
    }

    #[test]
    fn root_with_parent_is_reported() {
        let mut t = tree_with(2, &[10, 20, 30]);
        let root = t.root();
        let id = t.node(root).id();
        let left = children(&t, root)[0];
        t.node_mut(root).set_parent(Some(left));
        assert_eq!(t.integrity_check(), Err(IntegrityError::RootHasParent { node: id }));
    }

    #[test]
    fn uneven_leaf_depth_is_reported() {
        let mut t = tree_with(2, &[10, 20, 30]);
        let root = t.root();
        let right = children(&t, root)[1];
        let right_id = t.node(right).id();

        // Push the right leaf one level down behind a separator-less inner node.
        let id = NodeId::new(t.stats().nodes_created);
        let mut stub = Node::Inner(InnerNode::<i32>::new(id, smallvec![], smallvec![right]));
        stub.set_parent(Some(root));
        let stub = t.alloc_detached(stub);
        t.node_mut(right).set_parent(Some(stub));
        t.node_mut(root).as_inner_mut().children_mut()[1] = stub;

        assert_eq!(
            t.integrity_check(),
            Err(IntegrityError::UnevenLeafDepth { node: right_id, level: 2, expected: 1 })
        );
    }

    #[test]
    fn widen_merges_spans() {
        assert_eq!(widen(Some((3, 5)), Some((1, 4))), Some((1, 5)));
        assert_eq!(widen(None, Some((1, 4))), Some((1, 4)));
        assert_eq!(widen(Some((3, 5)), None), Some((3, 5)));
        assert_eq!(widen::<i32>(None, None), None);
    }
}
