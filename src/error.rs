//! Errors reported by [`BTree::integrity_check`](crate::BTree::integrity_check).

use thiserror::Error;

use crate::instrument::NodeId;

/// `Result` alias for integrity checks.
pub type Result<T> = core::result::Result<T, IntegrityError>;

/// The first structural invariant found violated.
///
/// `level` is the node's depth, the root being level 0. For errors about a child of an
/// inner node, `node` is the inner node and `child` the child's index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("leaf {node} at level {level} holds {len} entries, more than order {order}")]
    LeafOverflow { node: NodeId, level: usize, len: usize, order: usize },

    #[error("leaf {node} at level {level} keys not strictly ascending at index {index}")]
    LeafKeysUnordered { node: NodeId, level: usize, index: usize },

    #[error("inner node {node} at level {level} has {children} children for {keys} separators")]
    ChildCountMismatch { node: NodeId, level: usize, children: usize, keys: usize },

    #[error("inner node {node} at level {level} has {children} children, more than order {order}")]
    InnerOverflow { node: NodeId, level: usize, children: usize, order: usize },

    #[error("inner node {node} at level {level} separators not strictly ascending at index {index}")]
    SeparatorsUnordered { node: NodeId, level: usize, index: usize },

    #[error("root {node} has a parent")]
    RootHasParent { node: NodeId },

    #[error("non-root node {node} at level {level} has no parent")]
    MissingParent { node: NodeId, level: usize },

    #[error("child {child} of inner node {node} at level {level} does not point back to it")]
    WrongParent { node: NodeId, level: usize, child: usize },

    #[error("child {child} of inner node {node} at level {level} has no keys")]
    EmptyChild { node: NodeId, level: usize, child: usize },

    #[error("child {child} of inner node {node} at level {level} holds a key below separator {}", .child - 1)]
    KeyBelowRange { node: NodeId, level: usize, child: usize },

    #[error("child {child} of inner node {node} at level {level} holds a key not below separator {child}")]
    KeyAboveRange { node: NodeId, level: usize, child: usize },

    #[error("leaf {node} at level {level}, expected every leaf at level {expected}")]
    UnevenLeafDepth { node: NodeId, level: usize, expected: usize },
}
