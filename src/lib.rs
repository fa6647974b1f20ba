//! An instrumented B-tree for studying how insertion order shapes a tree.
//!
//! This crate provides [`BTree`], an in-memory ordered map of configurable order whose
//! node-level operations can be observed from outside:
//!
//! - an **access counter** receives the [`NodeId`] of every node an operation touches,
//!   which is enough to rebuild per-node reuse distances and cache-locality histograms;
//! - a **rebalance counter** fires once per split, measuring restructuring work.
//!
//! Feeding the same keys in ascending, shuffled or random order and comparing what the
//! hooks saw is the intended use.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use locality_btree::{BTree, TreeConfig};
//!
//! let splits = Rc::new(Cell::new(0u64));
//! let config = TreeConfig::new(3).with_rebalance_counter({
//!     let splits = Rc::clone(&splits);
//!     move || splits.set(splits.get() + 1)
//! });
//!
//! let mut tree = BTree::with_config(config);
//! for k in 0..1_000 {
//!     tree.insert(k, k * 2);
//! }
//!
//! assert_eq!(tree.find(&500), Some(&1_000));
//! assert!(tree.integrity_check().is_ok());
//! assert_eq!(splits.get(), tree.stats().splits);
//! ```
//!
//! # Implementation
//!
//! Nodes live in an arena owned by the tree and refer to each other by slot handle; each
//! node also keeps a handle to its parent. A split never edits the overflowing node: it is
//! taken out of the arena, rebuilt as two fresh nodes around its median key, and the
//! separator is spliced into the parent, which may overflow and split in turn.
//!
//! # Features
//!
//! - **`tracing`** - emit split and root-growth events through the `tracing` crate.

// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod btree;
mod raw;
mod stats;
mod tracing_helpers;

pub mod config;
pub mod error;
pub mod instrument;

pub use btree::BTree;
pub use config::{DEFAULT_ORDER, MIN_ORDER, TreeConfig};
pub use error::IntegrityError;
pub use instrument::{AccessCounter, NodeId, RebalanceCounter};
pub use stats::TreeStats;
