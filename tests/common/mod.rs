//! Shared test helpers: log setup and key sequence generation.
//!
//! Set `RUST_LOG` (e.g. `locality_btree=trace`) and build with `--features tracing` to see
//! split events from the tree while a test runs.

#![allow(dead_code)]

use std::sync::Once;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

/// Ensures tracing is only initialized once across all tests.
static INIT: Once = Once::new();

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, writing through the test harness.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// How a key sequence is ordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sequence {
    /// `0, 1, .., n - 1`.
    Range,
    /// `0..n` in a seeded random permutation.
    ShuffledRange,
    /// `n` seeded random draws; duplicates are possible.
    Random,
}

impl Sequence {
    pub const ALL: [Sequence; 3] = [Sequence::Range, Sequence::ShuffledRange, Sequence::Random];

    pub fn keys(self, n: usize, seed: u64) -> Vec<i64> {
        let mut rng = StdRng::seed_from_u64(seed);
        match self {
            Sequence::Range => (0..n as i64).collect(),
            Sequence::ShuffledRange => {
                let mut keys: Vec<i64> = (0..n as i64).collect();
                keys.shuffle(&mut rng);
                keys
            }
            Sequence::Random => (0..n).map(|_| rng.gen_range(0..i64::MAX)).collect(),
        }
    }
}

/// Renders a tree dump to a string.
pub fn dump<K: std::fmt::Debug, V: std::fmt::Debug>(tree: &locality_btree::BTree<K, V>) -> String {
    let mut out = Vec::new();
    tree.print(&mut out).expect("writing to a Vec cannot fail");
    String::from_utf8(out).expect("dump is UTF-8")
}

/// Leaves as seen in a dump: `(depth, entries)` per leaf, left to right.
///
/// Leaf lines start with `[` after one space per level; two leaves are always separated
/// by a separator or `--` line of their parent.
pub fn leaves_in_dump(dump: &str) -> Vec<(usize, usize)> {
    let mut leaves = Vec::new();
    let mut current: Option<(usize, usize)> = None;
    for line in dump.lines() {
        let trimmed = line.trim_start_matches(' ');
        let depth = line.len() - trimmed.len();
        if trimmed.starts_with('[') {
            current = match current {
                Some((d, entries)) if d == depth => Some((d, entries + 1)),
                _ => Some((depth, 1)),
            };
        } else if let Some(leaf) = current.take() {
            leaves.push(leaf);
        }
    }
    leaves.extend(current);
    leaves
}
