mod arena;
mod handle;
mod integrity;
mod node;
mod raw_btree;

pub(crate) use raw_btree::RawBTree;
