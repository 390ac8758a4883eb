//! Storage engine for emberdb.
//!
//! This crate provides:
//! - Disk manager for page-level file I/O with a header page and free list
//! - Pager combining the disk manager with the buffer pool
//! - B-tree index, generic over key and value, plus a typed `Index`

mod btree;
mod disk;
mod pager;

pub use btree::{BTree, Index, IndexIter, Iter, Leaves, NodeId, Pair};
pub use disk::DiskManager;
pub use pager::Pager;
