//! B-tree index.
//!
//! A classic B-tree: every node holds key/value pairs, internal nodes also
//! hold child links, and leaves are chained left to right.
//!
//! ```text
//!                 [10 | 20]
//!               /     |     \
//!       [5 6 7] -> [12 17] -> [30]
//! ```
//!
//! Nodes live in a slot arena and refer to each other by `NodeId`, the
//! in-memory counterpart of a page number. Inserts split full nodes on
//! the way down; removals top up thin nodes on the way down, borrowing
//! from a sibling through the parent or merging two siblings around their
//! separator.
//!
//! `BTree<K, V>` is the generic core. `Index` wraps an integer- or
//! string-keyed tree behind the tagged `Key` type.

mod arena;
mod check;
mod delete;
mod index;
mod iter;
mod node;
mod tree;

pub use arena::NodeId;
pub use index::{Index, IndexIter};
pub use iter::{Iter, Leaves};
pub use node::Pair;
pub use tree::BTree;
