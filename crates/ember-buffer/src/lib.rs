//! Buffer pool management for emberdb.
//!
//! This crate provides in-memory page caching with:
//! - Fixed-size buffer pool with configurable page count
//! - Clock eviction policy for cache management
//! - Pin counting so in-use pages are never evicted
//! - Dirty page tracking for write-back

mod frame;
mod page_table;
mod pool;
mod replacer;

pub use frame::{BufferFrame, FrameId};
pub use page_table::PageTable;
pub use pool::{BufferPool, BufferPoolStats, EvictedPage, PageReadGuard, PageWriteGuard};
pub use replacer::{ClockReplacer, Replacer};
