//! Page constants and identifiers for emberdb storage.

use serde::{Deserialize, Serialize};

/// Page size in bytes (4 KB).
pub const PAGE_SIZE: usize = 4096;

/// Page number within the database file.
///
/// Page 0 is the file header; data pages start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageId(pub u32);

impl PageId {
    /// The file header page.
    pub const HEADER: PageId = PageId(0);

    /// Sentinel used on disk for "no page" (end of the free list).
    pub const INVALID: PageId = PageId(u32::MAX);

    pub fn new(page_num: u32) -> Self {
        Self(page_num)
    }

    pub fn page_num(&self) -> u32 {
        self.0
    }

    /// Byte offset of this page within the database file.
    pub fn file_offset(&self) -> u64 {
        self.0 as u64 * PAGE_SIZE as u64
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
