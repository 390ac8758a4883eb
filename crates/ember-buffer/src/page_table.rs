//! Page table mapping cached page IDs to buffer frames.

use crate::frame::FrameId;
use ember_common::page::PageId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Maps each resident page to the frame that holds it.
#[derive(Debug, Default)]
pub struct PageTable {
    map: RwLock<HashMap<PageId, FrameId>>,
}

impl PageTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            map: RwLock::new(HashMap::with_capacity(capacity)),
        }
    }

    #[inline]
    pub fn get(&self, page_id: PageId) -> Option<FrameId> {
        self.map.read().get(&page_id).copied()
    }

    /// Inserts a mapping, returning the frame previously mapped to the page.
    pub fn insert(&self, page_id: PageId, frame_id: FrameId) -> Option<FrameId> {
        self.map.write().insert(page_id, frame_id)
    }

    pub fn remove(&self, page_id: PageId) -> Option<FrameId> {
        self.map.write().remove(&page_id)
    }

    pub fn contains(&self, page_id: PageId) -> bool {
        self.map.read().contains_key(&page_id)
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    /// Returns every mapping, sorted by page ID.
    pub fn entries(&self) -> Vec<(PageId, FrameId)> {
        let mut entries: Vec<_> = self.map.read().iter().map(|(p, f)| (*p, *f)).collect();
        entries.sort_unstable_by_key(|(page_id, _)| *page_id);
        entries
    }
}
