//! Buffer pool manager.

use crate::frame::{BufferFrame, FrameId};
use crate::page_table::PageTable;
use crate::replacer::{ClockReplacer, Replacer};
use ember_common::config::StorageConfig;
use ember_common::page::{PageId, PAGE_SIZE};
use ember_common::{EmberError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// A dirty page that was evicted from the buffer pool.
/// Caller must write this to disk to prevent data loss.
#[derive(Debug)]
pub struct EvictedPage {
    pub page_id: PageId,
    pub data: Box<[u8; PAGE_SIZE]>,
}

/// Buffer pool manager.
///
/// Manages a fixed-size pool of page frames with:
/// - Page ID to frame ID mapping
/// - Free frame list for new pages
/// - Clock replacement over unpinned frames
/// - Pin counting so a frame in use is never chosen as a victim
pub struct BufferPool {
    frames: Vec<BufferFrame>,
    page_table: PageTable,
    free_list: Mutex<Vec<FrameId>>,
    replacer: ClockReplacer,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl BufferPool {
    /// Creates a buffer pool with `num_frames` frames.
    pub fn new(num_frames: usize) -> Self {
        let frames: Vec<_> = (0..num_frames)
            .map(|i| BufferFrame::new(FrameId(i as u32)))
            .collect();

        // Reversed so frame 0 is handed out first
        let free_list: Vec<_> = (0..num_frames).rev().map(|i| FrameId(i as u32)).collect();

        Self {
            frames,
            page_table: PageTable::new(num_frames),
            free_list: Mutex::new(free_list),
            replacer: ClockReplacer::new(num_frames),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Creates a buffer pool sized by `StorageConfig::cache_pages`.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.cache_pages))
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn free_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Returns the number of pages currently in the pool.
    pub fn page_count(&self) -> usize {
        self.page_table.len()
    }

    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_table.contains(page_id)
    }

    #[inline]
    fn frame(&self, frame_id: FrameId) -> &BufferFrame {
        &self.frames[frame_id.index()]
    }

    fn pin_frame(&self, frame: &BufferFrame) {
        if frame.pin() == 0 {
            self.replacer.set_evictable(frame.frame_id(), false);
        }
        self.replacer.record_access(frame.frame_id());
    }

    /// Fetches a resident page and pins it.
    ///
    /// Returns None (and counts a miss) if the page is not cached.
    pub fn fetch_page(&self, page_id: PageId) -> Option<&BufferFrame> {
        let Some(frame_id) = self.page_table.get(page_id) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        self.hits.fetch_add(1, Ordering::Relaxed);
        let frame = self.frame(frame_id);
        self.pin_frame(frame);
        Some(frame)
    }

    /// Takes a frame from the free list, or evicts one.
    fn allocate_frame(&self) -> Result<(FrameId, Option<EvictedPage>)> {
        if let Some(frame_id) = self.free_list.lock().pop() {
            return Ok((frame_id, None));
        }

        let victim_id = self.replacer.evict().ok_or(EmberError::BufferPoolFull)?;
        let frame = self.frame(victim_id);

        let evicted = match frame.page_id() {
            Some(page_id) if frame.is_dirty() => Some(EvictedPage {
                page_id,
                data: frame.snapshot(),
            }),
            _ => None,
        };

        if let Some(old_page_id) = frame.page_id() {
            self.page_table.remove(old_page_id);
            debug!(
                page_id = %old_page_id,
                frame = %victim_id,
                dirty = evicted.is_some(),
                "evicted page from buffer pool"
            );
        }
        self.evictions.fetch_add(1, Ordering::Relaxed);

        Ok((victim_id, evicted))
    }

    /// Places a zeroed page in the pool and pins it.
    ///
    /// If the page is already resident, the existing frame is pinned and
    /// returned unchanged. The evicted page, if any, must be written back
    /// by the caller.
    pub fn new_page(&self, page_id: PageId) -> Result<(&BufferFrame, Option<EvictedPage>)> {
        if let Some(frame_id) = self.page_table.get(page_id) {
            let frame = self.frame(frame_id);
            self.pin_frame(frame);
            return Ok((frame, None));
        }

        let (frame_id, evicted) = self.allocate_frame()?;
        let frame = self.frame(frame_id);
        frame.assign(page_id);
        self.pin_frame(frame);
        self.page_table.insert(page_id, frame_id);

        Ok((frame, evicted))
    }

    /// Loads a page image read from disk into the pool, pinned.
    pub fn load_page(
        &self,
        page_id: PageId,
        data: &[u8],
    ) -> Result<(&BufferFrame, Option<EvictedPage>)> {
        let (frame, evicted) = self.new_page(page_id)?;
        frame.copy_from(data);
        Ok((frame, evicted))
    }

    /// Unpins a page. When the pin count reaches zero the frame becomes
    /// eligible for eviction.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let Some(frame_id) = self.page_table.get(page_id) else {
            return false;
        };
        let frame = self.frame(frame_id);
        if is_dirty {
            frame.set_dirty(true);
        }
        if frame.unpin() == 0 {
            self.replacer.set_evictable(frame_id, true);
        }
        true
    }

    /// Hands a dirty page to `flush_fn` and marks it clean.
    ///
    /// Returns true if the page was flushed.
    pub fn flush_page<F>(&self, page_id: PageId, mut flush_fn: F) -> Result<bool>
    where
        F: FnMut(PageId, &[u8]) -> Result<()>,
    {
        let Some(frame_id) = self.page_table.get(page_id) else {
            return Ok(false);
        };
        let frame = self.frame(frame_id);
        if !frame.is_dirty() {
            return Ok(false);
        }
        flush_fn(page_id, &**frame.read_data())?;
        frame.set_dirty(false);
        Ok(true)
    }

    /// Flushes all dirty pages in page order.
    ///
    /// Returns the number of pages flushed. Stops at the first error.
    pub fn flush_all<F>(&self, mut flush_fn: F) -> Result<usize>
    where
        F: FnMut(PageId, &[u8]) -> Result<()>,
    {
        let mut flushed = 0;
        for (page_id, frame_id) in self.page_table.entries() {
            let frame = self.frame(frame_id);
            if frame.is_dirty() {
                flush_fn(page_id, &**frame.read_data())?;
                frame.set_dirty(false);
                flushed += 1;
            }
        }
        Ok(flushed)
    }

    /// Drops a page from the pool without writing it back.
    ///
    /// Returns false if the page is pinned or not resident.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let Some(frame_id) = self.page_table.get(page_id) else {
            return false;
        };
        let frame = self.frame(frame_id);
        if frame.is_pinned() {
            return false;
        }

        self.page_table.remove(page_id);
        self.replacer.remove(frame_id);
        frame.reset();
        self.free_list.lock().push(frame_id);
        true
    }

    /// Returns a read guard for a resident page.
    pub fn read_page(&self, page_id: PageId) -> Option<PageReadGuard<'_>> {
        let frame = self.fetch_page(page_id)?;
        Some(PageReadGuard {
            pool: self,
            page_id,
            frame,
        })
    }

    /// Returns a write guard for a resident page.
    pub fn write_page(&self, page_id: PageId) -> Option<PageWriteGuard<'_>> {
        let frame = self.fetch_page(page_id)?;
        Some(PageWriteGuard {
            pool: self,
            page_id,
            frame,
        })
    }

    pub fn stats(&self) -> BufferPoolStats {
        let mut pinned_frames = 0;
        let mut dirty_frames = 0;
        for (_, frame_id) in self.page_table.entries() {
            let frame = self.frame(frame_id);
            if frame.is_pinned() {
                pinned_frames += 1;
            }
            if frame.is_dirty() {
                dirty_frames += 1;
            }
        }

        BufferPoolStats {
            total_frames: self.frames.len(),
            free_frames: self.free_count(),
            used_frames: self.page_table.len(),
            pinned_frames,
            dirty_frames,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Statistics about the buffer pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferPoolStats {
    pub total_frames: usize,
    pub free_frames: usize,
    /// Number of frames holding a page.
    pub used_frames: usize,
    pub pinned_frames: usize,
    pub dirty_frames: usize,
    /// Lookups served from a resident frame.
    pub hits: u64,
    /// Lookups for pages that were not resident.
    pub misses: u64,
    pub evictions: u64,
}

impl BufferPoolStats {
    /// Fraction of lookups served from cache, 0.0 when nothing was looked up.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// RAII guard for reading a page. Unpins on drop.
pub struct PageReadGuard<'a> {
    pool: &'a BufferPool,
    page_id: PageId,
    frame: &'a BufferFrame,
}

impl PageReadGuard<'_> {
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> parking_lot::RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.frame.read_data()
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        self.pool.unpin_page(self.page_id, false);
    }
}

/// RAII guard for writing a page. Unpins on drop, keeping the dirty flag.
pub struct PageWriteGuard<'a> {
    pool: &'a BufferPool,
    page_id: PageId,
    frame: &'a BufferFrame,
}

impl PageWriteGuard<'_> {
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data_mut(&self) -> parking_lot::RwLockWriteGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.frame.write_data()
    }

    pub fn set_dirty(&self) {
        self.frame.set_dirty(true);
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        self.pool.unpin_page(self.page_id, self.frame.is_dirty());
    }
}
