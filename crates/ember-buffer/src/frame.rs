//! Buffer frames: one cached page image plus its bookkeeping.

use ember_common::page::{PageId, PAGE_SIZE};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicU32, Ordering};

const NO_PAGE: u32 = u32::MAX;

/// High bit of the state word. The low 31 bits are the pin count.
const DIRTY_BIT: u32 = 1 << 31;
const PIN_MASK: u32 = DIRTY_BIT - 1;

/// Slot number of a frame within the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u32);

impl FrameId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame:{}", self.0)
    }
}

/// One slot of the buffer pool.
///
/// Pin count and dirty flag share a single atomic word so a frame can be
/// inspected without taking the data lock. The clock reference bit is
/// owned by the replacer.
pub struct BufferFrame {
    frame_id: FrameId,
    page_id: AtomicU32,
    state: AtomicU32,
    data: RwLock<Box<[u8; PAGE_SIZE]>>,
}

impl BufferFrame {
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            page_id: AtomicU32::new(NO_PAGE),
            state: AtomicU32::new(0),
            data: RwLock::new(Box::new([0u8; PAGE_SIZE])),
        }
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// The page cached here, None while the frame is free.
    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        match self.page_id.load(Ordering::Acquire) {
            NO_PAGE => None,
            num => Some(PageId(num)),
        }
    }

    /// Clears the frame and binds it to `page_id`: zeroed, clean, unpinned.
    pub fn assign(&self, page_id: PageId) {
        self.reset();
        self.page_id.store(page_id.0, Ordering::Release);
    }

    /// Returns the frame to the free state.
    pub fn reset(&self) {
        self.data.write().fill(0);
        self.state.store(0, Ordering::Release);
        self.page_id.store(NO_PAGE, Ordering::Release);
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.state.load(Ordering::Acquire) & PIN_MASK
    }

    /// Adds a pin. Returns the pin count before the call.
    #[inline]
    pub fn pin(&self) -> u32 {
        self.state.fetch_add(1, Ordering::AcqRel) & PIN_MASK
    }

    /// Drops a pin and returns the remaining count. Saturates at zero.
    pub fn unpin(&self) -> u32 {
        let released = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                (state & PIN_MASK != 0).then(|| state - 1)
            });
        match released {
            Ok(prev) => (prev & PIN_MASK) - 1,
            Err(_) => 0,
        }
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.state.load(Ordering::Acquire) & DIRTY_BIT != 0
    }

    pub fn set_dirty(&self, dirty: bool) {
        if dirty {
            self.state.fetch_or(DIRTY_BIT, Ordering::AcqRel);
        } else {
            self.state.fetch_and(PIN_MASK, Ordering::AcqRel);
        }
    }

    #[inline]
    pub fn read_data(&self) -> RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.data.read()
    }

    #[inline]
    pub fn write_data(&self) -> RwLockWriteGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.data.write()
    }

    /// Overwrites the page image with `src`, zero filling the rest.
    pub fn copy_from(&self, src: &[u8]) {
        let len = src.len().min(PAGE_SIZE);
        let mut data = self.data.write();
        data[..len].copy_from_slice(&src[..len]);
        data[len..].fill(0);
    }

    /// Owned copy of the page image.
    pub fn snapshot(&self) -> Box<[u8; PAGE_SIZE]> {
        Box::new(**self.data.read())
    }
}

impl std::fmt::Debug for BufferFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferFrame")
            .field("frame_id", &self.frame_id)
            .field("page_id", &self.page_id())
            .field("pin_count", &self.pin_count())
            .field("is_dirty", &self.is_dirty())
            .finish()
    }
}
