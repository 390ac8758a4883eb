//! Victim selection for the buffer pool.

use crate::frame::FrameId;
use parking_lot::Mutex;

/// Chooses which unpinned frame gives up its page when the pool is full.
pub trait Replacer: Send + Sync {
    /// Notes a use of the frame.
    fn record_access(&self, frame_id: FrameId);

    /// Pinned frames are never evictable; the pool flips this as the pin
    /// count leaves or reaches zero.
    fn set_evictable(&self, frame_id: FrameId, evictable: bool);

    /// Picks a victim and stops tracking it. None if every frame is pinned.
    fn evict(&self) -> Option<FrameId>;

    /// Stops tracking a frame whose page was dropped.
    fn remove(&self, frame_id: FrameId);

    /// Number of evictable frames.
    fn size(&self) -> usize;
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    evictable: bool,
    referenced: bool,
}

#[derive(Debug)]
struct Clock {
    slots: Vec<Slot>,
    hand: usize,
    evictable: usize,
}

impl Clock {
    fn slot(&mut self, frame_id: FrameId) -> Option<&mut Slot> {
        self.slots.get_mut(frame_id.index())
    }
}

/// Second-chance clock.
///
/// The hand sweeps the slots. A referenced evictable slot loses its bit
/// and is passed over; the first evictable slot without the bit is the
/// victim, so two full turns always find one.
#[derive(Debug)]
pub struct ClockReplacer {
    clock: Mutex<Clock>,
}

impl ClockReplacer {
    pub fn new(num_frames: usize) -> Self {
        Self {
            clock: Mutex::new(Clock {
                slots: vec![Slot::default(); num_frames],
                hand: 0,
                evictable: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.clock.lock().slots.len()
    }
}

impl Replacer for ClockReplacer {
    fn record_access(&self, frame_id: FrameId) {
        if let Some(slot) = self.clock.lock().slot(frame_id) {
            slot.referenced = true;
        }
    }

    fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        let mut clock = self.clock.lock();
        let changed = match clock.slot(frame_id) {
            Some(slot) if slot.evictable != evictable => {
                slot.evictable = evictable;
                true
            }
            _ => false,
        };
        if changed {
            if evictable {
                clock.evictable += 1;
            } else {
                clock.evictable -= 1;
            }
        }
    }

    fn evict(&self) -> Option<FrameId> {
        let mut clock = self.clock.lock();
        if clock.evictable == 0 {
            return None;
        }

        let len = clock.slots.len();
        for _ in 0..2 * len {
            let at = clock.hand;
            clock.hand = (at + 1) % len;
            let slot = &mut clock.slots[at];
            if !slot.evictable {
                continue;
            }
            if std::mem::take(&mut slot.referenced) {
                continue;
            }
            slot.evictable = false;
            clock.evictable -= 1;
            return Some(FrameId(at as u32));
        }
        None
    }

    fn remove(&self, frame_id: FrameId) {
        let mut clock = self.clock.lock();
        let was_evictable = match clock.slot(frame_id) {
            Some(slot) => std::mem::take(slot).evictable,
            None => return,
        };
        if was_evictable {
            clock.evictable -= 1;
        }
    }

    fn size(&self) -> usize {
        self.clock.lock().evictable
    }
}
