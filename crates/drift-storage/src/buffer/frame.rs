//! Page frames.
//!
//! A frame is one fixed-size slot in the pool's arena. Frames are built
//! once at pool construction and reused across many pages; only the
//! metadata and payload change hands. Pin count, dirty bit, and the
//! resident page id live in atomics so that guard holders can read them
//! without taking the pool latch, while every mutation happens under it.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use drift_common::types::{Lsn, PageId};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Position of a frame within the pool arena.
///
/// Frame ids are dense indices in `[0, pool_size)` and stay fixed for the
/// life of the pool, so they double as keys in the page table and the
/// replacer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FrameId(usize);

impl FrameId {
    /// Wraps a raw arena index.
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Unwraps back to the arena index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One slot of the buffer pool: a page-sized byte buffer plus the
/// bookkeeping the pool needs to manage it.
///
/// The payload sits behind its own reader-writer latch, separate from the
/// pool latch, so pinned holders can read and write page bytes while the
/// pool serves unrelated requests.
pub struct BufferFrame {
    /// Where this frame sits in the arena.
    id: FrameId,
    /// Id of the page currently held, or the invalid sentinel when vacant.
    resident: AtomicU64,
    /// Number of outstanding claims on the resident page.
    pins: AtomicU32,
    /// Set when the payload has diverged from the on-disk copy.
    dirty: AtomicBool,
    /// LSN of the latest logged change to the resident page.
    last_lsn: AtomicU64,
    /// The page bytes.
    payload: RwLock<Box<[u8]>>,
}

impl BufferFrame {
    /// Builds a vacant frame with a zeroed payload of `page_size` bytes.
    pub fn new(id: FrameId, page_size: usize) -> Self {
        Self {
            id,
            resident: AtomicU64::new(PageId::INVALID.as_u64()),
            pins: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
            last_lsn: AtomicU64::new(Lsn::INVALID.as_u64()),
            payload: RwLock::new(vec![0u8; page_size].into_boxed_slice()),
        }
    }

    /// This frame's arena position.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.id
    }

    /// The page currently resident, or [`PageId::INVALID`] when vacant.
    #[inline]
    pub fn page_id(&self) -> PageId {
        PageId::new(self.resident.load(Ordering::Acquire))
    }

    /// Records which page now occupies this frame.
    pub fn set_page_id(&self, page_id: PageId) {
        self.resident.store(page_id.as_u64(), Ordering::Release);
    }

    /// Current number of pins.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pins.load(Ordering::Acquire)
    }

    /// True while at least one caller holds the page.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// Adds a claim on the resident page.
    pub fn pin(&self) {
        self.pins.fetch_add(1, Ordering::AcqRel);
    }

    /// Drops one claim and reports how many remain.
    pub fn unpin(&self) -> u32 {
        let before = self.pins.fetch_sub(1, Ordering::AcqRel);
        debug_assert_ne!(before, 0, "pin underflow on frame {}", self.id);
        before - 1
    }

    /// True when the payload has unwritten changes.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Flags the payload as diverged from disk.
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Flags the payload as matching disk again, after a flush or
    /// writeback.
    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::Release);
    }

    /// LSN of the latest logged change.
    pub fn lsn(&self) -> Lsn {
        Lsn::new(self.last_lsn.load(Ordering::Acquire))
    }

    /// Stamps the latest logged change.
    pub fn set_lsn(&self, lsn: Lsn) {
        self.last_lsn.store(lsn.as_u64(), Ordering::Release);
    }

    /// Shared access to the page bytes.
    #[inline]
    pub fn payload(&self) -> RwLockReadGuard<'_, Box<[u8]>> {
        self.payload.read()
    }

    /// Exclusive access to the page bytes.
    #[inline]
    pub fn payload_mut(&self) -> RwLockWriteGuard<'_, Box<[u8]>> {
        self.payload.write()
    }

    /// Returns the frame to the vacant state.
    ///
    /// The payload keeps its old bytes; whoever claims the frame next
    /// overwrites them before the frame becomes reachable again.
    pub fn clear(&self) {
        self.resident
            .store(PageId::INVALID.as_u64(), Ordering::Release);
        self.pins.store(0, Ordering::Release);
        self.dirty.store(false, Ordering::Release);
        self.last_lsn.store(Lsn::INVALID.as_u64(), Ordering::Release);
    }
}

impl fmt::Debug for BufferFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferFrame")
            .field("id", &self.id)
            .field("resident", &self.page_id())
            .field("pins", &self.pin_count())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: usize = 4096;

    #[test]
    fn test_fresh_frame_is_vacant() {
        let frame = BufferFrame::new(FrameId::new(3), PAGE);

        assert_eq!(frame.frame_id().index(), 3);
        assert_eq!(frame.page_id(), PageId::INVALID);
        assert_eq!(frame.pin_count(), 0);
        assert!(!frame.is_pinned());
        assert!(!frame.is_dirty());
        assert_eq!(frame.lsn(), Lsn::INVALID);
        assert!(frame.payload().iter().all(|&b| b == 0));
        assert_eq!(frame.payload().len(), PAGE);
    }

    #[test]
    fn test_pin_lifecycle() {
        let frame = BufferFrame::new(FrameId::new(0), PAGE);

        frame.pin();
        frame.pin();
        assert_eq!(frame.pin_count(), 2);

        assert_eq!(frame.unpin(), 1);
        assert!(frame.is_pinned());
        assert_eq!(frame.unpin(), 0);
        assert!(!frame.is_pinned());
    }

    #[test]
    fn test_dirty_tracking() {
        let frame = BufferFrame::new(FrameId::new(0), PAGE);

        frame.mark_dirty();
        assert!(frame.is_dirty());
        frame.clear_dirty();
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_resident_page_assignment() {
        let frame = BufferFrame::new(FrameId::new(0), PAGE);

        frame.set_page_id(PageId::new(17));
        assert_eq!(frame.page_id(), PageId::new(17));
    }

    #[test]
    fn test_payload_round_trip() {
        let frame = BufferFrame::new(FrameId::new(0), PAGE);

        frame.payload_mut()[..3].copy_from_slice(&[10, 20, 30]);
        assert_eq!(&frame.payload()[..3], &[10, 20, 30]);
    }

    #[test]
    fn test_clear_resets_metadata_only() {
        let frame = BufferFrame::new(FrameId::new(0), PAGE);
        frame.set_page_id(PageId::new(5));
        frame.pin();
        frame.mark_dirty();
        frame.set_lsn(Lsn::new(77));
        frame.payload_mut()[0] = 0xCC;

        frame.clear();

        assert_eq!(frame.page_id(), PageId::INVALID);
        assert_eq!(frame.pin_count(), 0);
        assert!(!frame.is_dirty());
        assert_eq!(frame.lsn(), Lsn::INVALID);
        // Old bytes linger until the next occupant overwrites them.
        assert_eq!(frame.payload()[0], 0xCC);
    }

    #[test]
    fn test_frame_id_display() {
        let id = FrameId::new(42);
        assert_eq!(id.index(), 42);
        assert_eq!(id.to_string(), "42");
    }
}
