//! Pinned page guards.
//!
//! A [`PageGuard`] is the caller's claim on a resident page: the frame
//! stays pinned (and therefore never evicted) for as long as the guard
//! lives, and dropping it routes through the pool's unpin path so the
//! replacer sees the release.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use drift_common::types::{Lsn, PageId};
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use super::frame::{BufferFrame, FrameId};
use super::pool::BufferPoolManager;

/// RAII handle to a pinned page.
///
/// Writing through [`data_mut`](Self::data_mut) (or calling
/// [`mark_dirty`](Self::mark_dirty)) makes the eventual unpin a dirty
/// unpin; the dirty bit on the frame is sticky, so a later clean guard
/// cannot wash out an earlier dirty one.
pub struct PageGuard<'a> {
    pool: &'a BufferPoolManager,
    frame: Arc<BufferFrame>,
    page_id: PageId,
    dirty: bool,
}

impl<'a> PageGuard<'a> {
    pub(crate) fn new(pool: &'a BufferPoolManager, frame: Arc<BufferFrame>, page_id: PageId) -> Self {
        Self {
            pool,
            frame,
            page_id,
            dirty: false,
        }
    }

    /// Id of the pinned page.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Arena position of the frame holding the page.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame.frame_id()
    }

    /// Shared view of the page bytes.
    #[inline]
    pub fn data(&self) -> impl Deref<Target = [u8]> + '_ {
        PayloadRef {
            latch: self.frame.payload(),
        }
    }

    /// Exclusive view of the page bytes; taking it marks the page dirty.
    #[inline]
    pub fn data_mut(&mut self) -> impl DerefMut<Target = [u8]> + '_ {
        self.dirty = true;
        self.frame.mark_dirty();
        PayloadMut {
            latch: self.frame.payload_mut(),
        }
    }

    /// Marks the page as modified without touching the data.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.frame.mark_dirty();
    }

    /// Returns true if this guard will unpin dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Stamps the frame with the LSN of the modification being applied.
    #[inline]
    pub fn set_lsn(&mut self, lsn: Lsn) {
        self.frame.set_lsn(lsn);
    }
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        self.pool.unpin_page(self.page_id, self.dirty);
    }
}

impl std::fmt::Debug for PageGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageGuard")
            .field("page_id", &self.page_id)
            .field("frame", &self.frame.frame_id())
            .field("dirty", &self.dirty)
            .finish()
    }
}

/// Shared view of the page bytes, alive as long as the frame's payload
/// latch is held.
struct PayloadRef<'a> {
    latch: RwLockReadGuard<'a, Box<[u8]>>,
}

impl Deref for PayloadRef<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.latch
    }
}

/// Exclusive view of the page bytes.
struct PayloadMut<'a> {
    latch: RwLockWriteGuard<'a, Box<[u8]>>,
}

impl Deref for PayloadMut<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.latch
    }
}

impl DerefMut for PayloadMut<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.latch
    }
}
