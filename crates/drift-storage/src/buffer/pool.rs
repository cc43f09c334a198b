//! Buffer pool manager.
//!
//! The buffer pool owns a fixed arena of page frames and mediates every
//! page access between the layers above and the disk manager below:
//! lookups go through the page table, misses claim a frame from the free
//! list or the replacer, dirty victims are written back before reuse.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use drift_common::types::PageId;
use drift_index::ExtendibleHashTable;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::config::BufferPoolConfig;
use super::error::{BufferError, BufferResult};
use super::frame::{BufferFrame, FrameId};
use super::guard::PageGuard;
use super::replacer::{LruKReplacer, Replacer};
use super::BufferPoolStats;
use crate::disk::DiskManager;

/// State guarded by the pool latch.
///
/// One coarse mutex covers the free list, the replacer, and the page id
/// counter. Frame metadata is mutated only while it is held; disk I/O is
/// allowed to happen under it, which keeps the no-duplicate-read and
/// writeback-before-reuse orderings trivial.
struct PoolInner {
    /// Frames with no resident page.
    free_list: VecDeque<FrameId>,
    /// Eviction policy.
    replacer: Box<dyn Replacer + Send>,
    /// Next page id to hand out. Monotone, never reused.
    next_page_id: u64,
}

/// The buffer pool manager.
///
/// All methods take `&self`; the pool is meant to be shared across
/// threads behind an `Arc`. Pages come back as [`PageGuard`]s, which keep
/// their frame pinned until dropped.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use drift_storage::buffer::{BufferPoolConfig, BufferPoolManager};
/// use drift_storage::disk::MemoryDiskManager;
///
/// let config = BufferPoolConfig::new(16);
/// let disk = Arc::new(MemoryDiskManager::new(config.page_size));
/// let pool = BufferPoolManager::new(config, disk).unwrap();
///
/// let page_id = {
///     let mut guard = pool.new_page().unwrap();
///     guard.data_mut()[0] = 42;
///     guard.page_id()
/// };
///
/// let guard = pool.fetch_page(page_id).unwrap();
/// assert_eq!(guard.data()[0], 42);
/// ```
pub struct BufferPoolManager {
    /// Configuration.
    config: BufferPoolConfig,
    /// Frame arena. Index == frame id, stable for the pool's lifetime.
    frames: Vec<Arc<BufferFrame>>,
    /// Page table: maps PageId -> FrameId. Internally synchronized; always
    /// touched after the pool latch, never before.
    page_table: ExtendibleHashTable<PageId, FrameId>,
    /// Free list, replacer, and id counter behind the pool latch.
    inner: Mutex<PoolInner>,
    /// Durable storage.
    disk: Arc<dyn DiskManager>,
    /// Fetch counter for statistics.
    fetch_count: AtomicU64,
    /// Hit counter for statistics.
    hit_count: AtomicU64,
    /// Miss counter for statistics.
    miss_count: AtomicU64,
    /// Eviction counter for statistics.
    eviction_count: AtomicU64,
    /// Flush counter for statistics (explicit flushes and writebacks).
    flush_count: AtomicU64,
}

impl BufferPoolManager {
    /// Creates a buffer pool over the given disk manager.
    pub fn new(config: BufferPoolConfig, disk: Arc<dyn DiskManager>) -> BufferResult<Self> {
        config.validate().map_err(BufferError::config)?;
        if disk.page_size() != config.page_size {
            return Err(BufferError::config(format!(
                "disk page size {} does not match pool page size {}",
                disk.page_size(),
                config.page_size
            )));
        }

        let frames: Vec<Arc<BufferFrame>> = (0..config.pool_size)
            .map(|i| Arc::new(BufferFrame::new(FrameId::new(i), config.page_size)))
            .collect();

        // Initially, every frame is in the free list.
        let free_list: VecDeque<FrameId> = (0..config.pool_size).map(FrameId::new).collect();
        let replacer: Box<dyn Replacer + Send> =
            Box::new(LruKReplacer::new(config.pool_size, config.replacer_k));
        let page_table = ExtendibleHashTable::new(config.bucket_size);

        Ok(Self {
            config,
            frames,
            page_table,
            inner: Mutex::new(PoolInner {
                free_list,
                replacer,
                next_page_id: 0,
            }),
            disk,
            fetch_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        })
    }

    /// Allocates a fresh page and returns it pinned (pin count 1), with a
    /// zeroed payload.
    ///
    /// Fails with [`BufferError::NoFreeFrames`] when every frame is
    /// pinned.
    pub fn new_page(&self) -> BufferResult<PageGuard<'_>> {
        let mut inner = self.inner.lock();
        let frame_id = self.acquire_frame(&mut inner)?;
        let frame = &self.frames[frame_id.index()];

        let page_id = PageId::new(inner.next_page_id);
        if let Err(e) = self.disk.allocate_page(page_id) {
            inner.free_list.push_back(frame_id);
            return Err(e.into());
        }
        inner.next_page_id += 1;

        frame.payload_mut().fill(0);
        frame.set_page_id(page_id);
        frame.clear_dirty();
        frame.pin();

        self.page_table.insert(page_id, frame_id);
        inner.replacer.record_access(frame_id);
        inner.replacer.set_evictable(frame_id, false);

        trace!(%page_id, frame = frame_id.index(), "allocated new page");
        Ok(PageGuard::new(self, Arc::clone(frame), page_id))
    }

    /// Fetches `page_id`, reading it from disk on a miss, and returns it
    /// pinned.
    ///
    /// Fails with [`BufferError::NoFreeFrames`] when the page is not
    /// resident and every frame is pinned.
    pub fn fetch_page(&self, page_id: PageId) -> BufferResult<PageGuard<'_>> {
        if !page_id.is_valid() {
            return Err(BufferError::InvalidPageId);
        }

        let mut inner = self.inner.lock();
        self.fetch_count.fetch_add(1, Ordering::Relaxed);

        if let Some(frame_id) = self.page_table.get(&page_id) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            let frame = &self.frames[frame_id.index()];
            if frame.pin_count() == 0 {
                inner.replacer.set_evictable(frame_id, false);
            }
            inner.replacer.record_access(frame_id);
            frame.pin();
            return Ok(PageGuard::new(self, Arc::clone(frame), page_id));
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let frame_id = self.acquire_frame(&mut inner)?;
        let frame = &self.frames[frame_id.index()];

        {
            let mut data = frame.payload_mut();
            if let Err(e) = self.disk.read_page(page_id, &mut data) {
                drop(data);
                inner.free_list.push_back(frame_id);
                return Err(e.into());
            }
        }

        frame.set_page_id(page_id);
        frame.clear_dirty();
        frame.pin();

        self.page_table.insert(page_id, frame_id);
        inner.replacer.record_access(frame_id);
        inner.replacer.set_evictable(frame_id, false);

        Ok(PageGuard::new(self, Arc::clone(frame), page_id))
    }

    /// Releases one pin on `page_id`, optionally marking it dirty.
    ///
    /// The dirty flag is sticky: a clean unpin never clears a dirty page.
    /// Returns false if the page is not resident or not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let mut inner = self.inner.lock();
        let Some(frame_id) = self.page_table.get(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.index()];
        if frame.pin_count() == 0 {
            return false;
        }

        if is_dirty {
            frame.mark_dirty();
        }
        if frame.unpin() == 0 {
            inner.replacer.set_evictable(frame_id, true);
        }
        true
    }

    /// Writes `page_id`'s frame to disk and clears its dirty bit.
    ///
    /// Fails with [`BufferError::PageNotFound`] if the page is not
    /// resident.
    pub fn flush_page(&self, page_id: PageId) -> BufferResult<()> {
        let _inner = self.inner.lock();
        let Some(frame_id) = self.page_table.get(&page_id) else {
            return Err(BufferError::page_not_found(page_id));
        };
        let frame = &self.frames[frame_id.index()];

        self.disk.write_page(page_id, &frame.payload())?;
        frame.clear_dirty();
        self.flush_count.fetch_add(1, Ordering::Relaxed);
        trace!(%page_id, "flushed page");
        Ok(())
    }

    /// Writes every resident page to disk, clearing dirty bits. Returns
    /// the number of pages written.
    pub fn flush_all_pages(&self) -> BufferResult<usize> {
        let _inner = self.inner.lock();
        let mut flushed = 0;
        for frame in &self.frames {
            let page_id = frame.page_id();
            if !page_id.is_valid() {
                continue;
            }
            self.disk.write_page(page_id, &frame.payload())?;
            frame.clear_dirty();
            flushed += 1;
        }
        self.flush_count.fetch_add(flushed as u64, Ordering::Relaxed);
        Ok(flushed)
    }

    /// Drops `page_id` from the pool and deallocates it on disk.
    ///
    /// Succeeds vacuously when the page is not resident; fails with
    /// [`BufferError::PagePinned`] while any pin is outstanding.
    pub fn delete_page(&self, page_id: PageId) -> BufferResult<()> {
        let mut inner = self.inner.lock();
        let Some(frame_id) = self.page_table.get(&page_id) else {
            return Ok(());
        };
        let frame = &self.frames[frame_id.index()];
        let pin_count = frame.pin_count();
        if pin_count > 0 {
            return Err(BufferError::PagePinned { page_id, pin_count });
        }

        self.page_table.remove(&page_id);
        // The replacer only drops evictable slots; an unpinned resident
        // page is already evictable, this makes the delete path immune to
        // reordering around it.
        inner.replacer.set_evictable(frame_id, true);
        inner.replacer.remove(frame_id);

        frame.clear();
        inner.free_list.push_back(frame_id);
        self.disk.deallocate_page(page_id)?;

        debug!(%page_id, frame = frame_id.index(), "deleted page");
        Ok(())
    }

    /// Returns true if `page_id` is resident.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_table.get(&page_id).is_some()
    }

    /// Returns the pin count of `page_id`, or `None` if not resident.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let frame_id = self.page_table.get(&page_id)?;
        Some(self.frames[frame_id.index()].pin_count())
    }

    /// Returns the number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.config.pool_size
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    /// Returns statistics about the buffer pool.
    pub fn stats(&self) -> BufferPoolStats {
        let mut pinned = 0;
        let mut dirty = 0;
        for frame in &self.frames {
            if frame.is_pinned() {
                pinned += 1;
            }
            if frame.is_dirty() {
                dirty += 1;
            }
        }

        BufferPoolStats {
            fetches: self.fetch_count.load(Ordering::Relaxed),
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
            evictions: self.eviction_count.load(Ordering::Relaxed),
            flushes: self.flush_count.load(Ordering::Relaxed),
            pinned_frames: pinned,
            dirty_frames: dirty,
        }
    }

    // -------------------------------------------------------------------------
    // Private helpers
    // -------------------------------------------------------------------------

    /// Claims an empty frame: free list first, eviction second.
    ///
    /// A dirty victim is written back before its frame is handed out, and
    /// the victim leaves the page table so no stale mapping survives.
    fn acquire_frame(&self, inner: &mut PoolInner) -> BufferResult<FrameId> {
        if let Some(frame_id) = inner.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = inner.replacer.evict().ok_or(BufferError::NoFreeFrames)?;
        let frame = &self.frames[frame_id.index()];
        let victim = frame.page_id();
        debug_assert!(victim.is_valid(), "evicted an empty frame");

        if frame.is_dirty() {
            self.disk.write_page(victim, &frame.payload())?;
            self.flush_count.fetch_add(1, Ordering::Relaxed);
        }

        self.page_table.remove(&victim);
        frame.clear();
        self.eviction_count.fetch_add(1, Ordering::Relaxed);
        debug!(%victim, frame = frame_id.index(), "evicted page");
        Ok(frame_id)
    }
}

impl std::fmt::Debug for BufferPoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPoolManager")
            .field("pool_size", &self.config.pool_size)
            .field("page_size", &self.config.page_size)
            .field("replacer_k", &self.config.replacer_k)
            .field("stats", &self.stats())
            .finish()
    }
}
