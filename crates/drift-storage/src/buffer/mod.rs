//! Buffer pool for DriftDB.
//!
//! The buffer pool manages a fixed-size pool of in-memory page frames,
//! mediating every page access between the layers above and durable
//! storage below:
//!
//! - **Page Caching**: keep hot pages in memory, one page per frame
//! - **Pin/Unpin**: reference counting keeps in-use frames from eviction
//! - **Dirty Tracking**: modified pages are written back before reuse
//! - **Eviction Policy**: LRU-K replacement behind the [`Replacer`] trait
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   BufferPoolManager                      │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │   Page Table: ExtendibleHashTable<PageId, FrameId> │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │                           │                              │
//! │                           ▼                              │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │ Frame Arena                                        │  │
//! │  │ ┌─────────┐ ┌─────────┐ ┌─────────┐   ┌─────────┐  │  │
//! │  │ │ Frame 0 │ │ Frame 1 │ │ Frame 2 │...│ Frame N │  │  │
//! │  │ │ page_id │ │ page_id │ │ page_id │   │ page_id │  │  │
//! │  │ │ pin_cnt │ │ pin_cnt │ │ pin_cnt │   │ pin_cnt │  │  │
//! │  │ │ dirty   │ │ dirty   │ │ dirty   │   │ dirty   │  │  │
//! │  │ │ data[]  │ │ data[]  │ │ data[]  │   │ data[]  │  │  │
//! │  │ └─────────┘ └─────────┘ └─────────┘   └─────────┘  │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │              │                          │                │
//! │              ▼                          ▼                │
//! │  ┌────────────────────┐    ┌──────────────────────────┐  │
//! │  │ Free List          │    │ LruKReplacer             │  │
//! │  │ (empty frames)     │    │ (eviction candidates)    │  │
//! │  └────────────────────┘    └──────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use drift_storage::buffer::{BufferPoolConfig, BufferPoolManager};
//! use drift_storage::disk::MemoryDiskManager;
//!
//! let config = BufferPoolConfig::new(64);
//! let disk = Arc::new(MemoryDiskManager::new(config.page_size));
//! let pool = BufferPoolManager::new(config, disk)?;
//!
//! // Allocate a page and write to it
//! let page_id = {
//!     let mut guard = pool.new_page()?;
//!     guard.data_mut()[..5].copy_from_slice(b"hello");
//!     guard.page_id()
//! };
//! // Guard dropped: page unpinned (dirty) and eligible for eviction
//!
//! let guard = pool.fetch_page(page_id)?;
//! assert_eq!(&guard.data()[..5], b"hello");
//! # Ok::<(), drift_storage::buffer::BufferError>(())
//! ```

mod config;
mod error;
mod frame;
mod guard;
mod pool;
mod replacer;

pub use config::BufferPoolConfig;
pub use error::{BufferError, BufferResult};
pub use frame::{BufferFrame, FrameId};
pub use guard::PageGuard;
pub use pool::BufferPoolManager;
pub use replacer::{LruKReplacer, Replacer};

/// Statistics for buffer pool monitoring.
#[derive(Debug, Clone, Default)]
pub struct BufferPoolStats {
    /// Total number of page fetches.
    pub fetches: u64,
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses (required disk read).
    pub misses: u64,
    /// Number of pages evicted.
    pub evictions: u64,
    /// Number of pages written out (flushes and eviction writebacks).
    pub flushes: u64,
    /// Current number of pinned frames.
    pub pinned_frames: usize,
    /// Current number of dirty frames.
    pub dirty_frames: usize,
}

impl BufferPoolStats {
    /// Returns the cache hit ratio (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        if self.fetches == 0 {
            0.0
        } else {
            self.hits as f64 / self.fetches as f64
        }
    }
}
