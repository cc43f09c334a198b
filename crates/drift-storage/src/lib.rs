//! # drift-storage
//!
//! The storage core of DriftDB: a fixed-capacity buffer pool that mediates
//! all access between higher database layers and durable block storage.
//!
//! - **Disk layer** ([`disk`]): page-granular block I/O behind the
//!   [`disk::DiskManager`] trait, with file-backed and in-memory backends
//! - **Buffer layer** ([`buffer`]): the frame arena, LRU-K replacement,
//!   pinned page guards, and the [`buffer::BufferPoolManager`] that ties
//!   them to the page table

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Buffer pool management
pub mod buffer;

/// Disk I/O
pub mod disk;
