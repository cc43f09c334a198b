//! Disk I/O layer for DriftDB.
//!
//! This module provides page-granular access to durable storage behind
//! the [`DiskManager`] trait:
//!
//! - **[`FileDiskManager`]**: a single data file, one page per
//!   `page_size`-aligned slot
//! - **[`MemoryDiskManager`]**: a heap-backed double for tests and
//!   ephemeral pools
//!
//! The buffer pool is the only intended caller. It surfaces disk failures
//! upward unmodified; nothing at this layer retries.

mod error;
mod manager;

pub use error::{DiskError, DiskResult};
pub use manager::{DiskManager, FileDiskManager, MemoryDiskManager};
