//! System-wide constants for DriftDB.
//!
//! This module defines constants used across the page cache.

// =============================================================================
// Page and Memory Constants
// =============================================================================

/// Default page size in bytes (4 KB).
///
/// Matches the typical OS page size and the smallest common SSD block,
/// keeping a single page read a single device operation.
pub const DEFAULT_PAGE_SIZE: usize = 4 * 1024;

/// Minimum page size in bytes (512 B).
pub const MIN_PAGE_SIZE: usize = 512;

/// Maximum page size in bytes (64 KB).
pub const MAX_PAGE_SIZE: usize = 64 * 1024;

// =============================================================================
// Buffer Pool Constants
// =============================================================================

/// Default number of frames in the buffer pool.
pub const DEFAULT_POOL_SIZE: usize = 1024;

/// Minimum number of frames a pool can be configured with.
pub const MIN_POOL_SIZE: usize = 1;

// =============================================================================
// Replacer Constants
// =============================================================================

/// Default K for the LRU-K replacement policy.
///
/// K = 2 distinguishes pages touched once in a scan from pages with a
/// genuine re-reference history.
pub const DEFAULT_REPLACER_K: usize = 2;

// =============================================================================
// Page Table Constants
// =============================================================================

/// Default bucket capacity for the extendible hash table backing the
/// page table.
pub const DEFAULT_BUCKET_SIZE: usize = 8;
