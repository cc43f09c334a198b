//! Disk I/O error types.

use std::io;

use drift_common::types::PageId;
use thiserror::Error;

/// Result type for disk operations.
pub type DiskResult<T> = Result<T, DiskError>;

/// Errors that can occur during page I/O.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum DiskError {
    /// Underlying I/O error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// A write persisted fewer bytes than a full page.
    #[error("short write for page {page_id}: expected {expected} bytes, wrote {actual}")]
    ShortWrite {
        page_id: PageId,
        expected: usize,
        actual: usize,
    },

    /// Caller-supplied buffer does not match the configured page size.
    #[error("buffer size mismatch: page size is {page_size}, buffer is {buffer_len}")]
    BufferSizeMismatch { page_size: usize, buffer_len: usize },

    /// Operation on the invalid page id sentinel.
    #[error("invalid page id")]
    InvalidPageId,
}

impl DiskError {
    /// Creates a short-write error.
    pub fn short_write(page_id: PageId, expected: usize, actual: usize) -> Self {
        Self::ShortWrite {
            page_id,
            expected,
            actual,
        }
    }

    /// Returns true if this wraps an interrupted/would-block I/O error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { source }
                if source.kind() == io::ErrorKind::Interrupted
                    || source.kind() == io::ErrorKind::WouldBlock
        )
    }
}
