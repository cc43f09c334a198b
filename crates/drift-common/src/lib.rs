//! # drift-common
//!
//! Common types and constants for DriftDB.
//!
//! This crate provides the foundational value types shared by every
//! DriftDB component:
//!
//! - **Types**: Core identifiers (`PageId`, `Lsn`)
//! - **Constants**: Page sizing, buffer pool, and replacer defaults
//!
//! ## Example
//!
//! ```rust
//! use drift_common::types::PageId;
//!
//! let page_id = PageId::new(42);
//! assert!(page_id.is_valid());
//! assert_eq!(page_id.next().as_u64(), 43);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::{Lsn, PageId};
