//! Concurrent index structures for DriftDB.
//!
//! This crate provides reusable, internally synchronized containers used
//! by the storage layer:
//!
//! - **Extendible Hash Table**: A dynamic hash index whose directory
//!   doubles on demand, so it grows with the key population instead of
//!   rehashing everything at once
//!
//! # Example
//!
//! ```rust
//! use drift_index::ExtendibleHashTable;
//!
//! let table = ExtendibleHashTable::new(4);
//! table.insert(1u64, "one");
//! assert_eq!(table.get(&1), Some("one"));
//! assert!(table.remove(&1));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod extendible;

pub use extendible::ExtendibleHashTable;
