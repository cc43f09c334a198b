//! Core types for DriftDB.

mod ids;

pub use ids::{Lsn, PageId};
