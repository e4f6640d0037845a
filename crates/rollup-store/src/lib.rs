//! rollup-store - Record store layer for estimate rollup
//!
//! This crate provides the read-only `RecordStore` trait the engine fetches
//! its input snapshot through, and `MemoryStore`, an implementation backed by
//! record tables loaded from JSON or YAML exports.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryStore, RecordTables};
pub use traits::{fetch_snapshot, RecordStore};
