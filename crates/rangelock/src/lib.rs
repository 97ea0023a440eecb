//! In-process byte-range locking for a single file.
//!
//! A [`RangeLockTable`] grants overlapping shared (read) ranges and exclusive
//! (write) ranges, blocking callers whose request conflicts with a held range
//! until it is released. Callers that manage several files keep one table per
//! file.

pub mod config;
pub mod error;
pub mod range;
pub mod stats;
pub mod table;

pub use config::RangeLockConfig;
pub use error::{LockError, Result};
pub use range::{LockKind, Range};
pub use stats::LockStats;
pub use table::RangeLockTable;
