//! SQLite storage layer.
//!
//! Execution snapshots backed by SQLite with WAL mode and split read/write
//! connection pools.

pub mod execution;
pub mod pool;
