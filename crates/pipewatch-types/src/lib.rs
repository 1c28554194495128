//! Shared domain types for pipewatch.
//!
//! Workflow definitions, execution snapshots, events, configuration and
//! their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod execution;
pub mod workflow;
