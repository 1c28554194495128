//! REST API request handlers.

pub mod execution;
pub mod stats;
pub mod workflow;
