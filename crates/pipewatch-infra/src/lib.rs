//! Infrastructure layer for pipewatch.
//!
//! Implementations of the ports defined in `pipewatch-core`: the SQLite
//! execution store, built-in agents, configuration loading and the data
//! directory layout.

pub mod agent;
pub mod config;
pub mod filesystem;
pub mod sqlite;
