//! Business logic and repository trait definitions for pipewatch.
//!
//! This crate defines the "ports" (agent and repository traits) that the
//! infrastructure layer implements, plus the workflow engine that drives
//! them. It depends only on `pipewatch-types`, never on `pipewatch-infra` or
//! any database/IO crate.

pub mod agent;
pub mod event;
pub mod repository;
pub mod workflow;
