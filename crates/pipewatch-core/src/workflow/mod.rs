//! Workflow engine core: definition parsing, sequential execution, and durable checkpointing.
//!
//! - `definition` -- YAML/JSON parsing, validation, filesystem load/save
//! - `registry` -- in-memory id -> definition map
//! - `template` -- `${name}` resolution against outputs and context
//! - `condition` -- truthiness rules for step conditions
//! - `checkpoint` -- version-stamped snapshot writes for crash recovery
//! - `engine` -- the orchestrator tying the above to agents and storage

pub mod checkpoint;
pub mod condition;
pub mod definition;
pub mod engine;
pub mod registry;
pub mod template;
