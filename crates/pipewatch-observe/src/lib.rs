//! Observability setup for pipewatch: structured logging through `tracing`
//! with optional OpenTelemetry span export.

pub mod tracing_setup;

pub use tracing_setup::{filter_for_verbosity, init_tracing, shutdown_tracing};
