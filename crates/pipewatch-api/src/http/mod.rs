//! HTTP/REST API layer for pipewatch.
//!
//! Axum-based REST API at `/api/v1/` with the envelope response format and
//! CORS support. There is no authentication; the server binds to localhost by
//! default.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
