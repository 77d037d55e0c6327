//! HTTP server module.
//!
//! Provides the REST surface over the local filesystem: single-file
//! download/upload/stat/checksum/delete and the streaming batch endpoints.

pub mod context;
pub mod routes;

pub use context::{RunningServer, ServerContext};
pub use routes::{build_router, AppState};
