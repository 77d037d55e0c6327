//! Local filesystem helpers
//!
//! Stat records and request path normalization shared by the single-file
//! handlers and the batch pipeline.

pub mod path;
pub mod types;

pub use path::normalize_request_path;
pub use types::{EntryType, Permissions, StatRecord};
