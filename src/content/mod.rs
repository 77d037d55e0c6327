//! Content hashing
//!
//! This module provides streaming SHA-256 digests used by the single-file
//! and batch checksum endpoints.

pub mod checksum;

pub use checksum::{sha256_file, sha256_hex};
