//! fs-bucket - HTTP File Server with Streaming Batch Operations
//!
//! Exposes a machine's local filesystem over a small REST API: stream files
//! in and out, read metadata, compute SHA-256 digests, delete files. Batch
//! endpoints accept a JSON body listing many paths and start work on each
//! path as soon as it has been parsed, without waiting for the full body.
//!
//! # Features
//!
//! - **Streaming I/O**: Downloads and uploads move through fixed-size
//!   chunks; no file is held in memory.
//!
//! - **Incremental Batch Parsing**: A byte-level parser emits each path from
//!   `{"paths": [...]}` as its closing quote arrives.
//!
//! - **Concurrent Fan-out**: One task per batch item, optionally bounded by
//!   a per-batch semaphore.
//!
//! - **Two Error Tiers**: Request failures become `application/problem+json`
//!   documents; per-item failures are data inside the batch array.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP client                             │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   axum router (server)                          │
//! │   /files/*  /metadata/*  /checksum/*      POST /metadata        │
//! │        │          │           │           POST /checksum        │
//! │        │          │           │           POST /delete          │
//! │        │          │           │                 │               │
//! │        │          │           │                 ▼               │
//! │        │          │           │     ┌──────────────────────┐    │
//! │        │          │           │     │ PathStreamParser     │    │
//! │        │          │           │     │ BatchCoordinator     │    │
//! │        │          │           │     └──────────┬───────────┘    │
//! │        ▼          ▼           ▼                ▼                │
//! │            ┌──────────────────────────┐                         │
//! │            │    OperationExecutor     │                         │
//! │            │  stat / sha256 / unlink  │                         │
//! │            └──────────────────────────┘                         │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//!                    ┌──────────────────┐
//!                    │ Local filesystem │
//!                    └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! fs-bucket --port 4000
//!
//! curl -T report.pdf http://localhost:4000/files/tmp/report.pdf
//! curl http://localhost:4000/checksum/tmp/report.pdf
//! curl -d '{"paths":["/tmp/a","/tmp/b"]}' http://localhost:4000/metadata
//! ```

pub mod batch;
pub mod config;
pub mod content;
pub mod error;
pub mod localfs;
pub mod server;

pub use batch::{BatchCoordinator, ItemResult, Operation, OperationExecutor};
pub use config::{CliArgs, ServerConfig};
pub use error::{ApiError, BucketError, FsError, ParseError, Result};
pub use server::{RunningServer, ServerContext};
