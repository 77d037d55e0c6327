//! Streaming batch pipeline
//!
//! ```text
//!   request body chunks
//!          │
//!          ▼
//! ┌──────────────────────┐
//! │  PathStreamParser    │  emits each path as its closing quote arrives
//! └──────────┬───────────┘
//!            │ lazy stream of paths
//!            ▼
//! ┌──────────────────────┐
//! │  BatchCoordinator    │  one task per path, optional semaphore
//! └──┬────────┬───────┬──┘
//!    ▼        ▼       ▼
//! ┌──────┐ ┌──────┐ ┌──────┐
//! │ exec │ │ exec │ │ exec │   OperationExecutor: stat / checksum / delete
//! └──┬───┘ └──┬───┘ └──┬───┘
//!    └────────┼────────┘
//!             ▼ completion order
//! ┌──────────────────────┐
//! │  BatchResponse       │  200 + array, or 400 problem document
//! └──────────────────────┘
//! ```

pub mod coordinator;
pub mod executor;
pub mod parser;
pub mod response;
pub mod types;

pub use coordinator::{BatchCoordinator, BatchSummary};
pub use executor::OperationExecutor;
pub use parser::{path_stream, PathStreamParser, PathToken};
pub use response::BatchResponse;
pub use types::{BatchResult, ItemData, ItemResult, Operation, Outcome};
