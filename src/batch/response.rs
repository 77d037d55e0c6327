//! Response emitter for batch requests
//!
//! A batch produces exactly one response: the full result array with `200`,
//! or a `400` problem document when the body could not be parsed. Per-item
//! failures are inside the array and never change the status.

use crate::batch::types::BatchResult;
use crate::error::{problem_response, ApiError, ParseError};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::error;

/// Final outcome of a batch request
#[derive(Debug)]
pub enum BatchResponse {
    /// Every item resolved
    Completed(BatchResult),
    /// The body was malformed
    Rejected(ParseError),
}

impl From<Result<BatchResult, ParseError>> for BatchResponse {
    fn from(result: Result<BatchResult, ParseError>) -> Self {
        match result {
            Ok(results) => BatchResponse::Completed(results),
            Err(err) => BatchResponse::Rejected(err),
        }
    }
}

impl IntoResponse for BatchResponse {
    fn into_response(self) -> Response {
        match self {
            BatchResponse::Completed(results) => match serde_json::to_vec(&results) {
                Ok(body) => (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "application/json")],
                    body,
                )
                    .into_response(),
                Err(e) => {
                    error!(error = %e, "Failed to serialize batch results");
                    problem_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
                }
            },
            BatchResponse::Rejected(err) => ApiError::Parse(err).into_response(),
        }
    }
}
