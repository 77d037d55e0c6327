//! Error types for fs-bucket
//!
//! This module defines the error hierarchy for the server:
//! - Configuration and startup errors
//! - Streaming batch-body parse errors (fatal for a batch)
//! - Filesystem errors, classified into a closed `ErrorKind`
//! - Request-level API errors rendered as problem documents
//!
//! Two tiers exist. Request-level errors end the HTTP response with a mapped
//! status. Item-level errors inside a batch are plain data (`FsError` is
//! serialized inline) and never change the batch status.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::io;
use thiserror::Error;

/// Content type for error bodies
pub const PROBLEM_JSON: &str = "application/problem+json";

/// Top-level error type for the fs-bucket application
#[derive(Error, Debug)]
pub enum BucketError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors (bind, accept, serve)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The server task ended abnormally
    #[error("Server task failed: {0}")]
    ServerTask(String),
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Bind address could not be parsed
    #[error("Invalid bind address '{addr}': {reason}")]
    InvalidBindAddress { addr: String, reason: String },

    /// Concurrency limit of zero would never dispatch anything
    #[error("Invalid concurrency limit {value}: must be at least 1")]
    InvalidConcurrency { value: usize },

    /// Read chunk size out of range
    #[error("Invalid read chunk size {size}: must be between {min} and {max}")]
    InvalidChunkSize { size: usize, min: usize, max: usize },
}

/// Closed classification of filesystem failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    PermissionDenied,
    IsDirectory,
    IoError,
}

impl ErrorKind {
    /// Classify a raw OS error number
    pub fn from_errno(errno: i32) -> Self {
        match errno {
            libc::EINVAL => ErrorKind::InvalidArgument,
            libc::ENOENT | libc::ESRCH => ErrorKind::NotFound,
            libc::EPERM | libc::EACCES => ErrorKind::PermissionDenied,
            libc::EISDIR => ErrorKind::IsDirectory,
            _ => ErrorKind::IoError,
        }
    }

    /// Classify an I/O error, preferring the OS error number when present
    pub fn from_io_error(err: &io::Error) -> Self {
        if let Some(errno) = err.raw_os_error() {
            return Self::from_errno(errno);
        }

        match err.kind() {
            io::ErrorKind::InvalidInput => ErrorKind::InvalidArgument,
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            io::ErrorKind::IsADirectory => ErrorKind::IsDirectory,
            _ => ErrorKind::IoError,
        }
    }

    /// HTTP status used by the single-item endpoints
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::PermissionDenied => StatusCode::UNAUTHORIZED,
            ErrorKind::IsDirectory => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::IoError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Problem document detail text
    pub fn detail(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "Bad Request",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::PermissionDenied => "Unauthorized",
            ErrorKind::IsDirectory => "Is A Directory",
            ErrorKind::IoError => "Internal Server Error",
        }
    }
}

/// Symbolic name for an OS error number
pub fn errno_name(errno: i32) -> Option<&'static str> {
    let name = match errno {
        libc::EPERM => "EPERM",
        libc::ENOENT => "ENOENT",
        libc::ESRCH => "ESRCH",
        libc::EIO => "EIO",
        libc::EBADF => "EBADF",
        libc::EAGAIN => "EAGAIN",
        libc::ENOMEM => "ENOMEM",
        libc::EACCES => "EACCES",
        libc::EBUSY => "EBUSY",
        libc::EEXIST => "EEXIST",
        libc::EXDEV => "EXDEV",
        libc::ENOTDIR => "ENOTDIR",
        libc::EISDIR => "EISDIR",
        libc::EINVAL => "EINVAL",
        libc::ENFILE => "ENFILE",
        libc::EMFILE => "EMFILE",
        libc::ETXTBSY => "ETXTBSY",
        libc::EFBIG => "EFBIG",
        libc::ENOSPC => "ENOSPC",
        libc::EROFS => "EROFS",
        libc::EMLINK => "EMLINK",
        libc::ENAMETOOLONG => "ENAMETOOLONG",
        libc::ENOTEMPTY => "ENOTEMPTY",
        libc::ELOOP => "ELOOP",
        libc::ESTALE => "ESTALE",
        _ => return None,
    };
    Some(name)
}

/// A failed filesystem call, serialized inline in batch results
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{code}: {message}, {syscall} '{path}'")]
pub struct FsError {
    /// Symbolic errno name, `UNKNOWN` when the OS gave none
    pub code: String,

    /// Negated OS error number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errno: Option<i32>,

    /// The call that failed (`stat`, `open`, `read`, `unlink`, ...)
    pub syscall: &'static str,

    /// Path the call was made on
    pub path: String,

    /// Classification used for HTTP status mapping
    pub kind: ErrorKind,

    /// Human readable description
    pub message: String,
}

impl FsError {
    /// Build from an I/O error raised by `syscall` on `path`
    pub fn from_io(syscall: &'static str, path: &str, err: &io::Error) -> Self {
        let errno = err.raw_os_error();
        let code = errno
            .and_then(errno_name)
            .unwrap_or("UNKNOWN")
            .to_string();

        Self {
            code,
            errno: errno.map(|n| -n),
            syscall,
            path: path.to_string(),
            kind: ErrorKind::from_io_error(err),
            message: err.to_string(),
        }
    }

    /// Build a catch-all I/O failure that has no OS error behind it
    pub fn internal(syscall: &'static str, path: &str, message: impl Into<String>) -> Self {
        Self {
            code: "EIO".to_string(),
            errno: Some(-libc::EIO),
            syscall,
            path: path.to_string(),
            kind: ErrorKind::IoError,
            message: message.into(),
        }
    }
}

/// Result type alias for FsError
pub type FsResult<T> = std::result::Result<T, FsError>;

/// Fatal errors while decoding a streamed `{"paths": [...]}` body
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A byte that cannot appear at this position
    #[error("Unexpected byte 0x{byte:02x} at offset {offset}: expected {expected}")]
    UnexpectedByte {
        byte: u8,
        offset: u64,
        expected: &'static str,
    },

    /// The `paths` key is bound to something other than an array
    #[error("Value of \"paths\" at offset {offset} is not an array")]
    PathsNotArray { offset: u64 },

    /// An element of the `paths` array is not a string
    #[error("Element of \"paths\" at offset {offset} is not a string")]
    NonStringPath { offset: u64 },

    /// A string literal could not be decoded
    #[error("Invalid string ending at offset {offset}: {reason}")]
    InvalidString { offset: u64, reason: String },

    /// A bare literal (number, true, false, null) could not be decoded
    #[error("Invalid literal '{literal}' ending at offset {offset}")]
    InvalidLiteral { literal: String, offset: u64 },

    /// A closing bracket that does not match the open one
    #[error("Unbalanced structure at offset {offset}")]
    Unbalanced { offset: u64 },

    /// Body ended before the document was complete
    #[error("Unexpected end of body: expected {expected}")]
    UnexpectedEof { expected: &'static str },

    /// Non-whitespace after the root object
    #[error("Trailing data at offset {offset}")]
    TrailingData { offset: u64 },

    /// The request body stream itself failed
    #[error("Request body failed: {0}")]
    Body(String),
}

/// Request-level errors rendered as `application/problem+json`
#[derive(Error, Debug)]
pub enum ApiError {
    /// Filesystem failure on a single-item endpoint
    #[error(transparent)]
    Fs(#[from] FsError),

    /// Batch body could not be parsed
    #[error("Malformed batch request: {0}")]
    Parse(#[from] ParseError),

    /// Unknown route or method
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upload body stream failed part way
    #[error("Request body failed: {0}")]
    Body(String),
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Fs(e) => e.kind.status(),
            ApiError::Parse(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Body(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Problem document detail text
    pub fn detail(&self) -> &'static str {
        match self {
            ApiError::Fs(e) => e.kind.detail(),
            ApiError::Parse(_) | ApiError::BadRequest(_) => "Bad Request",
            ApiError::Body(_) => ErrorKind::IoError.detail(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        problem_response(self.status(), self.detail())
    }
}

/// Build a `{"detail": ...}` problem document response
pub fn problem_response(status: StatusCode, detail: &str) -> Response {
    let body = serde_json::json!({ "detail": detail }).to_string();
    (status, [(header::CONTENT_TYPE, PROBLEM_JSON)], body).into_response()
}

/// Result type alias for ApiError
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Result type alias for BucketError
pub type Result<T> = std::result::Result<T, BucketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_classification() {
        assert_eq!(ErrorKind::from_errno(libc::EINVAL), ErrorKind::InvalidArgument);
        assert_eq!(ErrorKind::from_errno(libc::ENOENT), ErrorKind::NotFound);
        assert_eq!(ErrorKind::from_errno(libc::ESRCH), ErrorKind::NotFound);
        assert_eq!(ErrorKind::from_errno(libc::EPERM), ErrorKind::PermissionDenied);
        assert_eq!(ErrorKind::from_errno(libc::EACCES), ErrorKind::PermissionDenied);
        assert_eq!(ErrorKind::from_errno(libc::EISDIR), ErrorKind::IsDirectory);
        assert_eq!(ErrorKind::from_errno(libc::EIO), ErrorKind::IoError);
        assert_eq!(ErrorKind::from_errno(libc::ENOSPC), ErrorKind::IoError);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorKind::InvalidArgument.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::PermissionDenied.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorKind::IsDirectory.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(ErrorKind::IoError.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorKind::IsDirectory.detail(), "Is A Directory");
    }

    #[test]
    fn test_io_error_without_errno() {
        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(ErrorKind::from_io_error(&err), ErrorKind::NotFound);

        let fs_err = FsError::from_io("stat", "/x", &err);
        assert_eq!(fs_err.code, "UNKNOWN");
        assert_eq!(fs_err.errno, None);
    }

    #[test]
    fn test_fs_error_from_os_error() {
        let err = io::Error::from_raw_os_error(libc::ENOENT);
        let fs_err = FsError::from_io("stat", "/tmp/missing", &err);

        assert_eq!(fs_err.code, "ENOENT");
        assert_eq!(fs_err.errno, Some(-libc::ENOENT));
        assert_eq!(fs_err.kind, ErrorKind::NotFound);
        assert!(fs_err.to_string().starts_with("ENOENT: "));

        let json = serde_json::to_value(&fs_err).unwrap();
        assert_eq!(json["code"], "ENOENT");
        assert_eq!(json["syscall"], "stat");
        assert_eq!(json["path"], "/tmp/missing");
        assert_eq!(json["kind"], "NotFound");
    }

    #[test]
    fn test_api_error_status() {
        let err: ApiError = ParseError::PathsNotArray { offset: 10 }.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.detail(), "Bad Request");

        let err: ApiError = FsError::from_io("open", "/d", &io::Error::from_raw_os_error(libc::EISDIR)).into();
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
