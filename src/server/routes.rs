//! Axum HTTP routes for the file API.

use crate::batch::{path_stream, BatchCoordinator, BatchResponse, Operation, OperationExecutor};
use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult, FsError};
use crate::localfs::normalize_request_path;
use axum::body::Body;
use axum::extract::rejection::PathRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{StreamExt, TryStreamExt};
use std::io;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Shared application state
pub struct AppState {
    pub executor: OperationExecutor,
    pub coordinator: BatchCoordinator,
    pub read_chunk_size: usize,
}

impl AppState {
    /// Build handler state from a validated configuration
    pub fn from_config(config: &ServerConfig) -> Self {
        let executor = OperationExecutor::new(config.read_chunk_size);
        let coordinator = BatchCoordinator::new(executor.clone(), config.max_concurrency);

        Self {
            executor,
            coordinator,
            read_chunk_size: config.read_chunk_size,
        }
    }
}

// ─── Route builder ───────────────────────────────────────────────

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/files/*path",
            get(download).put(upload).delete(delete_file).fallback(bad_request),
        )
        .route("/metadata/*path", get(metadata).fallback(bad_request))
        .route("/checksum/*path", get(checksum).fallback(bad_request))
        .route("/metadata", post(batch_metadata).fallback(bad_request))
        .route("/checksum", post(batch_checksum).fallback(bad_request))
        .route("/delete", post(batch_delete).fallback(bad_request))
        .fallback(bad_request)
        // Uploads and batch bodies are streamed and have no size cap
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn request_path(path: Result<Path<String>, PathRejection>) -> ApiResult<String> {
    let Path(raw) = path.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(normalize_request_path(&raw))
}

// ─── Single-file handlers ────────────────────────────────────────

async fn download(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Response> {
    let path = request_path(path)?;
    info!(path = %path, "download");

    let file = File::open(&path)
        .await
        .map_err(|e| FsError::from_io("open", &path, &e))?;
    let meta = file
        .metadata()
        .await
        .map_err(|e| FsError::from_io("fstat", &path, &e))?;

    // Opening a directory succeeds; reading it would fail after the 200
    if meta.is_dir() {
        let err = io::Error::from_raw_os_error(libc::EISDIR);
        return Err(FsError::from_io("read", &path, &err).into());
    }

    let log_path = path.clone();
    let stream = ReaderStream::with_capacity(file, state.read_chunk_size).inspect_err(move |e| {
        warn!(path = %log_path, error = %e, "Download aborted mid-stream");
    });

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        Body::from_stream(stream),
    )
        .into_response())
}

async fn upload(path: Result<Path<String>, PathRejection>, body: Body) -> ApiResult<StatusCode> {
    let path = request_path(path)?;
    info!(path = %path, "upload");

    let mut file = File::create(&path)
        .await
        .map_err(|e| FsError::from_io("open", &path, &e))?;

    let mut chunks = body.into_data_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(|e| {
            warn!(path = %path, written = written, error = %e, "Upload body failed");
            ApiError::Body(e.to_string())
        })?;

        file.write_all(&chunk)
            .await
            .map_err(|e| FsError::from_io("write", &path, &e))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| FsError::from_io("write", &path, &e))?;

    debug!(path = %path, bytes = written, "Upload complete");
    Ok(StatusCode::OK)
}

async fn metadata(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let path = request_path(path)?;
    info!(path = %path, "metadata");

    let stat = state.executor.stat(&path).await?;
    Ok(Json(stat))
}

async fn checksum(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let path = request_path(path)?;
    info!(path = %path, "checksum");

    let digest = state.executor.checksum(&path).await?;
    Ok(Json(serde_json::json!({
        "filename": path,
        "SHA256": digest,
    })))
}

async fn delete_file(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let path = request_path(path)?;
    info!(path = %path, "delete");

    let stat = state.executor.delete(&path).await?;
    Ok(Json(stat))
}

// ─── Batch handlers ──────────────────────────────────────────────

async fn run_batch(state: &AppState, body: Body, op: Operation) -> BatchResponse {
    info!(op = op.name(), "batch");

    let tokens = path_stream(body.into_data_stream());
    state.coordinator.run(tokens, op).await.into()
}

async fn batch_metadata(State(state): State<Arc<AppState>>, body: Body) -> BatchResponse {
    run_batch(&state, body, Operation::Metadata).await
}

async fn batch_checksum(State(state): State<Arc<AppState>>, body: Body) -> BatchResponse {
    run_batch(&state, body, Operation::Checksum).await
}

async fn batch_delete(State(state): State<Arc<AppState>>, body: Body) -> BatchResponse {
    run_batch(&state, body, Operation::Delete).await
}

// ─── Fallback ────────────────────────────────────────────────────

async fn bad_request(method: Method, uri: Uri) -> ApiError {
    debug!(method = %method, uri = %uri, "No route");
    ApiError::BadRequest(format!("{} {}", method, uri))
}
