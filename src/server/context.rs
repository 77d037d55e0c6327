//! Server lifecycle
//!
//! `ServerContext` owns the configuration and handler state. `start` binds
//! the listener and spawns the accept loop, returning a `RunningServer`
//! handle that reports the bound address and stops the server gracefully.

use crate::config::ServerConfig;
use crate::error::{BucketError, Result};
use crate::server::routes::{build_router, AppState};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

/// Configured, not yet listening server
pub struct ServerContext {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl ServerContext {
    /// Validate the configuration and build handler state
    pub fn new(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let state = Arc::new(AppState::from_config(&config));
        Ok(Self { config, state })
    }

    /// The configuration this server was built from
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Router over this context's state, for embedding or in-process tests
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.state))
    }

    /// Bind the listener and start serving in the background
    pub async fn start(self) -> Result<RunningServer> {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        let local_addr = listener.local_addr()?;
        let router = self.router();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!(
            addr = %local_addr,
            max_concurrency = ?self.config.max_concurrency,
            chunk_size = self.config.read_chunk_size,
            "File server listening"
        );

        Ok(RunningServer {
            local_addr,
            shutdown: shutdown_tx,
            task,
        })
    }
}

/// Handle to a listening server
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections, let in-flight requests finish, and wait
    pub async fn stop(self) -> Result<()> {
        info!(addr = %self.local_addr, "Shutting down");
        // The receiver is gone only if the serve loop already exited
        let _ = self.shutdown.send(());

        match self.task.await {
            Ok(result) => result.map_err(BucketError::Io),
            Err(e) => Err(BucketError::ServerTask(e.to_string())),
        }
    }
}
