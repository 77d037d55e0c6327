//! Configuration types for fs-bucket
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation

use crate::error::ConfigError;
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default listening port
pub const DEFAULT_PORT: u16 = 4000;

/// Default read chunk size for checksums and downloads
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Read chunk size limits
const MIN_CHUNK_SIZE: usize = 512;
const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// HTTP file management server
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fs-bucket",
    version,
    about = "HTTP file management server with streaming batch operations",
    long_about = "Serves download, upload, stat, checksum and delete over HTTP.\n\n\
                  Batch endpoints accept {\"paths\": [...]} and start work on each path\n\
                  while the request body is still arriving.",
    after_help = "EXAMPLES:\n    \
        fs-bucket\n    \
        fs-bucket --bind 127.0.0.1 --port 8080 -v\n    \
        fs-bucket --max-concurrency 64\n\n\
        curl http://localhost:4000/checksum/etc/hostname\n    \
        curl -X POST -d '{\"paths\":[\"/tmp/a\",\"/tmp/b\"]}' http://localhost:4000/metadata"
)]
pub struct CliArgs {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", value_name = "ADDR")]
    pub bind: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT, value_name = "PORT")]
    pub port: u16,

    /// Maximum in-flight operations per batch request (unbounded if not set)
    #[arg(short = 'c', long, value_name = "NUM")]
    pub max_concurrency: Option<usize>,

    /// Read buffer size in bytes for checksums and downloads
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, value_name = "BYTES")]
    pub read_chunk_size: usize,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub listen_addr: SocketAddr,

    /// Per-batch in-flight limit, `None` for one task per path
    pub max_concurrency: Option<usize>,

    /// Read buffer size for checksums and downloads
    pub read_chunk_size: usize,

    /// Verbose logging
    pub verbose: bool,
}

impl ServerConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let ip: IpAddr = args
            .bind
            .trim()
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidBindAddress {
                addr: args.bind.clone(),
                reason: e.to_string(),
            })?;

        let config = Self {
            listen_addr: SocketAddr::new(ip, args.port),
            max_concurrency: args.max_concurrency,
            read_chunk_size: args.read_chunk_size,
            verbose: args.verbose,
        };
        config.validate()?;

        Ok(config)
    }

    /// Check limits on a configuration built by hand
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(limit) = self.max_concurrency {
            if limit == 0 {
                return Err(ConfigError::InvalidConcurrency { value: limit });
            }
        }

        if self.read_chunk_size < MIN_CHUNK_SIZE || self.read_chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::InvalidChunkSize {
                size: self.read_chunk_size,
                min: MIN_CHUNK_SIZE,
                max: MAX_CHUNK_SIZE,
            });
        }

        Ok(())
    }

    /// Set the listen address
    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    /// Bound the number of in-flight operations per batch
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    /// Set the read buffer size
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }
}

impl Default for ServerConfig {
    /// Loopback on an ephemeral port, unbounded fan-out
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            max_concurrency: None,
            read_chunk_size: DEFAULT_CHUNK_SIZE,
            verbose: false,
        }
    }
}
