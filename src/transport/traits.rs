// Transport Traits and Core Types
// Configuration, errors, statistics and the handler seam shared by the TCP
// server and client

use crate::sync::{ProtocolError, Request, Response, DEFAULT_MAX_FRAME_BYTES};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// TRANSPORT CONFIG
// ============================================================================

/// Limits applied to every connection, inbound or outbound
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Maximum number of inbound connections served at once
    pub max_connections: u32,
    /// Timeout for establishing an outbound connection
    pub connect_timeout_ms: u64,
    /// Timeout for one request/response exchange once connected
    pub io_timeout_ms: u64,
    /// Upper bound on a request line or a response body
    pub max_frame_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_connections: 100,
            connect_timeout_ms: 5_000,
            io_timeout_ms: 10_000,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    pub fn with_io_timeout_ms(mut self, ms: u64) -> Self {
        self.io_timeout_ms = ms;
        self
    }

    pub fn with_max_frame_bytes(mut self, bytes: usize) -> Self {
        self.max_frame_bytes = bytes;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.max_connections == 0 {
            return Err(TransportError::InvalidConfig("max_connections cannot be 0".to_string()));
        }
        if self.max_frame_bytes == 0 {
            return Err(TransportError::InvalidConfig("max_frame_bytes cannot be 0".to_string()));
        }
        if self.connect_timeout_ms == 0 || self.io_timeout_ms == 0 {
            return Err(TransportError::InvalidConfig("timeouts cannot be 0".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// TRANSPORT ERRORS
// ============================================================================

/// Errors that can occur in the transport layer
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Bind failed: {0}")]
    BindFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl TransportError {
    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Check if this is a connection-related error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_) | Self::Timeout)
    }
}

// ============================================================================
// TRANSPORT STATISTICS
// ============================================================================

/// Counters for a running server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportStats {
    /// Connections accepted since start
    pub connections_total: u64,
    /// Requests that produced a response
    pub responses_sent: u64,
    /// Requests closed without a response
    pub requests_dropped: u64,
    /// Total bytes read from clients
    pub bytes_received: u64,
    /// Total bytes written to clients
    pub bytes_sent: u64,
}

// ============================================================================
// REQUEST HANDLER
// ============================================================================

/// Answers one decoded request; `None` closes the connection without a reply
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    async fn handle(&self, request: Request, remote: SocketAddr) -> Option<Response>;
}
