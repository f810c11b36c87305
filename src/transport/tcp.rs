// TCP Transport Implementation
// One request per connection: accept, read one line, dispatch, write one
// response, close. The client side opens a fresh connection per round-trip.

use crate::sync::{read_request, read_response, PeerAddress, ProtocolError, Request};
use crate::transport::{RequestHandler, TransportConfig, TransportError, TransportStats};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

// ============================================================================
// TCP TRANSPORT CONFIG
// ============================================================================

/// Configuration for the TCP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpTransportConfig {
    /// Base transport configuration
    pub base: TransportConfig,
    /// Address to bind to
    pub bind_address: String,
    /// Port to bind to (0 for random)
    pub bind_port: u16,
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            base: TransportConfig::default(),
            bind_address: "0.0.0.0".to_string(),
            bind_port: 0,
        }
    }
}

impl TcpTransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_config(mut self, base: TransportConfig) -> Self {
        self.base = base;
        self
    }

    pub fn with_bind_address(mut self, addr: &str) -> Self {
        self.bind_address = addr.to_string();
        self
    }

    pub fn with_bind_port(mut self, port: u16) -> Self {
        self.bind_port = port;
        self
    }
}

// ============================================================================
// SERVER
// ============================================================================

#[derive(Default)]
struct Counters {
    connections_total: AtomicU64,
    responses_sent: AtomicU64,
    requests_dropped: AtomicU64,
    bytes_received: AtomicU64,
    bytes_sent: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> TransportStats {
        TransportStats {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            responses_sent: self.responses_sent.load(Ordering::Relaxed),
            requests_dropped: self.requests_dropped.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }
}

/// A bound listener that dispatches every connection to a [`RequestHandler`]
pub struct TcpServer {
    config: TransportConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    handler: Arc<dyn RequestHandler>,
    counters: Arc<Counters>,
}

impl TcpServer {
    /// Bind the listener. Connections are not accepted until [`TcpServer::spawn`].
    pub async fn bind(
        config: TcpTransportConfig,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<Self, TransportError> {
        config.base.validate()?;

        let bind_addr = format!("{}:{}", config.bind_address, config.bind_port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| TransportError::BindFailed(format!("{}: {}", bind_addr, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| TransportError::BindFailed(e.to_string()))?;

        Ok(Self {
            config: config.base,
            listener,
            local_addr,
            handler,
            counters: Arc::new(Counters::default()),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Run the accept loop on a background task
    pub fn spawn(self) -> ServerHandle {
        let local_addr = self.local_addr;
        let counters = self.counters.clone();
        let task = tokio::spawn(self.run());
        ServerHandle {
            local_addr,
            counters,
            task,
        }
    }

    /// Accept connections until the listener fails
    pub async fn run(self) {
        info!(addr = %self.local_addr, "Listening for incoming connections");
        let permits = Arc::new(Semaphore::new(self.config.max_connections as usize));

        loop {
            let permit = match permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            match self.listener.accept().await {
                Ok((stream, remote)) => {
                    debug!(%remote, "Connection accepted");
                    self.counters.connections_total.fetch_add(1, Ordering::Relaxed);

                    let handler = self.handler.clone();
                    let counters = self.counters.clone();
                    let config = self.config.clone();
                    tokio::spawn(async move {
                        serve_connection(stream, remote, handler, &config, &counters).await;
                        drop(permit);
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Accept failed, stopping listener");
                    break;
                }
            }
        }
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    remote: SocketAddr,
    handler: Arc<dyn RequestHandler>,
    config: &TransportConfig,
    counters: &Counters,
) {
    let (reader, mut writer) = stream.split();

    let line = match timeout(config.io_timeout(), read_request(reader, config.max_frame_bytes)).await {
        Ok(Ok(line)) => line,
        Ok(Err(ProtocolError::FrameTooLarge { limit })) => {
            warn!(%remote, limit, "Request exceeds frame limit, closing");
            counters.requests_dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        Ok(Err(e)) => {
            warn!(%remote, error = %e, "Failed to read request");
            counters.requests_dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        Err(_) => {
            debug!(%remote, "Timed out waiting for request");
            counters.requests_dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };
    counters
        .bytes_received
        .fetch_add(line.len() as u64, Ordering::Relaxed);

    let request = Request::decode(&line);
    let Some(response) = handler.handle(request, remote).await else {
        counters.requests_dropped.fetch_add(1, Ordering::Relaxed);
        return;
    };

    let bytes = response.encode();
    let written = timeout(config.io_timeout(), async {
        writer.write_all(&bytes).await?;
        writer.shutdown().await
    })
    .await;

    match written {
        Ok(Ok(())) => {
            counters.responses_sent.fetch_add(1, Ordering::Relaxed);
            counters
                .bytes_sent
                .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        }
        Ok(Err(e)) => warn!(%remote, error = %e, "Failed to write response"),
        Err(_) => warn!(%remote, "Timed out writing response"),
    }
}

/// Handle to a server running in the background
pub struct ServerHandle {
    local_addr: SocketAddr,
    counters: Arc<Counters>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> TransportStats {
        self.counters.snapshot()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop accepting connections. In-flight exchanges run to completion.
    pub fn shutdown(&self) {
        self.task.abort();
    }

    /// Wait for the accept loop to end
    pub async fn join(self) {
        match self.task.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => debug!(addr = %self.local_addr, "Listener stopped"),
            Err(e) => warn!(addr = %self.local_addr, error = %e, "Listener task failed"),
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

/// Opens one connection per request, bounded by the configured timeouts
#[derive(Debug, Clone, Default)]
pub struct TcpClient {
    config: TransportConfig,
}

impl TcpClient {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Send `request` to `address` and return the raw response body
    pub async fn request(
        &self,
        address: &PeerAddress,
        request: &Request,
    ) -> Result<Vec<u8>, TransportError> {
        let addr_str = address.to_string();
        let mut stream = timeout(self.config.connect_timeout(), TcpStream::connect(&addr_str))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::ConnectionFailed(format!("{}: {}", addr_str, e)))?;

        let mut line = request.encode();
        line.push('\n');
        let max_frame_bytes = self.config.max_frame_bytes;

        timeout(self.config.io_timeout(), async {
            stream
                .write_all(line.as_bytes())
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;
            let body = read_response(&mut stream, max_frame_bytes)
                .await
                .map_err(|e| match e {
                    ProtocolError::Io(e) => TransportError::ReceiveFailed(e.to_string()),
                    other => TransportError::Protocol(other),
                })?;
            Ok::<_, TransportError>(body)
        })
        .await
        .map_err(|_| TransportError::Timeout)?
    }
}
