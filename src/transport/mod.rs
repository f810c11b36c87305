// Transport module - THE WIRE
// TCP listener and client for the one-request-per-connection protocol

mod tcp;
mod traits;

pub use traits::{RequestHandler, TransportConfig, TransportError, TransportStats};

pub use tcp::{ServerHandle, TcpClient, TcpServer, TcpTransportConfig};
