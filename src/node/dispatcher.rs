// Dispatcher - Request handlers for the primary registry and peer nodes
//
// | Request                 | Primary            | Peer              |
// |-------------------------|--------------------|-------------------|
// | request_nodes           | registry           | registry          |
// | request_*_coins         | -                  | coin collection   |
// | request_checksum        | -                  | combined digest   |
// | [id, host, port]        | ack / failure text | -                 |
//
// "-" closes the connection without a response.

use crate::ledger::CoinKind;
use crate::node::NodeState;
use crate::sync::{Request, Response};
use crate::transport::RequestHandler;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Handler for the primary registry node
pub struct PrimaryHandler {
    state: Arc<NodeState>,
}

impl PrimaryHandler {
    pub fn new(state: Arc<NodeState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl RequestHandler for PrimaryHandler {
    async fn handle(&self, request: Request, remote: SocketAddr) -> Option<Response> {
        match request {
            Request::RequestNodes => Some(Response::Nodes(self.state.registry().await)),
            Request::Register(registration) => {
                match self
                    .state
                    .register(&registration.node_id, &registration.host, registration.port)
                    .await
                {
                    Ok(()) => {
                        info!(
                            node_id = %registration.node_id,
                            host = %registration.host,
                            port = registration.port,
                            "Registered new node"
                        );
                        Some(Response::Registered)
                    }
                    Err(e) => {
                        error!(%remote, error = %e, "Error registering node");
                        Some(Response::RegistrationFailed)
                    }
                }
            }
            Request::MalformedRegistration(text) => {
                warn!(%remote, payload = %text, "Malformed registration");
                Some(Response::RegistrationFailed)
            }
            Request::RequestUnmintedCoins | Request::RequestMintedCoins | Request::RequestChecksum => {
                warn!(%remote, request = %request.encode(), "Coin request sent to primary, closing");
                None
            }
            Request::Unknown(text) => {
                warn!(%remote, payload = %text, "Received unknown request");
                None
            }
        }
    }
}

/// Handler for peer nodes
pub struct PeerHandler {
    state: Arc<NodeState>,
}

impl PeerHandler {
    pub fn new(state: Arc<NodeState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl RequestHandler for PeerHandler {
    async fn handle(&self, request: Request, remote: SocketAddr) -> Option<Response> {
        match request {
            Request::RequestNodes => Some(Response::Nodes(self.state.registry().await)),
            Request::RequestUnmintedCoins => {
                Some(Response::Coins(self.state.coins(CoinKind::Unminted).await))
            }
            Request::RequestMintedCoins => {
                Some(Response::Coins(self.state.coins(CoinKind::Minted).await))
            }
            Request::RequestChecksum => Some(Response::Checksum(self.state.checksum().await)),
            Request::Register(_) | Request::MalformedRegistration(_) | Request::Unknown(_) => {
                warn!(%remote, payload = %request.encode(), "Received unknown request");
                None
            }
        }
    }
}
