// Node module - PROCESS LIFECYCLE
// Loads state, runs bootstrap for peers, and serves requests

mod dispatcher;
mod state;

pub use dispatcher::{PeerHandler, PrimaryHandler};
pub use state::NodeState;

use crate::config::{ConfigError, NodeConfig};
use crate::ledger::{CoinFileError, CoinKind, CoinFile};
use crate::storage::{open_store, StoreError};
use crate::sync::{BootstrapConfig, BootstrapCoordinator, BootstrapError, BootstrapReport};
use crate::transport::{
    RequestHandler, ServerHandle, TcpClient, TcpServer, TcpTransportConfig, TransportError,
    TransportStats,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors that stop a node from starting
#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    CoinFile(#[from] CoinFileError),
}

/// A node whose listener is accepting connections
pub struct RunningNode {
    state: Arc<NodeState>,
    server: ServerHandle,
}

impl RunningNode {
    pub fn state(&self) -> &Arc<NodeState> {
        &self.state
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    pub fn stats(&self) -> TransportStats {
        self.server.stats()
    }

    pub fn shutdown(self) {
        self.server.shutdown();
    }

    /// Serve until the listener stops
    pub async fn join(self) {
        self.server.join().await;
    }
}

fn load_state(config: &NodeConfig) -> Result<Arc<NodeState>, NodeError> {
    config.validate()?;
    let store = open_store(config.storage, &config.data_dir)?;
    Ok(Arc::new(NodeState::load(store)?))
}

async fn bind_listener(
    config: &NodeConfig,
    handler: Arc<dyn RequestHandler>,
) -> Result<TcpServer, NodeError> {
    let tcp_config = TcpTransportConfig::new()
        .with_base_config(config.transport.clone())
        .with_bind_address(&config.bind_address)
        .with_bind_port(config.port);
    Ok(TcpServer::bind(tcp_config, handler).await?)
}

/// The registry node peers register with
pub struct PrimaryNode;

impl PrimaryNode {
    /// Load the persisted registry and start answering requests
    pub async fn start(config: &NodeConfig) -> Result<RunningNode, NodeError> {
        let state = load_state(config)?;
        let server = bind_listener(config, Arc::new(PrimaryHandler::new(state.clone())))
            .await?
            .spawn();
        info!(addr = %server.local_addr(), "Primary node started");
        Ok(RunningNode { state, server })
    }
}

/// A node holding coin collections
pub struct PeerNode;

impl PeerNode {
    /// Load state, bind the listener, bootstrap, then start accepting.
    ///
    /// The port is bound before registering with the primary, so a node that
    /// cannot listen never announces itself. Rejected collections are
    /// reported, not fatal; the listener starts either way.
    pub async fn start(config: &NodeConfig) -> Result<(RunningNode, BootstrapReport), NodeError> {
        let state = load_state(config)?;
        let listener = bind_listener(config, Arc::new(PeerHandler::new(state.clone()))).await?;

        let bootstrap = BootstrapCoordinator::new(
            BootstrapConfig {
                node_id: config.node_id(),
                host: config.host.clone(),
                port: config.port,
                primary: config.primary_address()?,
            },
            TcpClient::new(config.transport.clone()),
            state.clone(),
        );
        let report = bootstrap.run().await?;

        let server = listener.spawn();
        info!(
            addr = %server.local_addr(),
            node_id = %config.node_id(),
            "Peer node started"
        );

        Ok((RunningNode { state, server }, report))
    }

    /// Deposit the unminted records of a wallet coin file into the node's
    /// persisted unminted collection. Returns the number of new coins.
    pub async fn import_coin_file(config: &NodeConfig, path: &Path) -> Result<usize, NodeError> {
        let state = load_state(config)?;
        let file = CoinFile::load(path)?;
        let incoming = file.to_unminted_collection();
        let added = state.import_coins(CoinKind::Unminted, &incoming).await?;
        info!(
            file = %path.display(),
            records = file.len(),
            unminted = incoming.len(),
            added,
            "Imported coin file"
        );
        Ok(added)
    }
}
