// Bootstrap - One-time startup reconciliation of a peer node
//
// Sequence, each step its own failure domain:
// 1. register with the primary (if configured) and merge its registry
// 2. fetch the unminted and minted collections from a random peer
// 3. fetch a checksum for each collection, each from its own random peer
// 4. commit each merged collection only if it matches its checksum
//
// Network failures degrade to "nothing from this peer". Only storage
// failures abort the run.
//
// The checksum peer is chosen independently of the data peer, so a match
// only means two peers agree on the key set at different moments. It is not
// evidence that the data peer is honest.

use crate::ledger::{Checksum, CoinCollection, CoinKind};
use crate::node::NodeState;
use crate::storage::StoreError;
use crate::sync::peer::{PeerAddress, PeerRegistry};
use crate::sync::protocol::{Registration, Request, Response};
use crate::transport::{TcpClient, TransportError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Fatal bootstrap errors
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Storage failure during bootstrap: {0}")]
    Store(#[from] StoreError),
}

/// What happened to one coin collection
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectionOutcome {
    /// Merged, validated and persisted
    Committed { added: usize, total: usize },
    /// Merged set did not match the fetched checksum; prior state kept
    Rejected { expected: Checksum, actual: Checksum },
    /// No checksum could be obtained; prior state kept
    NoChecksum,
}

impl CollectionOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Summary of a bootstrap run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapReport {
    /// The primary acknowledged our registration
    pub registered: bool,
    /// Node ids learned from the primary that were not known before
    pub peers_discovered: usize,
    pub unminted: CollectionOutcome,
    pub minted: CollectionOutcome,
}

impl BootstrapReport {
    pub fn outcome(&self, kind: CoinKind) -> &CollectionOutcome {
        match kind {
            CoinKind::Unminted => &self.unminted,
            CoinKind::Minted => &self.minted,
        }
    }
}

/// Identity a node announces and the primary it bootstraps against
#[derive(Clone, Debug)]
pub struct BootstrapConfig {
    pub node_id: String,
    pub host: String,
    pub port: u16,
    pub primary: Option<PeerAddress>,
}

/// Runs the startup sequence against shared node state
pub struct BootstrapCoordinator {
    config: BootstrapConfig,
    client: TcpClient,
    state: Arc<NodeState>,
}

impl BootstrapCoordinator {
    pub fn new(config: BootstrapConfig, client: TcpClient, state: Arc<NodeState>) -> Self {
        Self {
            config,
            client,
            state,
        }
    }

    /// Run every step once and report the result
    pub async fn run(&self) -> Result<BootstrapReport, BootstrapError> {
        let (registered, peers_discovered) = match &self.config.primary {
            Some(primary) => {
                let registered = self.register_with_primary(primary).await;
                let discovered = self.discover_from_primary(primary).await?;
                (registered, discovered)
            }
            None => {
                info!("No primary configured, skipping registration");
                (false, 0)
            }
        };

        let fetched_unminted = self.fetch_coins(CoinKind::Unminted).await;
        let fetched_minted = self.fetch_coins(CoinKind::Minted).await;

        let checksum_unminted = self.fetch_checksum().await;
        let checksum_minted = self.fetch_checksum().await;

        let unminted = self
            .commit(CoinKind::Unminted, &fetched_unminted, checksum_unminted)
            .await?;
        let minted = self
            .commit(CoinKind::Minted, &fetched_minted, checksum_minted)
            .await?;

        Ok(BootstrapReport {
            registered,
            peers_discovered,
            unminted,
            minted,
        })
    }

    /// Announce `(id, host, port)` to the primary
    async fn register_with_primary(&self, primary: &PeerAddress) -> bool {
        let registration = Registration::new(&self.config.node_id, &self.config.host, self.config.port);
        let result = self
            .client
            .request(primary, &Request::Register(registration))
            .await
            .and_then(|body| Response::decode_registration(&body).map_err(TransportError::from));

        match result {
            Ok(()) => {
                info!(%primary, node_id = %self.config.node_id, "Registered with primary");
                true
            }
            Err(e) => {
                warn!(%primary, error = %e, "Registration with primary failed");
                false
            }
        }
    }

    /// Fetch the primary's registry and merge it into ours
    async fn discover_from_primary(&self, primary: &PeerAddress) -> Result<usize, StoreError> {
        let result = self
            .client
            .request(primary, &Request::RequestNodes)
            .await
            .and_then(|body| Response::decode_nodes(&body).map_err(TransportError::from));

        let incoming = match result {
            Ok(registry) => registry,
            Err(e) => {
                warn!(%primary, error = %e, "Failed to fetch nodes from primary");
                PeerRegistry::new()
            }
        };

        let added = self.state.merge_registry(&incoming).await?;
        info!(received = incoming.peer_count(), added, "Merged peer registry from primary");
        Ok(added)
    }

    /// Fetch one collection from a randomly chosen peer; empty on any failure
    async fn fetch_coins(&self, kind: CoinKind) -> CoinCollection {
        let Some((peer_id, address)) = self.state.random_peer_except(&self.config.node_id).await else {
            warn!(%kind, "No peers available to fetch coins from");
            return CoinCollection::new();
        };

        let result = self
            .client
            .request(&address, &Request::coins(kind))
            .await
            .and_then(|body| Response::decode_coins(&body).map_err(TransportError::from));

        match result {
            Ok(coins) => {
                info!(%kind, peer = %peer_id, keys = coins.len(), "Fetched coins");
                coins
            }
            Err(e) => {
                warn!(%kind, peer = %peer_id, %address, error = %e, "Failed to fetch coins");
                CoinCollection::new()
            }
        }
    }

    /// Fetch a checksum from a randomly chosen peer
    async fn fetch_checksum(&self) -> Option<Checksum> {
        let Some((peer_id, address)) = self.state.random_peer_except(&self.config.node_id).await else {
            warn!("No peers available to fetch a checksum from");
            return None;
        };

        let result = self
            .client
            .request(&address, &Request::RequestChecksum)
            .await
            .and_then(|body| Response::decode_checksum(&body).map_err(TransportError::from));

        match result {
            Ok(checksum) => {
                info!(peer = %peer_id, %checksum, "Fetched checksum");
                Some(checksum)
            }
            Err(e) => {
                warn!(peer = %peer_id, %address, error = %e, "Failed to fetch checksum");
                None
            }
        }
    }

    async fn commit(
        &self,
        kind: CoinKind,
        fetched: &CoinCollection,
        checksum: Option<Checksum>,
    ) -> Result<CollectionOutcome, StoreError> {
        let outcome = self
            .state
            .commit_validated(kind, fetched, checksum.as_ref())
            .await?;

        match &outcome {
            CollectionOutcome::Committed { added, total } => {
                info!(%kind, added, total, "Checksum valid, stored coins updated")
            }
            CollectionOutcome::Rejected { expected, actual } => {
                warn!(%kind, %expected, %actual, "Checksum mismatch, keeping stored coins")
            }
            CollectionOutcome::NoChecksum => {
                warn!(%kind, "No checksum obtained, keeping stored coins")
            }
        }

        Ok(outcome)
    }
}
