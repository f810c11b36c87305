// Node State - Registry and coin collections shared by the listener and
// the bootstrap task
//
// Every collection sits behind its own lock. A mutation and the save that
// follows it happen while the write lock is held, so a registration can
// never interleave with a bootstrap merge of the same collection.

use crate::ledger::{Checksum, ChecksumValidator, CoinCollection, CoinKind};
use crate::storage::{Collection, Store, StoreError, StoreExt};
use crate::sync::{CollectionOutcome, PeerAddress, PeerRegistry};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

fn collection_of(kind: CoinKind) -> Collection {
    match kind {
        CoinKind::Unminted => Collection::UnmintedCoins,
        CoinKind::Minted => Collection::MintedCoins,
    }
}

/// In-memory node state backed by a [`Store`]
pub struct NodeState {
    registry: RwLock<PeerRegistry>,
    unminted: RwLock<CoinCollection>,
    minted: RwLock<CoinCollection>,
    store: Arc<dyn Store>,
}

impl NodeState {
    /// Load the registry and both coin collections; absent ones start empty
    pub fn load(store: Arc<dyn Store>) -> Result<Self, StoreError> {
        let registry: PeerRegistry = store.load(Collection::Nodes)?;
        let unminted: CoinCollection = store.load(Collection::UnmintedCoins)?;
        let minted: CoinCollection = store.load(Collection::MintedCoins)?;

        debug!(
            peers = registry.peer_count(),
            unminted = unminted.len(),
            minted = minted.len(),
            "Loaded persisted state"
        );

        Ok(Self {
            registry: RwLock::new(registry),
            unminted: RwLock::new(unminted),
            minted: RwLock::new(minted),
            store,
        })
    }

    fn coins_lock(&self, kind: CoinKind) -> &RwLock<CoinCollection> {
        match kind {
            CoinKind::Unminted => &self.unminted,
            CoinKind::Minted => &self.minted,
        }
    }

    // ========================================================================
    // PEER REGISTRY
    // ========================================================================

    /// Copy of the current registry
    pub async fn registry(&self) -> PeerRegistry {
        self.registry.read().await.clone()
    }

    /// Register or re-register a node and persist the registry
    pub async fn register(&self, id: &str, host: &str, port: u16) -> Result<(), StoreError> {
        let mut registry = self.registry.write().await;
        registry.register(id, host, port);
        self.store.save(Collection::Nodes, &*registry)
    }

    /// Merge a fetched registry and persist the result.
    ///
    /// Returns the number of newly learned node ids.
    pub async fn merge_registry(&self, incoming: &PeerRegistry) -> Result<usize, StoreError> {
        let mut registry = self.registry.write().await;
        let added = registry.merge(incoming);
        self.store.save(Collection::Nodes, &*registry)?;
        Ok(added)
    }

    /// Uniformly pick a peer other than `exclude`
    pub async fn random_peer_except(&self, exclude: &str) -> Option<(String, PeerAddress)> {
        self.registry.read().await.random_peer_except(exclude)
    }

    // ========================================================================
    // COIN COLLECTIONS
    // ========================================================================

    /// Copy of one coin collection
    pub async fn coins(&self, kind: CoinKind) -> CoinCollection {
        self.coins_lock(kind).read().await.clone()
    }

    /// The digest served for `request_checksum`: unminted keys then minted keys
    pub async fn checksum(&self) -> Checksum {
        let unminted = self.unminted.read().await;
        let minted = self.minted.read().await;
        ChecksumValidator::combined_fingerprint(&unminted, &minted)
    }

    /// Merge `fetched` into a private copy of the collection and commit it
    /// only if the result matches `expected`.
    ///
    /// A missing checksum or a mismatch leaves both the in-memory and the
    /// persisted collection untouched.
    pub async fn commit_validated(
        &self,
        kind: CoinKind,
        fetched: &CoinCollection,
        expected: Option<&Checksum>,
    ) -> Result<CollectionOutcome, StoreError> {
        let mut current = self.coins_lock(kind).write().await;

        let Some(expected) = expected else {
            return Ok(CollectionOutcome::NoChecksum);
        };

        let mut candidate = current.clone();
        let added = candidate.merge(fetched);

        if !ChecksumValidator::validate(&candidate, expected) {
            return Ok(CollectionOutcome::Rejected {
                expected: expected.clone(),
                actual: ChecksumValidator::fingerprint(&candidate),
            });
        }

        self.store.save(collection_of(kind), &candidate)?;
        let total = candidate.len();
        *current = candidate;

        Ok(CollectionOutcome::Committed { added, total })
    }

    /// Merge records into a collection unconditionally and persist it.
    ///
    /// Used for local imports, not for data fetched from peers.
    pub async fn import_coins(
        &self,
        kind: CoinKind,
        incoming: &CoinCollection,
    ) -> Result<usize, StoreError> {
        let mut current = self.coins_lock(kind).write().await;
        let added = current.merge(incoming);
        self.store.save(collection_of(kind), &*current)?;
        Ok(added)
    }
}
