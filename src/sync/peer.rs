// Peer Management - Node id to address registry
//
// The primary keeps the authoritative registry; peers keep a merged copy
// and sample it uniformly when picking whom to sync from.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Network address of a node
///
/// Serialized as a two-element `[host, port]` array.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(String, u16)", into = "(String, u16)")]
pub struct PeerAddress {
    host: String,
    port: u16,
}

impl PeerAddress {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.trim().to_string(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl From<(String, u16)> for PeerAddress {
    fn from((host, port): (String, u16)) -> Self {
        Self::new(&host, port)
    }
}

impl From<PeerAddress> for (String, u16) {
    fn from(addr: PeerAddress) -> Self {
        (addr.host, addr.port)
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Registry of known nodes, one address per node id
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerRegistry {
    peers: BTreeMap<String, PeerAddress>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn has_peer(&self, id: &str) -> bool {
        self.peers.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&PeerAddress> {
        self.peers.get(id)
    }

    /// Insert or overwrite the entry for `id`. Any parsed triple is stored,
    /// including an empty id or port 0.
    pub fn register(&mut self, id: &str, host: &str, port: u16) {
        self.peers.insert(id.to_string(), PeerAddress::new(host, port));
    }

    /// The full id to address mapping
    pub fn all(&self) -> &BTreeMap<String, PeerAddress> {
        &self.peers
    }

    /// Union `incoming` into this registry; incoming entries win on collision.
    ///
    /// Returns the number of ids that were not known before.
    pub fn merge(&mut self, incoming: &PeerRegistry) -> usize {
        let mut added = 0;
        for (id, addr) in &incoming.peers {
            if self.peers.insert(id.clone(), addr.clone()).is_none() {
                added += 1;
            }
        }
        added
    }

    /// Uniformly pick one entry, or `None` if the registry is empty
    pub fn random_peer(&self) -> Option<(String, PeerAddress)> {
        self.sample(|_| true)
    }

    /// Uniformly pick one entry other than `exclude`
    pub fn random_peer_except(&self, exclude: &str) -> Option<(String, PeerAddress)> {
        self.sample(|id| id != exclude)
    }

    fn sample(&self, keep: impl Fn(&str) -> bool) -> Option<(String, PeerAddress)> {
        // Snapshot the candidates before sampling
        let candidates: Vec<(&String, &PeerAddress)> =
            self.peers.iter().filter(|(id, _)| keep(id)).collect();
        candidates
            .choose(&mut rand::thread_rng())
            .map(|(id, addr)| ((*id).clone(), (*addr).clone()))
    }
}

impl FromIterator<(String, PeerAddress)> for PeerRegistry {
    fn from_iter<I: IntoIterator<Item = (String, PeerAddress)>>(iter: I) -> Self {
        Self {
            peers: iter.into_iter().collect(),
        }
    }
}
