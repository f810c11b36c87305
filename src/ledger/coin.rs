// Coins - Records and the keyed collections that hold them
//
// A node keeps two collections: unminted and minted. Record payloads are
// opaque JSON; only the wallet looks inside them (for the `unminted` marker).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field whose presence marks a record as unminted in wallet coin files
pub const UNMINTED_MARKER: &str = "unminted";

/// Which of the two per-node collections a coin lives in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoinKind {
    Unminted,
    Minted,
}

impl CoinKind {
    /// Both kinds, in the order bootstrap processes them
    pub const ALL: [CoinKind; 2] = [CoinKind::Unminted, CoinKind::Minted];

    pub fn as_str(&self) -> &'static str {
        match self {
            CoinKind::Unminted => "unminted",
            CoinKind::Minted => "minted",
        }
    }
}

impl fmt::Display for CoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single coin record with an implementation-defined payload
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoinRecord(serde_json::Value);

impl CoinRecord {
    pub fn new(payload: serde_json::Value) -> Self {
        Self(payload)
    }

    /// Get the raw payload
    pub fn payload(&self) -> &serde_json::Value {
        &self.0
    }

    /// True if the payload is an object carrying the unminted marker field
    pub fn is_unminted(&self) -> bool {
        self.0
            .as_object()
            .map(|obj| obj.contains_key(UNMINTED_MARKER))
            .unwrap_or(false)
    }

    /// The record's own `id` field, if it has a string one
    pub fn embedded_id(&self) -> Option<&str> {
        self.0.get("id").and_then(|v| v.as_str())
    }
}

impl From<serde_json::Value> for CoinRecord {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Mapping from coin identifier to record
///
/// Backed by an ordered map so the serialized form is stable between saves.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoinCollection {
    coins: BTreeMap<String, CoinRecord>,
}

impl CoinCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.coins.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&CoinRecord> {
        self.coins.get(id)
    }

    /// Insert or overwrite a record, returning the previous one
    pub fn insert(&mut self, id: impl Into<String>, record: CoinRecord) -> Option<CoinRecord> {
        self.coins.insert(id.into(), record)
    }

    pub fn remove(&mut self, id: &str) -> Option<CoinRecord> {
        self.coins.remove(id)
    }

    /// Coin identifiers in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.coins.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CoinRecord)> {
        self.coins.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Union `incoming` into this collection; incoming records win on collision.
    ///
    /// Returns the number of keys that were not present before.
    pub fn merge(&mut self, incoming: &CoinCollection) -> usize {
        let mut added = 0;
        for (id, record) in &incoming.coins {
            if self.coins.insert(id.clone(), record.clone()).is_none() {
                added += 1;
            }
        }
        added
    }
}

impl FromIterator<(String, CoinRecord)> for CoinCollection {
    fn from_iter<I: IntoIterator<Item = (String, CoinRecord)>>(iter: I) -> Self {
        Self {
            coins: iter.into_iter().collect(),
        }
    }
}
