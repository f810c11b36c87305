// Checksum - Key-set fingerprints used to gate bootstrap commits
//
// A fingerprint is a cheap equality oracle over a collection's keys. Values
// are not hashed, so it says nothing about a peer serving forged records
// under the right keys.

use crate::ledger::coin::CoinCollection;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Lower-case hex SHA-256 digest
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    /// Wrap a digest received from a peer; surrounding whitespace is dropped
    /// and hex is compared case-insensitively.
    pub fn from_hex(hex: &str) -> Self {
        Self(hex.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes and checks collection fingerprints
pub struct ChecksumValidator;

impl ChecksumValidator {
    /// Hash of the collection's keys concatenated in sorted order.
    ///
    /// Keys are joined with no separator, so `{"ab", "c"}` and `{"a", "bc"}`
    /// share a fingerprint.
    pub fn fingerprint(collection: &CoinCollection) -> Checksum {
        let mut hasher = Sha256::new();
        hash_sorted_keys(&mut hasher, collection);
        Checksum(hex::encode(hasher.finalize()))
    }

    /// Fingerprint of the unminted keys followed by the minted keys.
    ///
    /// This is what a node answers to `request_checksum`. When `minted` is
    /// empty it equals `fingerprint(unminted)`.
    pub fn combined_fingerprint(unminted: &CoinCollection, minted: &CoinCollection) -> Checksum {
        let mut hasher = Sha256::new();
        hash_sorted_keys(&mut hasher, unminted);
        hash_sorted_keys(&mut hasher, minted);
        Checksum(hex::encode(hasher.finalize()))
    }

    /// Recompute the fingerprint and compare it with `expected`
    pub fn validate(collection: &CoinCollection, expected: &Checksum) -> bool {
        Self::fingerprint(collection) == *expected
    }
}

fn hash_sorted_keys(hasher: &mut Sha256, collection: &CoinCollection) {
    // CoinCollection enumerates in key order already; sort anyway so the
    // digest does not depend on the backing map.
    let mut keys: Vec<&str> = collection.keys().collect();
    keys.sort_unstable();
    for key in keys {
        hasher.update(key.as_bytes());
    }
}
