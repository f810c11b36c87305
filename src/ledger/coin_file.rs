// Coin Files - The wallet's cheque interchange format
//
// A coin file is a JSON array of records. The wallet deposits only records
// that carry the unminted marker and writes cheques by taking records off
// the front of its list.

use crate::ledger::coin::{CoinCollection, CoinRecord};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors reading or writing coin files
#[derive(Error, Debug)]
pub enum CoinFileError {
    #[error("Coin file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Coin file is not a JSON array of records: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Number of coins must be positive")]
    NonPositiveCount,

    #[error("Not enough coins: requested {requested}, available {available}")]
    NotEnoughCoins { requested: usize, available: usize },
}

/// An ordered list of coin records as exchanged with the wallet
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoinFile {
    records: Vec<CoinRecord>,
}

impl CoinFile {
    pub fn new(records: Vec<CoinRecord>) -> Self {
        Self { records }
    }

    /// Read a coin file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CoinFileError> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Write the coin file, replacing any existing file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CoinFileError> {
        let bytes = serde_json::to_vec(self)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CoinRecord] {
        &self.records
    }

    /// Records carrying the unminted marker, in file order
    pub fn unminted(&self) -> impl Iterator<Item = &CoinRecord> {
        self.records.iter().filter(|r| r.is_unminted())
    }

    /// Remove the first `count` records into a new cheque
    pub fn take_cheque(&mut self, count: usize) -> Result<CoinFile, CoinFileError> {
        if count == 0 {
            return Err(CoinFileError::NonPositiveCount);
        }
        if count > self.records.len() {
            return Err(CoinFileError::NotEnoughCoins {
                requested: count,
                available: self.records.len(),
            });
        }
        let taken: Vec<CoinRecord> = self.records.drain(..count).collect();
        Ok(CoinFile::new(taken))
    }

    /// Key the unminted records for insertion into a node's collection.
    ///
    /// A record's own `id` field is used when present, otherwise the hex
    /// SHA-256 of its JSON encoding.
    pub fn to_unminted_collection(&self) -> CoinCollection {
        self.unminted()
            .map(|record| (record_key(record), record.clone()))
            .collect()
    }
}

/// Collection key for a coin-file record
pub fn record_key(record: &CoinRecord) -> String {
    if let Some(id) = record.embedded_id() {
        return id.to_string();
    }
    let encoded = serde_json::to_vec(record.payload()).unwrap_or_default();
    hex::encode(Sha256::digest(&encoded))
}
