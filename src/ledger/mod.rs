// Ledger module - THE COINS
// Coin records, per-node collections, fingerprints and the wallet file format

mod checksum;
mod coin;
mod coin_file;

pub use checksum::{Checksum, ChecksumValidator};
pub use coin::{CoinCollection, CoinKind, CoinRecord, UNMINTED_MARKER};
pub use coin_file::{record_key, CoinFile, CoinFileError};
