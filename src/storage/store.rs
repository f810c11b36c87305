// Store - Persistence for the three named node collections
//
// Each collection (peer registry, unminted coins, minted coins) is saved as
// one JSON document and replaced wholesale on every save:
// - JsonFileStore: one file per collection in a data directory
// - SledStore: one key per collection in an embedded sled database
//
// Neither backend locks; callers serialize access per collection.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Sled keys for each collection
mod keys {
    pub const NODES: &[u8] = b"collection:nodes";
    pub const UNMINTED_COINS: &[u8] = b"collection:unminted_coins";
    pub const MINTED_COINS: &[u8] = b"collection:minted_coins";
}

/// Errors from storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    OpenFailed(String),

    #[error("I/O failed for {collection}: {source}")]
    Io {
        collection: Collection,
        #[source]
        source: std::io::Error,
    },

    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization of {collection} failed: {reason}")]
    DeserializationFailed { collection: Collection, reason: String },

    #[error("Flush failed: {0}")]
    FlushFailed(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

/// The named collections a node persists
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Nodes,
    UnmintedCoins,
    MintedCoins,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Nodes,
        Collection::UnmintedCoins,
        Collection::MintedCoins,
    ];

    /// File name used by the JSON file backend
    pub fn file_name(&self) -> &'static str {
        match self {
            Collection::Nodes => "nodes.json",
            Collection::UnmintedCoins => "unminted_coins.json",
            Collection::MintedCoins => "minted_coins.json",
        }
    }

    fn sled_key(&self) -> &'static [u8] {
        match self {
            Collection::Nodes => keys::NODES,
            Collection::UnmintedCoins => keys::UNMINTED_COINS,
            Collection::MintedCoins => keys::MINTED_COINS,
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Which backend a node persists its collections with
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sled,
}

/// Raw persistence of named collections
pub trait Store: Send + Sync {
    /// Bytes last saved for `collection`, or `None` if it was never saved
    fn load_raw(&self, collection: Collection) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the saved bytes for `collection`
    fn save_raw(&self, collection: Collection, bytes: &[u8]) -> Result<(), StoreError>;
}

/// Typed JSON access on top of any [`Store`]
pub trait StoreExt: Store {
    /// Load a collection, or `T::default()` if it was never saved
    fn load<T: DeserializeOwned + Default>(&self, collection: Collection) -> Result<T, StoreError> {
        match self.load_raw(collection)? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StoreError::DeserializationFailed {
                    collection,
                    reason: e.to_string(),
                }
            }),
            None => Ok(T::default()),
        }
    }

    /// Serialize and save a collection
    fn save<T: Serialize + ?Sized>(&self, collection: Collection, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| StoreError::SerializationFailed(e.to_string()))?;
        self.save_raw(collection, &bytes)
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

/// Open the configured backend rooted at `data_dir`
pub fn open_store(backend: StorageBackend, data_dir: &Path) -> Result<Arc<dyn Store>, StoreError> {
    match backend {
        StorageBackend::Json => {
            let store = JsonFileStore::open(data_dir)?;
            store.init()?;
            Ok(Arc::new(store))
        }
        StorageBackend::Sled => Ok(Arc::new(SledStore::open(data_dir.join("coinmesh.sled"))?)),
    }
}

// ============================================================================
// JSON FILES
// ============================================================================

/// One JSON file per collection in a directory
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store in `dir`, creating the directory if needed
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| StoreError::OpenFailed(format!("{}: {}", dir.display(), e)))?;
        Ok(Self { dir })
    }

    /// Write an empty `{}` document for every collection file that does not exist
    pub fn init(&self) -> Result<(), StoreError> {
        for collection in Collection::ALL {
            if !self.path_of(collection).exists() {
                self.save_raw(collection, b"{}")?;
            }
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of a collection's file
    pub fn path_of(&self, collection: Collection) -> PathBuf {
        self.dir.join(collection.file_name())
    }
}

impl Store for JsonFileStore {
    fn load_raw(&self, collection: Collection) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.path_of(collection)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { collection, source }),
        }
    }

    fn save_raw(&self, collection: Collection, bytes: &[u8]) -> Result<(), StoreError> {
        fs::write(self.path_of(collection), bytes)
            .map_err(|source| StoreError::Io { collection, source })
    }
}

// ============================================================================
// SLED
// ============================================================================

/// Collections stored as JSON blobs in a sled database
///
/// Every save is flushed before returning.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::OpenFailed(e.to_string()))?;
        Ok(Self { db })
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        Ok(())
    }
}

impl Store for SledStore {
    fn load_raw(&self, collection: Collection) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(collection.sled_key())?.map(|v| v.to_vec()))
    }

    fn save_raw(&self, collection: Collection, bytes: &[u8]) -> Result<(), StoreError> {
        self.db.insert(collection.sled_key(), bytes)?;
        self.flush()
    }
}
