// Storage module - PERSISTENCE
// Whole-document persistence of the peer registry and coin collections

mod store;

pub use store::{
    open_store, Collection, JsonFileStore, SledStore, StorageBackend, Store, StoreError, StoreExt,
};
