// Store Tests
// JSON file and sled backends for the node collections

use coinmesh::ledger::{CoinCollection, CoinRecord};
use coinmesh::storage::{
    open_store, Collection, JsonFileStore, SledStore, StorageBackend, Store, StoreError, StoreExt,
};
use coinmesh::sync::PeerRegistry;
use serde_json::json;
use tempfile::TempDir;

fn sample_coins() -> CoinCollection {
    let mut coins = CoinCollection::new();
    coins.insert("x", CoinRecord::new(json!({"unminted": true})));
    coins.insert("y", CoinRecord::new(json!({"unminted": true})));
    coins
}

// ============================================================================
// JSON FILE STORE
// ============================================================================

#[test]
fn test_json_store_absent_collection_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::open(temp_dir.path()).unwrap();

    let coins: CoinCollection = store.load(Collection::UnmintedCoins).unwrap();
    let registry: PeerRegistry = store.load(Collection::Nodes).unwrap();

    assert!(coins.is_empty());
    assert!(registry.is_empty());
}

#[test]
fn test_json_store_init_creates_empty_files() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::open(temp_dir.path()).unwrap();

    store.init().unwrap();

    for collection in Collection::ALL {
        let bytes = std::fs::read(store.path_of(collection)).unwrap();
        assert_eq!(bytes, b"{}");
    }
}

#[test]
fn test_json_store_init_keeps_existing_files() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::open(temp_dir.path()).unwrap();
    store.save(Collection::MintedCoins, &sample_coins()).unwrap();

    store.init().unwrap();

    let coins: CoinCollection = store.load(Collection::MintedCoins).unwrap();
    assert_eq!(coins, sample_coins());
}

#[test]
fn test_json_store_file_names() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::open(temp_dir.path()).unwrap();
    store.save(Collection::UnmintedCoins, &sample_coins()).unwrap();

    assert_eq!(store.dir(), temp_dir.path());
    let path = store.dir().join("unminted_coins.json");
    assert_eq!(store.path_of(Collection::UnmintedCoins), path);
    let text = std::fs::read_to_string(path).unwrap();

    assert_eq!(text, r#"{"x":{"unminted":true},"y":{"unminted":true}}"#);
}

#[test]
fn test_json_store_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::open(temp_dir.path()).unwrap();

    store.save(Collection::UnmintedCoins, &sample_coins()).unwrap();
    store.save(Collection::UnmintedCoins, &CoinCollection::new()).unwrap();

    let coins: CoinCollection = store.load(Collection::UnmintedCoins).unwrap();
    assert!(coins.is_empty());
}

#[test]
fn test_json_store_corrupt_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::open(temp_dir.path()).unwrap();
    std::fs::write(store.path_of(Collection::Nodes), b"{not json").unwrap();

    let result: Result<PeerRegistry, _> = store.load(Collection::Nodes);

    assert!(matches!(
        result,
        Err(StoreError::DeserializationFailed { collection: Collection::Nodes, .. })
    ));
}

#[test]
fn test_json_store_registry_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::open(temp_dir.path()).unwrap();
    let mut registry = PeerRegistry::new();
    registry.register("A", "127.0.0.1", 9001);

    store.save(Collection::Nodes, &registry).unwrap();

    let raw = store.load_raw(Collection::Nodes).unwrap().unwrap();
    assert_eq!(raw, br#"{"A":["127.0.0.1",9001]}"#);
    let loaded: PeerRegistry = store.load(Collection::Nodes).unwrap();
    assert_eq!(loaded, registry);
}

// ============================================================================
// SLED STORE
// ============================================================================

#[test]
fn test_sled_store_absent_collection_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let store = SledStore::open(temp_dir.path()).unwrap();

    assert_eq!(store.load_raw(Collection::MintedCoins).unwrap(), None);
    let coins: CoinCollection = store.load(Collection::MintedCoins).unwrap();
    assert!(coins.is_empty());
}

#[test]
fn test_sled_store_collections_are_independent() {
    let temp_dir = TempDir::new().unwrap();
    let store = SledStore::open(temp_dir.path()).unwrap();

    store.save(Collection::UnmintedCoins, &sample_coins()).unwrap();

    let minted: CoinCollection = store.load(Collection::MintedCoins).unwrap();
    let unminted: CoinCollection = store.load(Collection::UnmintedCoins).unwrap();
    assert!(minted.is_empty());
    assert_eq!(unminted, sample_coins());
}

// ============================================================================
// BACKEND SELECTION
// ============================================================================

#[test]
fn test_open_store_backends() {
    for backend in [StorageBackend::Json, StorageBackend::Sled] {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(backend, temp_dir.path()).unwrap();

        store.save(Collection::MintedCoins, &sample_coins()).unwrap();
        let coins: CoinCollection = store.load(Collection::MintedCoins).unwrap();

        assert_eq!(coins, sample_coins());
    }
}
