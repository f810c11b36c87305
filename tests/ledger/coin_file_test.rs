// Coin File Tests
// Wallet interchange format: JSON array of records

use coinmesh::ledger::{record_key, CoinFile, CoinFileError, CoinRecord};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_load_filters_unminted() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cheque.json");
    std::fs::write(
        &path,
        r#"[{"id":"a","unminted":true},{"id":"b","minted":true},{"id":"c","unminted":"yes"}]"#,
    )
    .unwrap();

    let file = CoinFile::load(&path).unwrap();

    assert_eq!(file.len(), 3);
    let ids: Vec<_> = file.unminted().filter_map(|r| r.embedded_id()).collect();
    assert_eq!(ids, vec!["a", "c"]);
}

#[test]
fn test_save_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("out.json");
    let file = CoinFile::new(vec![
        CoinRecord::new(json!({"id": "a", "unminted": true})),
        CoinRecord::new(json!({"id": "b", "unminted": true})),
    ]);

    file.save(&path).unwrap();

    assert_eq!(CoinFile::load(&path).unwrap(), file);
}

#[test]
fn test_load_rejects_non_array() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.json");
    std::fs::write(&path, r#"{"a": 1}"#).unwrap();

    assert!(matches!(CoinFile::load(&path), Err(CoinFileError::Malformed(_))));
}

#[test]
fn test_load_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = CoinFile::load(temp_dir.path().join("missing.json"));

    assert!(matches!(result, Err(CoinFileError::Io(_))));
}

#[test]
fn test_to_unminted_collection_keys() {
    let with_id = CoinRecord::new(json!({"id": "coin-7", "unminted": true}));
    let without_id = CoinRecord::new(json!({"serial": 42, "unminted": true}));
    let minted = CoinRecord::new(json!({"id": "coin-8"}));
    let file = CoinFile::new(vec![with_id, without_id.clone(), minted]);

    let coins = file.to_unminted_collection();

    assert_eq!(coins.len(), 2);
    assert!(coins.contains("coin-7"));
    assert!(coins.contains(&record_key(&without_id)));
    assert!(!coins.contains("coin-8"));
}

#[test]
fn test_record_key_is_stable() {
    let record = CoinRecord::new(json!({"serial": 42, "unminted": true}));

    assert_eq!(record_key(&record), record_key(&record.clone()));
    assert_eq!(record_key(&record).len(), 64);
}
