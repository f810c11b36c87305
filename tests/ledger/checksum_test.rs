// Checksum Tests
// Fingerprints over coin collection key sets

use coinmesh::ledger::{Checksum, ChecksumValidator, CoinCollection, CoinRecord};
use serde_json::json;
use sha2::{Digest, Sha256};

fn collection(keys: &[&str]) -> CoinCollection {
    keys.iter()
        .map(|k| (k.to_string(), CoinRecord::new(json!({"unminted": true}))))
        .collect()
}

// ============================================================================
// FINGERPRINT
// ============================================================================

#[test]
fn test_validate_own_fingerprint() {
    for keys in [&["x"][..], &["x", "y"], &["coin-1", "coin-2", "coin-3"]] {
        let coins = collection(keys);
        let digest = ChecksumValidator::fingerprint(&coins);
        assert!(ChecksumValidator::validate(&coins, &digest));
    }
}

#[test]
fn test_different_key_sets_do_not_validate() {
    let a = collection(&["x", "y"]);
    let b = collection(&["x"]);
    let c = collection(&["x", "y", "z"]);

    assert!(!ChecksumValidator::validate(&a, &ChecksumValidator::fingerprint(&b)));
    assert!(!ChecksumValidator::validate(&a, &ChecksumValidator::fingerprint(&c)));
    assert!(!ChecksumValidator::validate(&b, &ChecksumValidator::fingerprint(&a)));
}

#[test]
fn test_fingerprint_independent_of_insertion_order() {
    let mut a = CoinCollection::new();
    a.insert("y", CoinRecord::new(json!(1)));
    a.insert("x", CoinRecord::new(json!(2)));

    let mut b = CoinCollection::new();
    b.insert("x", CoinRecord::new(json!(2)));
    b.insert("y", CoinRecord::new(json!(1)));

    assert_eq!(
        ChecksumValidator::fingerprint(&a),
        ChecksumValidator::fingerprint(&b)
    );
}

#[test]
fn test_fingerprint_is_hex_sha256() {
    let digest = ChecksumValidator::fingerprint(&collection(&["x"]));

    assert_eq!(digest.as_str().len(), 64);
    assert!(digest.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
}

// ============================================================================
// COMBINED
// ============================================================================

#[test]
fn test_combined_with_empty_minted_matches_unminted() {
    let unminted = collection(&["x", "y"]);
    let minted = CoinCollection::new();

    assert_eq!(
        ChecksumValidator::combined_fingerprint(&unminted, &minted),
        ChecksumValidator::fingerprint(&unminted)
    );
}

#[test]
fn test_combined_includes_minted_keys() {
    let unminted = collection(&["x"]);
    let minted = collection(&["m"]);

    assert_ne!(
        ChecksumValidator::combined_fingerprint(&unminted, &minted),
        ChecksumValidator::fingerprint(&unminted)
    );
}

#[test]
fn test_validate_against_peer_supplied_hex() {
    let coins = collection(&["x"]);
    let digest = ChecksumValidator::fingerprint(&coins);
    let received = Checksum::from_hex(&format!("{}\n", digest.as_str().to_uppercase()));

    assert!(ChecksumValidator::validate(&coins, &received));
}

#[test]
fn test_digest_matches_joined_sorted_keys() {
    let unminted = collection(&["y", "x"]);
    let minted = collection(&["m"]);

    assert_eq!(
        ChecksumValidator::fingerprint(&unminted).as_str(),
        hex::encode(Sha256::digest(b"xy"))
    );
    assert_eq!(
        ChecksumValidator::combined_fingerprint(&unminted, &minted).as_str(),
        hex::encode(Sha256::digest(b"xym"))
    );
}
