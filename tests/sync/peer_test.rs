// Peer Tests
// Tests for the node id to address registry

use coinmesh::sync::{PeerAddress, PeerRegistry};
use std::collections::HashSet;

// ============================================================================
// REGISTRATION
// ============================================================================

#[test]
fn test_peer_registry_new() {
    let registry = PeerRegistry::new();

    assert!(registry.is_empty());
    assert_eq!(registry.peer_count(), 0);
}

#[test]
fn test_register_same_id_twice_second_wins() {
    let mut registry = PeerRegistry::new();

    registry.register("A", "127.0.0.1", 9001);
    registry.register("A", "192.168.1.5", 9002);

    assert_eq!(registry.peer_count(), 1);
    assert_eq!(registry.get("A"), Some(&PeerAddress::new("192.168.1.5", 9002)));
}

#[test]
fn test_register_trims_host() {
    let mut registry = PeerRegistry::new();

    registry.register("A", " 127.0.0.1 ", 9001);

    assert_eq!(registry.get("A").unwrap().host(), "127.0.0.1");
}

#[test]
fn test_register_accepts_any_parsed_triple() {
    let mut registry = PeerRegistry::new();

    registry.register("", "127.0.0.1", 9001);
    registry.register("A", "127.0.0.1", 0);

    assert_eq!(registry.peer_count(), 2);
    assert_eq!(registry.get(""), Some(&PeerAddress::new("127.0.0.1", 9001)));
    assert_eq!(registry.get("A"), Some(&PeerAddress::new("127.0.0.1", 0)));
}

// ============================================================================
// MERGE
// ============================================================================

#[test]
fn test_merge_union_incoming_wins() {
    let mut local = PeerRegistry::new();
    local.register("A", "10.0.0.1", 1000);
    local.register("B", "10.0.0.2", 1000);

    let mut incoming = PeerRegistry::new();
    incoming.register("B", "10.0.0.22", 2000);
    incoming.register("C", "10.0.0.3", 1000);

    let added = local.merge(&incoming);

    assert_eq!(added, 1);
    assert_eq!(local.peer_count(), 3);
    assert_eq!(local.get("B"), Some(&PeerAddress::new("10.0.0.22", 2000)));
}

#[test]
fn test_merge_empty_is_noop() {
    let mut local = PeerRegistry::new();
    local.register("A", "10.0.0.1", 1000);
    let before = local.clone();

    assert_eq!(local.merge(&PeerRegistry::new()), 0);
    assert_eq!(local, before);
}

// ============================================================================
// RANDOM SELECTION
// ============================================================================

#[test]
fn test_random_peer_empty_returns_none() {
    let registry = PeerRegistry::new();

    assert!(registry.random_peer().is_none());
    assert!(registry.random_peer_except("A").is_none());
}

#[test]
fn test_random_peer_single() {
    let mut registry = PeerRegistry::new();
    registry.register("A", "127.0.0.1", 9001);

    let (id, addr) = registry.random_peer().unwrap();

    assert_eq!(id, "A");
    assert_eq!(addr, PeerAddress::new("127.0.0.1", 9001));
}

#[test]
fn test_random_peer_covers_all_entries() {
    let mut registry = PeerRegistry::new();
    for (i, id) in ["A", "B", "C"].iter().enumerate() {
        registry.register(id, "127.0.0.1", 9000 + i as u16);
    }

    let mut seen = HashSet::new();
    for _ in 0..500 {
        let (id, addr) = registry.random_peer().unwrap();
        assert_eq!(registry.get(&id), Some(&addr));
        seen.insert(id);
    }

    assert_eq!(seen.len(), 3);
}

#[test]
fn test_random_peer_except_skips_self() {
    let mut registry = PeerRegistry::new();
    registry.register("self", "127.0.0.1", 9000);
    registry.register("other", "127.0.0.1", 9001);

    for _ in 0..50 {
        let (id, _) = registry.random_peer_except("self").unwrap();
        assert_eq!(id, "other");
    }

    let mut only_self = PeerRegistry::new();
    only_self.register("self", "127.0.0.1", 9000);
    assert!(only_self.random_peer_except("self").is_none());
}

// ============================================================================
// SERIALIZATION
// ============================================================================

#[test]
fn test_registry_json_shape() {
    let registry: PeerRegistry =
        serde_json::from_str(r#"{"A":["127.0.0.1",9001],"B":["10.0.0.2",5762]}"#).unwrap();

    assert_eq!(registry.peer_count(), 2);
    assert_eq!(registry.get("B"), Some(&PeerAddress::new("10.0.0.2", 5762)));
    assert_eq!(
        serde_json::to_string(&registry).unwrap(),
        r#"{"A":["127.0.0.1",9001],"B":["10.0.0.2",5762]}"#
    );
}

#[test]
fn test_address_display() {
    assert_eq!(PeerAddress::new("127.0.0.1", 9001).to_string(), "127.0.0.1:9001");
}
