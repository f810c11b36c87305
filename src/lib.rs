//! coinmesh - peer-to-peer replication of coin ledgers
//!
//! Peer nodes hold an unminted and a minted coin collection, discover each
//! other through a primary registry node, and reconcile with a random peer
//! at startup behind a key-set checksum.
//!
//! - [`ledger`] - coin records, collections, fingerprints, wallet coin files
//! - [`storage`] - persistence of the three node collections
//! - [`sync`] - peer registry, wire protocol, bootstrap sequence
//! - [`transport`] - TCP listener and client
//! - [`node`] - primary and peer node lifecycle
//! - [`config`] - node configuration

#![forbid(unsafe_code)]

pub mod config;
pub mod ledger;
pub mod node;
pub mod storage;
pub mod sync;
pub mod transport;
