// Sync module - HOW NODES TALK
// Peer registry, request protocol, and the startup reconciliation sequence

mod bootstrap;
mod peer;
mod protocol;

pub use bootstrap::{
    BootstrapConfig, BootstrapCoordinator, BootstrapError, BootstrapReport, CollectionOutcome,
};
pub use peer::{PeerAddress, PeerRegistry};
pub use protocol::{
    read_request, read_response, ProtocolError, Registration, Request, Response,
    DEFAULT_MAX_FRAME_BYTES, REGISTER_FAILED, REGISTER_OK, REQUEST_CHECKSUM, REQUEST_MINTED_COINS,
    REQUEST_NODES, REQUEST_UNMINTED_COINS,
};
