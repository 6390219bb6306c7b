use crate::error::NegotiationError;
use crate::transport::{ConnectionState, StreamHandle};
use parley_core::{Identity, RoomId};

/// What the coordinator reports to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    Joined {
        room: RoomId,
        identity: Option<Identity>,
        peers: Vec<Identity>,
    },
    PeerJoined(Identity),
    PeerLeft(Identity),
    RemoteMedia {
        peer: Identity,
        stream: StreamHandle,
    },
    ConnectionStateChanged {
        peer: Identity,
        state: ConnectionState,
    },
    /// The negotiation with `peer` was torn down. Calling again is allowed.
    NegotiationFailed {
        peer: Identity,
        error: NegotiationError,
    },
}
